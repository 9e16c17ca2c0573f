/// 虚拟化数据源
///
/// 与 libvirt/QEMU/KVM 交互，返回 virsh 风格的文本记录

use async_trait::async_trait;
use common::Result;

#[cfg(feature = "libvirt")]
pub mod libvirt;
pub mod parser;
pub mod virsh;

#[cfg(feature = "libvirt")]
pub use libvirt::LibvirtHypervisor;
pub use virsh::VirshHypervisor;

/// Hypervisor 查询接口
///
/// 每个方法返回与对应 virsh 子命令一致的文本，查询失败或无输出时
/// 返回 `Error::SourceUnavailable`。
#[async_trait]
pub trait Hypervisor: Send + Sync + 'static {
    /// `virsh dominfo <name>`
    async fn domain_info(&self, name: &str) -> Result<String>;

    /// `virsh domiflist <name>`
    async fn domain_interfaces(&self, name: &str) -> Result<String>;

    /// `virsh domifstat <name> <iface>`
    async fn interface_stats(&self, name: &str, iface: &str) -> Result<String>;

    /// `virsh domblkstat <name> <device>`
    async fn block_stats(&self, name: &str, device: &str) -> Result<String>;

    /// 后端类型
    fn backend(&self) -> &str;
}
