/// virsh 命令行后端

use async_trait::async_trait;
use common::utils::run_command;
use common::Result;
use std::time::Duration;

use super::Hypervisor;

pub struct VirshHypervisor {
    /// libvirt 连接 URI，例如 qemu:///system
    uri: String,
    /// 单次查询超时
    timeout: Duration,
}

impl VirshHypervisor {
    pub fn new(uri: impl Into<String>, timeout: Duration) -> Self {
        Self {
            uri: uri.into(),
            timeout,
        }
    }

    async fn virsh(&self, args: &[&str]) -> Result<String> {
        let mut full_args = vec!["-c", self.uri.as_str()];
        full_args.extend_from_slice(args);
        run_command("virsh", full_args, self.timeout).await
    }
}

#[async_trait]
impl Hypervisor for VirshHypervisor {
    async fn domain_info(&self, name: &str) -> Result<String> {
        self.virsh(&["dominfo", name]).await
    }

    async fn domain_interfaces(&self, name: &str) -> Result<String> {
        self.virsh(&["domiflist", name]).await
    }

    async fn interface_stats(&self, name: &str, iface: &str) -> Result<String> {
        self.virsh(&["domifstat", name, iface]).await
    }

    async fn block_stats(&self, name: &str, device: &str) -> Result<String> {
        self.virsh(&["domblkstat", name, device]).await
    }

    fn backend(&self) -> &str {
        "virsh"
    }
}
