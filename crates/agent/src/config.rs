/// 配置管理

use common::DiskRole;
use std::path::PathBuf;
use std::time::Duration;

/// hypervisor 数据源后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HypervisorBackend {
    /// 调用 virsh 命令行
    Virsh,
    /// 通过 libvirt 绑定直接查询（需要 `libvirt` feature）
    Libvirt,
}

impl std::str::FromStr for HypervisorBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "virsh" => Ok(Self::Virsh),
            "libvirt" => Ok(Self::Libvirt),
            other => anyhow::bail!("未知的 hypervisor 后端: {}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub definitions_dir: PathBuf,
    pub definition_prefix: String,
    pub instances_dir: PathBuf,
    pub disk_roles: Vec<DiskRole>,
    pub hypervisor_backend: HypervisorBackend,
    pub libvirt_uri: String,
    pub interface_prefix: String,
    pub interface_label: String,
    pub concurrency: usize,
    pub query_timeout: Duration,
    pub log_level: String,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let definitions_dir = PathBuf::from(var("DEFINITIONS_DIR", "/etc/libvirt/qemu"));

        let definition_prefix = var("DEFINITION_PREFIX", "instance-");

        let instances_dir = PathBuf::from(var("INSTANCES_DIR", "/var/lib/nova/instances"));

        let disk_roles = DiskRole::parse_list(&var("DISK_ROLES", "disk=vda,disk.local=vdb"))?;

        let hypervisor_backend = var("HYPERVISOR_BACKEND", "virsh").parse()?;

        let libvirt_uri = var("LIBVIRT_URI", "qemu:///system");

        let interface_prefix = var("INTERFACE_PREFIX", "vnet");

        let interface_label = var("INTERFACE_LABEL", "eth0");

        let concurrency: usize = var("CONCURRENCY", "1").parse()?;
        if concurrency == 0 {
            anyhow::bail!("CONCURRENCY 必须大于 0");
        }

        let query_timeout = Duration::from_secs(var("QUERY_TIMEOUT_SECS", "30").parse()?);

        let log_level = var("LOG_LEVEL", "warn");

        Ok(Self {
            definitions_dir,
            definition_prefix,
            instances_dir,
            disk_roles,
            hypervisor_backend,
            libvirt_uri,
            interface_prefix,
            interface_label,
            concurrency,
            query_timeout,
            log_level,
        })
    }
}
