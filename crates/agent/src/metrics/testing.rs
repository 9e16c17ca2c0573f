/// 测试用的内存数据源

use async_trait::async_trait;
use common::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::hypervisor::Hypervisor;
use crate::process::ProcessTable;
use crate::storage::ImageInspector;

fn lookup<K, Q>(map: &HashMap<K, String>, key: &Q, what: &str) -> Result<String>
where
    K: std::borrow::Borrow<Q> + std::hash::Hash + Eq,
    Q: std::hash::Hash + Eq + std::fmt::Debug + ?Sized,
{
    map.get(key)
        .cloned()
        .ok_or_else(|| Error::SourceUnavailable(format!("{} {:?} 不可用", what, key)))
}

pub fn dominfo(state: &str, cpu_time: &str, max_kib: u64, used_kib: u64) -> String {
    format!(
        "Id:             3\n\
         OS Type:        hvm\n\
         State:          {}\n\
         CPU(s):         1\n\
         CPU time:       {}\n\
         Max memory:     {} KiB\n\
         Used memory:    {} KiB\n\
         Persistent:     yes\n",
        state, cpu_time, max_kib, used_kib
    )
}

pub fn iflist(interfaces: &[&str]) -> String {
    let mut out = String::from(" Interface   Type     Source   Model    MAC\n");
    out.push_str("-------------------------------------------------------\n");
    for (idx, iface) in interfaces.iter().enumerate() {
        out.push_str(&format!(" {}   bridge   br100   virtio   fa:16:3e:00:00:{:02x}\n", iface, idx));
    }
    out
}

#[derive(Default)]
pub struct FakeHypervisor {
    pub dominfo: HashMap<String, String>,
    pub iflist: HashMap<String, String>,
    pub ifstat: HashMap<(String, String), String>,
    pub blkstat: HashMap<(String, String), String>,
    /// domain_info 返回前的延迟
    pub delays: HashMap<String, Duration>,
}

impl FakeHypervisor {
    pub fn with_dominfo(mut self, name: &str, text: String) -> Self {
        self.dominfo.insert(name.to_string(), text);
        self
    }

    pub fn with_interfaces(mut self, name: &str, interfaces: &[&str]) -> Self {
        self.iflist.insert(name.to_string(), iflist(interfaces));
        self
    }

    pub fn with_ifstat(mut self, name: &str, iface: &str, text: &str) -> Self {
        self.ifstat.insert((name.to_string(), iface.to_string()), text.to_string());
        self
    }

    pub fn with_blkstat(mut self, name: &str, device: &str, text: &str) -> Self {
        self.blkstat.insert((name.to_string(), device.to_string()), text.to_string());
        self
    }

    pub fn with_delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }
}

#[async_trait]
impl Hypervisor for FakeHypervisor {
    async fn domain_info(&self, name: &str) -> Result<String> {
        if let Some(delay) = self.delays.get(name) {
            tokio::time::sleep(*delay).await;
        }
        lookup(&self.dominfo, name, "dominfo")
    }

    async fn domain_interfaces(&self, name: &str) -> Result<String> {
        lookup(&self.iflist, name, "domiflist")
    }

    async fn interface_stats(&self, name: &str, iface: &str) -> Result<String> {
        lookup(&self.ifstat, &(name.to_string(), iface.to_string()), "domifstat")
    }

    async fn block_stats(&self, name: &str, device: &str) -> Result<String> {
        lookup(&self.blkstat, &(name.to_string(), device.to_string()), "domblkstat")
    }

    fn backend(&self) -> &str {
        "fake"
    }
}

#[derive(Default)]
pub struct FakeProcessTable {
    pub pids: HashMap<String, u32>,
    pub usage: HashMap<u32, f64>,
}

impl FakeProcessTable {
    pub fn with_process(mut self, name: &str, pid: u32, usage: f64) -> Self {
        self.pids.insert(name.to_string(), pid);
        self.usage.insert(pid, usage);
        self
    }
}

#[async_trait]
impl ProcessTable for FakeProcessTable {
    async fn find_pid(&self, pattern: &str) -> Result<u32> {
        self.pids
            .get(pattern)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("没有匹配 {} 的进程", pattern)))
    }

    async fn cpu_percent(&self, pid: u32) -> Result<f64> {
        self.usage
            .get(&pid)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("进程 {} 已退出", pid)))
    }
}

#[derive(Default)]
pub struct FakeImageInspector {
    pub sizes: HashMap<PathBuf, String>,
}

impl FakeImageInspector {
    pub fn with_size(mut self, path: PathBuf, size: &str) -> Self {
        self.sizes.insert(path, size.to_string());
        self
    }
}

#[async_trait]
impl ImageInspector for FakeImageInspector {
    async fn disk_size(&self, path: &Path) -> Result<String> {
        lookup(&self.sizes, path, "qemu-img")
    }

    fn inspector_type(&self) -> &str {
        "fake"
    }
}
