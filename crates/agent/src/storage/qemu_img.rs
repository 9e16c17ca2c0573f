/// qemu-img 镜像查询
///
/// 运行 `qemu-img info` 并取出 `disk size:` 一行

use async_trait::async_trait;
use common::utils::run_command;
use common::{Error, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use super::inspector::ImageInspector;

pub struct QemuImg {
    timeout: Duration,
}

impl QemuImg {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// 从 `qemu-img info` 的输出中取出 `disk size:` 的值
pub fn parse_disk_size(info: &str) -> Result<String> {
    info.lines()
        .find_map(|line| line.trim().strip_prefix("disk size:"))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::Format("qemu-img 输出中没有 disk size".to_string()))
}

#[async_trait]
impl ImageInspector for QemuImg {
    async fn disk_size(&self, path: &Path) -> Result<String> {
        // -U: 运行中的实例持有镜像写锁，只读查询需要共享模式
        let args = [OsStr::new("info"), OsStr::new("-U"), path.as_os_str()];
        let output = run_command("qemu-img", args, self.timeout).await?;
        parse_disk_size(&output)
    }

    fn inspector_type(&self) -> &str {
        "qemu-img"
    }
}
