/// 宿主机进程表
///
/// 根据实例名找到对应的 QEMU 进程，并采样其 CPU 使用率

use async_trait::async_trait;
use common::{Error, Result};
use std::ffi::OsStr;
use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;

/// 进程查询接口
#[async_trait]
pub trait ProcessTable: Send + Sync + 'static {
    /// 查找命令行匹配 `pattern` 的进程
    ///
    /// 多个进程匹配时取 pid 最小的一个，只保证尽力而为。
    async fn find_pid(&self, pattern: &str) -> Result<u32>;

    /// 进程当前的 CPU 使用率（百分比，多核可超过 100）
    async fn cpu_percent(&self, pid: u32) -> Result<f64>;
}

/// 基于 sysinfo 的进程表
#[derive(Debug, Default)]
pub struct SysinfoProcessTable;

impl SysinfoProcessTable {
    pub fn new() -> Self {
        Self
    }
}

/// 命令行中是否有参数（或参数按 `,`/`=` 切分后的片段）与 `pattern` 完全相同
///
/// QEMU 的命令行形如 `-name guest=instance-0000002a,debug-threads=on`，
/// 按片段精确匹配可以避免 instance-1 误中 instance-10。
pub fn cmdline_matches<S: AsRef<OsStr>>(cmd: &[S], pattern: &str) -> bool {
    cmd.iter().any(|arg| {
        let arg = arg.as_ref().to_string_lossy();
        arg == pattern || arg.split(|c: char| c == ',' || c == '=').any(|piece| piece == pattern)
    })
}

fn process_matches(process: &Process, pattern: &str) -> bool {
    cmdline_matches(process.cmd(), pattern)
}

#[async_trait]
impl ProcessTable for SysinfoProcessTable {
    async fn find_pid(&self, pattern: &str) -> Result<u32> {
        let pattern = pattern.to_string();

        tokio::task::spawn_blocking(move || {
            let mut system = System::new();
            system.refresh_processes_specifics(
                ProcessesToUpdate::All,
                true,
                ProcessRefreshKind::new().with_cmd(UpdateKind::OnlyIfNotSet),
            );

            system
                .processes()
                .iter()
                .filter(|(_, process)| process_matches(process, &pattern))
                .map(|(pid, _)| pid.as_u32())
                .min()
                .ok_or_else(|| Error::NotFound(format!("没有匹配 {} 的进程", pattern)))
        })
        .await
        .map_err(|e| Error::Internal(format!("进程扫描任务失败: {}", e)))?
    }

    async fn cpu_percent(&self, pid: u32) -> Result<f64> {
        let pid = Pid::from_u32(pid);

        let usage = tokio::task::spawn_blocking(move || {
            let mut system = System::new();

            // 两次刷新之间的差值才是有效的 CPU 使用率
            // Linux 上只有刷新全部进程时才会计算 cpu_usage
            system.refresh_processes(ProcessesToUpdate::All, true);
            std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            system.refresh_processes(ProcessesToUpdate::All, true);

            system
                .process(pid)
                .map(|process| process.cpu_usage() as f64)
                .ok_or_else(|| Error::NotFound(format!("进程 {} 已退出", pid)))
        })
        .await
        .map_err(|e| Error::Internal(format!("CPU 采样任务失败: {}", e)))??;

        debug!("进程 {} CPU 使用率: {:.1}%", pid, usage);
        Ok(usage)
    }
}
