/// 外部命令执行
///
/// virsh、qemu-img 等工具的调用统一走这里：超时、非零退出码、
/// 空输出都会变成 `Error::SourceUnavailable`，由调用方决定降级方式。

use std::ffi::OsStr;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::errors::{Error, Result};

/// 执行命令并返回标准输出
pub async fn run_command<I, S>(program: &str, args: I, timeout: Duration) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args).kill_on_drop(true);
    debug!("执行命令: {:?}", command.as_std());

    let output = tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| Error::SourceUnavailable(format!("{} 执行超时 ({:?})", program, timeout)))?
        .map_err(|e| Error::SourceUnavailable(format!("无法执行 {}: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::SourceUnavailable(format!(
            "{} 退出码 {:?}: {}",
            program,
            output.status.code(),
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if stdout.trim().is_empty() {
        return Err(Error::SourceUnavailable(format!("{} 没有输出", program)));
    }

    Ok(stdout)
}
