/// 单位换算
///
/// 把外部工具输出的 `42.3s`、`1048576 KiB`、`196K` 等文本
/// 统一换算为整数秒或字节。调用方应把 `Error::Format` 视为"该值不可用"。

use crate::errors::{Error, Result};

const KIB: u64 = 1 << 10;
const MIB: u64 = 1 << 20;
const GIB: u64 = 1 << 30;
const TIB: u64 = 1 << 40;

/// 解析 `NNNs` 形式的时长，返回整秒
///
/// virsh 输出的 CPU 时间带小数（如 `42.3s`），小数部分直接截断。
pub fn parse_duration(s: &str) -> Result<u64> {
    let trimmed = s.trim();
    let number = trimmed
        .strip_suffix(|c: char| c == 's' || c == 'S')
        .unwrap_or(trimmed)
        .trim_end();

    scale(number, 1).ok_or_else(|| Error::Format(format!("无法解析时长: {:?}", s)))
}

/// 解析带 K/M/G 后缀的容量，返回字节数（1024 进制）
///
/// 后缀不区分大小写，允许与数字之间有空格，也允许写成 `KB`/`KiB`、`MB`/`MiB` 等形式。
/// 没有后缀时数值本身就是字节。
pub fn parse_size(s: &str) -> Result<u64> {
    let trimmed = s.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(trimmed.len());
    let (number, suffix) = trimmed.split_at(split);

    let multiplier = match suffix.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => KIB,
        "M" | "MB" | "MIB" => MIB,
        "G" | "GB" | "GIB" => GIB,
        "T" | "TB" | "TIB" => TIB,
        other => {
            return Err(Error::Format(format!("无法识别的容量单位 {:?}: {:?}", other, s)));
        }
    };

    scale(number, multiplier).ok_or_else(|| Error::Format(format!("无法解析容量: {:?}", s)))
}

/// 解析 `1048576 KiB` 形式的内存值，返回 KiB
pub fn parse_kib(s: &str) -> Result<u64> {
    parse_size(s).map(|bytes| bytes / KIB)
}

/// 非负十进制数乘以倍率，小数部分截断到整数
fn scale(number: &str, multiplier: u64) -> Option<u64> {
    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (number, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut value = whole.checked_mul(multiplier)?;

    if !fraction.is_empty() {
        let fraction: f64 = format!("0.{}", fraction).parse().ok()?;
        value = value.checked_add((fraction * multiplier as f64) as u64)?;
    }

    Some(value)
}
