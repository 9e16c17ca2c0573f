/// virsh 文本输出解析
///
/// 这里只做文本到结构的转换，不关心数据来自 virsh 还是 libvirt 绑定。

use common::{Error, Result};
use std::collections::HashMap;

/// 解析 `virsh dominfo` 风格的 `Key: value` 记录
///
/// 键和值都转为小写并去掉首尾空白，没有冒号的行忽略。
pub fn parse_domain_record(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_lowercase(), value.trim().to_lowercase()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// 解析 `virsh domiflist`，返回以 `prefix` 开头的接口名（保持列举顺序）
pub fn parse_interface_list(text: &str, prefix: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|name| name.starts_with(prefix))
        .map(str::to_string)
        .collect()
}

/// 解析 `virsh domifstat` / `virsh domblkstat` 的计数器输出
///
/// 每行形如 `vda rd_req 1234`（设备名可省略），取最后两列作为
/// (metric, value)。非空行少于两列视为格式错误。
pub fn parse_counter_records(text: &str) -> Result<Vec<(String, String)>> {
    let mut records = Vec::new();

    for line in text.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [] => continue,
            [.., metric, value] => records.push((metric.to_string(), value.to_string())),
            [_] => return Err(Error::Format(format!("无法识别的计数器行: {:?}", line))),
        }
    }

    if records.is_empty() {
        return Err(Error::Format("计数器输出为空".to_string()));
    }

    Ok(records)
}
