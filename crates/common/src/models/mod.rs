/// 指标数据模型
///
/// 定义实例、域快照、磁盘角色以及最终输出的指标行

use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result};

/// 计算实例
///
/// 名称是 hypervisor 本地的域名（例如 instance-0000002a），
/// uuid 是全局稳定标识，也是每一行输出的首列。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub name: String,
    pub uuid: String,
}

impl Instance {
    pub fn new(name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: uuid.into(),
        }
    }
}

/// 域状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainState {
    Running,
    /// 其他状态，保留原始文本（shut off、paused 等）
    Other(String),
}

impl DomainState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl From<&str> for DomainState {
    fn from(state: &str) -> Self {
        let state = state.trim().to_lowercase();
        if state == "running" {
            Self::Running
        } else {
            Self::Other(state)
        }
    }
}

impl fmt::Display for DomainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Other(state) => f.write_str(state),
        }
    }
}

/// 单次采集得到的域快照，不做持久化
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSnapshot {
    pub state: DomainState,
    pub cpu_time_seconds: u64,
    pub memory_max_kib: u64,
    pub memory_used_kib: u64,
}

/// 磁盘角色: 实例目录下的文件名 -> 域内块设备名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskRole {
    pub role_name: String,
    pub block_device_name: String,
}

impl DiskRole {
    pub fn new(role_name: impl Into<String>, block_device_name: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
            block_device_name: block_device_name.into(),
        }
    }

    /// 解析 `disk=vda,disk.local=vdb` 形式的角色列表，保持书写顺序
    pub fn parse_list(s: &str) -> Result<Vec<Self>> {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for DiskRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (role, device) = s
            .split_once('=')
            .ok_or_else(|| Error::Config(format!("无效的磁盘角色: {}", s)))?;

        let (role, device) = (role.trim(), device.trim());
        if role.is_empty() || device.is_empty() {
            return Err(Error::Config(format!("无效的磁盘角色: {}", s)));
        }

        Ok(Self::new(role, device))
    }
}

/// 指标类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Instance,
    Memory,
    Cpu,
    Interface,
    Disk,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Memory => "memory",
            Self::Cpu => "cpu",
            Self::Interface => "interface",
            Self::Disk => "disk",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一行指标输出: `<uuid> <category> <k:v> <k:v> ...`
///
/// 字段顺序即数据源给出的顺序，渲染时原样保留。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricLine {
    pub uuid: String,
    pub category: Category,
    pub fields: Vec<(String, String)>,
}

impl MetricLine {
    pub fn new(uuid: impl Into<String>, category: Category) -> Self {
        Self {
            uuid: uuid.into(),
            category,
            fields: Vec::new(),
        }
    }

    /// 追加一个字段
    pub fn field(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    /// 追加一组 (metric, value) 记录
    pub fn records<I>(mut self, records: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.fields.extend(records);
        self
    }

    pub fn instance(uuid: &str, name: &str) -> Self {
        Self::new(uuid, Category::Instance).field("instance", name)
    }

    pub fn memory(uuid: &str, available_kib: u64, used_kib: u64) -> Self {
        Self::new(uuid, Category::Memory)
            .field("available", available_kib)
            .field("used", used_kib)
    }

    pub fn cpu(uuid: &str, cpu_usage: u64, cpu_time: u64) -> Self {
        Self::new(uuid, Category::Cpu)
            .field("cpu_usage", cpu_usage)
            .field("cpu_time", cpu_time)
    }

    /// 查找字段值（测试和日志中使用）
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for MetricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.uuid, self.category)?;
        for (key, value) in &self.fields {
            write!(f, " {}:{}", key, value)?;
        }
        Ok(())
    }
}

/// 单个实例的完整报告，输出时作为一个连续的块写出
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceReport {
    pub lines: Vec<MetricLine>,
}

impl InstanceReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: MetricLine) {
        self.lines.push(line);
    }

    /// 指定类别的所有行
    pub fn lines_of(&self, category: Category) -> impl Iterator<Item = &MetricLine> {
        self.lines.iter().filter(move |line| line.category == category)
    }

    /// 渲染为换行分隔的文本块（末尾带换行）
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }
}
