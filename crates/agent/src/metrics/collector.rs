/// 指标收集器
///
/// 对单个实例依次查询域状态、进程 CPU、网卡计数器和磁盘计数器，
/// 组装成一个完整的 `InstanceReport`。各数据源的失败在这里被消化：
///
/// - dominfo 不可用：内存行置零，CPU 时间记为 0，其余采集照常进行
/// - 实例未运行：只输出 instance、置零的 memory 和 cpu 三行
/// - 找不到进程：cpu_usage 置零，cpu_time 仍取自 dominfo
/// - 网卡、磁盘查询失败：对应行直接省略
/// - 镜像容量查询失败：只省略 bytes_used 字段

use common::utils::{parse_duration, parse_kib, parse_size};
use common::{Category, DiskRole, DomainSnapshot, DomainState, Error, Instance, InstanceReport, MetricLine, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::hypervisor::parser::{parse_counter_records, parse_domain_record, parse_interface_list};
use crate::hypervisor::Hypervisor;
use crate::process::ProcessTable;
use crate::storage::{resolve_backing_file, ImageInspector};

/// 收集器的静态设置
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    /// 实例磁盘根目录
    pub instances_dir: PathBuf,
    /// 磁盘角色，按顺序输出
    pub disk_roles: Vec<DiskRole>,
    /// 需要采集的网卡名前缀
    pub interface_prefix: String,
    /// interface 行使用的固定标签
    pub interface_label: String,
}

impl From<&Config> for CollectorSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            instances_dir: cfg.instances_dir.clone(),
            disk_roles: cfg.disk_roles.clone(),
            interface_prefix: cfg.interface_prefix.clone(),
            interface_label: cfg.interface_label.clone(),
        }
    }
}

pub struct MetricsCollector {
    hypervisor: Arc<dyn Hypervisor>,
    processes: Arc<dyn ProcessTable>,
    images: Arc<dyn ImageInspector>,
    settings: CollectorSettings,
}

impl MetricsCollector {
    pub fn new(
        hypervisor: Arc<dyn Hypervisor>,
        processes: Arc<dyn ProcessTable>,
        images: Arc<dyn ImageInspector>,
        settings: CollectorSettings,
    ) -> Self {
        Self {
            hypervisor,
            processes,
            images,
            settings,
        }
    }

    /// 采集单个实例
    pub async fn collect(&self, instance: &Instance) -> InstanceReport {
        let uuid = instance.uuid.as_str();
        let mut report = InstanceReport::new();

        report.push(MetricLine::instance(uuid, &instance.name));

        let cpu_time = match self.domain_snapshot(&instance.name).await {
            Ok(snapshot) => {
                report.push(MetricLine::memory(uuid, snapshot.memory_max_kib, snapshot.memory_used_kib));
                snapshot.cpu_time_seconds
            }
            Err(Error::NotRunning(state)) => {
                debug!("实例 {} 状态为 {}，跳过其余指标", instance.name, state);
                report.push(MetricLine::memory(uuid, 0, 0));
                report.push(MetricLine::cpu(uuid, 0, 0));
                return report;
            }
            Err(e) => {
                debug!("实例 {} 的域信息不可用: {}", instance.name, e);
                report.push(MetricLine::memory(uuid, 0, 0));
                0
            }
        };

        report.push(self.cpu_line(instance, cpu_time).await);

        if let Some(line) = self.interface_line(instance).await {
            report.push(line);
        }

        for role in &self.settings.disk_roles {
            if let Some(line) = self.disk_line(instance, role).await {
                report.push(line);
            }
        }

        report
    }

    /// 查询域信息并检查运行状态
    ///
    /// 查询失败返回 `SourceUnavailable`，缺少 state 返回 `Format`，
    /// 非 running 返回 `NotRunning`。数值字段解析失败只记为 0。
    pub async fn domain_snapshot(&self, name: &str) -> Result<DomainSnapshot> {
        let text = self.hypervisor.domain_info(name).await?;
        let record = parse_domain_record(&text);

        let state = record
            .get("state")
            .map(|state| DomainState::from(state.as_str()))
            .ok_or_else(|| Error::Format(format!("{} 的域信息缺少 state", name)))?;

        if !state.is_running() {
            return Err(Error::NotRunning(state.to_string()));
        }

        Ok(DomainSnapshot {
            state,
            cpu_time_seconds: record_value(&record, "cpu time", parse_duration, name),
            memory_max_kib: record_value(&record, "max memory", parse_kib, name),
            memory_used_kib: record_value(&record, "used memory", parse_kib, name),
        })
    }

    async fn cpu_line(&self, instance: &Instance, cpu_time: u64) -> MetricLine {
        let usage = match self.processes.find_pid(&instance.name).await {
            Ok(pid) => match self.processes.cpu_percent(pid).await {
                Ok(percent) => percent as u64,
                Err(e) => {
                    debug!("实例 {} 的进程 {} CPU 采样失败: {}", instance.name, pid, e);
                    0
                }
            },
            Err(e) => {
                debug!("实例 {} 没有找到进程: {}", instance.name, e);
                0
            }
        };

        MetricLine::cpu(&instance.uuid, usage, cpu_time)
    }

    async fn interface_line(&self, instance: &Instance) -> Option<MetricLine> {
        let listing = match self.hypervisor.domain_interfaces(&instance.name).await {
            Ok(listing) => listing,
            Err(e) => {
                debug!("实例 {} 网卡列表不可用: {}", instance.name, e);
                return None;
            }
        };

        let interfaces = parse_interface_list(&listing, &self.settings.interface_prefix);
        if interfaces.is_empty() {
            debug!("实例 {} 没有 {}* 网卡", instance.name, self.settings.interface_prefix);
            return None;
        }

        // 所有网卡的计数器按顺序合并到同一行
        let mut counters = Vec::new();
        for iface in &interfaces {
            let stats = self
                .hypervisor
                .interface_stats(&instance.name, iface)
                .await
                .and_then(|text| parse_counter_records(&text));

            match stats {
                Ok(records) => counters.extend(records),
                Err(e) => warn!("实例 {} 网卡 {} 统计不可用: {}", instance.name, iface, e),
            }
        }

        if counters.is_empty() {
            return None;
        }

        Some(
            MetricLine::new(&instance.uuid, Category::Interface)
                .field("interface", &self.settings.interface_label)
                .records(counters),
        )
    }

    async fn disk_line(&self, instance: &Instance, role: &DiskRole) -> Option<MetricLine> {
        let Some(path) = resolve_backing_file(
            &self.settings.instances_dir,
            &instance.name,
            &instance.uuid,
            &role.role_name,
        ) else {
            debug!("实例 {} 没有 {} 磁盘文件", instance.name, role.role_name);
            return None;
        };

        let counters = match self
            .hypervisor
            .block_stats(&instance.name, &role.block_device_name)
            .await
            .and_then(|text| parse_counter_records(&text))
        {
            Ok(counters) => counters,
            Err(e) => {
                debug!("实例 {} 磁盘 {} 统计不可用: {}", instance.name, role.block_device_name, e);
                return None;
            }
        };

        let mut line = MetricLine::new(&instance.uuid, Category::Disk)
            .field("disk", &role.block_device_name)
            .records(counters);

        match self.images.disk_size(&path).await.and_then(|size| parse_size(&size)) {
            Ok(bytes) => line = line.field("bytes_used", bytes),
            Err(e) => debug!("镜像 {:?} 容量不可用: {}", path, e),
        }

        Some(line)
    }
}

/// 取出并解析域信息中的数值字段，缺失或无法解析时记为 0
fn record_value(
    record: &HashMap<String, String>,
    key: &str,
    parse: fn(&str) -> Result<u64>,
    name: &str,
) -> u64 {
    match record.get(key).map(|value| parse(value)) {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            warn!("实例 {} 的 {} 无法解析: {}", name, key, e);
            0
        }
        None => {
            warn!("实例 {} 的域信息缺少 {}", name, key);
            0
        }
    }
}
