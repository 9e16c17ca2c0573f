/// Instance Metrics - 公共库
///
/// 提供错误类型、指标数据模型、单位换算和外部命令执行等共享工具

pub mod errors;
pub mod models;
pub mod utils;

// 重新导出常用类型
pub use errors::{Error, Result};
pub use models::{Category, DiskRole, DomainSnapshot, DomainState, Instance, InstanceReport, MetricLine};
