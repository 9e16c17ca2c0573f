/// 指标采集与输出

pub mod collector;
pub mod report;

#[cfg(test)]
pub mod testing;

pub use collector::{CollectorSettings, MetricsCollector};
pub use report::{run_report, RunSummary};
