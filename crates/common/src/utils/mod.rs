/// 工具函数集合

pub mod command;
pub mod units;

pub use command::run_command;
pub use units::{parse_duration, parse_kib, parse_size};
