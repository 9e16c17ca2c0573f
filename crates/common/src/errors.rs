use thiserror::Error;

/// 统一错误类型
///
/// 采集链路中除 `Config`/`Io` 外的错误都在组件边界被消化，
/// 只会导致对应指标行被置零或省略，不会中断整轮采集。
#[derive(Error, Debug)]
pub enum Error {
    /// 外部查询失败（非零退出、超时、输出为空）
    #[error("数据源不可用: {0}")]
    SourceUnavailable(String),

    /// 虚拟机状态不是 running
    #[error("虚拟机未运行: {0}")]
    NotRunning(String),

    /// 外部数据源返回了无法识别的文本
    #[error("格式错误: {0}")]
    Format(String),

    /// 定义文件缺少 uuid，或后端磁盘文件不存在
    #[error("记录未找到: {0}")]
    NotFound(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部错误: {0}")]
    Internal(String),

    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 统一结果类型
pub type Result<T> = std::result::Result<T, Error>;
