/// Instance Metrics - Agent
///
/// 运行在计算节点上，采集每个实例的 CPU、内存、网卡和磁盘指标，
/// 以 `<uuid> <category> <k:v> ...` 的文本行输出到标准输出

use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod config;
mod hypervisor;
mod metrics;
mod process;
mod registry;
mod storage;

use config::{Config, HypervisorBackend};
use hypervisor::Hypervisor;
use metrics::{CollectorSettings, MetricsCollector};
use storage::ImageInspector;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    dotenvy::dotenv().ok();
    let cfg = Config::from_env()?;

    // 初始化日志
    // 日志写到 stderr，stdout 只用于输出指标
    // 可以通过环境变量 RUST_LOG 覆盖 LOG_LEVEL，例如：
    // RUST_LOG=instance_metrics=debug instance-metrics
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level)),
        )
        .init();

    info!("🚀 启动 instance-metrics...");

    // 初始化数据源
    let hypervisor = build_hypervisor(&cfg)?;
    let processes = Arc::new(process::SysinfoProcessTable::new());
    let images = Arc::new(storage::QemuImg::new(cfg.query_timeout));
    info!("🔧 数据源: {} / {}", hypervisor.backend(), images.inspector_type());

    // 枚举实例，这是唯一的致命错误
    let registry = registry::InstanceRegistry::new(&cfg.definitions_dir, &cfg.definition_prefix);
    let instances = registry
        .load()
        .await
        .with_context(|| format!("无法枚举实例定义: {:?}", cfg.definitions_dir))?;

    let collector = MetricsCollector::new(hypervisor, processes, images, CollectorSettings::from(&cfg));

    // Ctrl-C 时停止开始新的实例，已写出的块保留
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⚠️ 收到中断信号，停止采集");
            trigger.cancel();
        }
    });

    let mut stdout = tokio::io::stdout();
    let summary = metrics::run_report(&collector, instances, cfg.concurrency, &mut stdout, cancel).await?;

    info!(
        "📊 本轮采集结束: 发现 {} 个实例，输出 {} 个{}",
        summary.discovered,
        summary.reported,
        if summary.cancelled { "（已取消）" } else { "" }
    );

    Ok(())
}

/// 根据配置选择 hypervisor 后端
fn build_hypervisor(cfg: &Config) -> anyhow::Result<Arc<dyn Hypervisor>> {
    match cfg.hypervisor_backend {
        HypervisorBackend::Virsh => Ok(Arc::new(hypervisor::VirshHypervisor::new(
            &cfg.libvirt_uri,
            cfg.query_timeout,
        ))),
        #[cfg(feature = "libvirt")]
        HypervisorBackend::Libvirt => Ok(Arc::new(hypervisor::LibvirtHypervisor::connect(
            &cfg.libvirt_uri,
        )?)),
        #[cfg(not(feature = "libvirt"))]
        HypervisorBackend::Libvirt => {
            anyhow::bail!("HYPERVISOR_BACKEND=libvirt 需要启用 libvirt feature 重新编译")
        }
    }
}
