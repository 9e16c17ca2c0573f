/// 报告输出
///
/// 多个实例可以同时采集，但输出始终按注册表顺序逐个实例写出，
/// 每个实例的所有行作为一个连续块，写完立即 flush。

use common::{Instance, Result};
use futures::stream::{self, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::collector::MetricsCollector;

/// 一轮采集的结果统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// 发现的实例数
    pub discovered: usize,
    /// 已写出的实例数
    pub reported: usize,
    /// 是否因取消而提前结束
    pub cancelled: bool,
}

/// 采集所有实例并写出报告
///
/// 最多 `concurrency` 个实例同时在采集中。取消后不再开始新的实例，
/// 进行中的实例被丢弃，已经写出的块不受影响。
pub async fn run_report<W>(
    collector: &MetricsCollector,
    instances: Vec<Instance>,
    concurrency: usize,
    writer: &mut W,
    cancel: CancellationToken,
) -> Result<RunSummary>
where
    W: AsyncWrite + Unpin,
{
    let discovered = instances.len();
    debug!("开始采集 {} 个实例 (并发: {})", discovered, concurrency);

    let reports = stream::iter(instances)
        .map(|instance| async move {
            let report = collector.collect(&instance).await;
            debug!("实例 {} 采集完成，{} 行", instance.name, report.lines.len());
            report
        })
        .buffered(concurrency.max(1))
        .take_until(cancel.cancelled());
    futures::pin_mut!(reports);

    let mut reported = 0;
    while let Some(report) = reports.next().await {
        writer.write_all(report.render().as_bytes()).await?;
        writer.flush().await?;
        reported += 1;
    }

    let cancelled = reported < discovered && cancel.is_cancelled();
    if cancelled {
        warn!("⚠️ 采集被取消，已输出 {}/{} 个实例", reported, discovered);
    } else {
        info!("✅ 采集完成，共输出 {} 个实例", reported);
    }

    Ok(RunSummary {
        discovered,
        reported,
        cancelled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::collector::CollectorSettings;
    use crate::metrics::testing::{dominfo, FakeHypervisor, FakeImageInspector, FakeProcessTable};
    use std::sync::Arc;
    use std::time::Duration;

    fn uuid(idx: usize) -> String {
        format!("00000000-0000-4000-8000-{:012}", idx)
    }

    fn instances(count: usize) -> Vec<Instance> {
        (1..=count)
            .map(|idx| Instance::new(format!("instance-{}", idx), uuid(idx)))
            .collect()
    }

    /// 实例编号越小 dominfo 越慢，用来打乱完成顺序
    fn collector(count: usize, slow: Option<(usize, Duration)>) -> MetricsCollector {
        let mut hypervisor = FakeHypervisor::default();
        for idx in 1..=count {
            let name = format!("instance-{}", idx);
            hypervisor = hypervisor
                .with_dominfo(&name, dominfo("running", "1.0s", 2048, 1024))
                .with_delay(&name, Duration::from_millis(10 * (count - idx) as u64));
        }
        if let Some((idx, delay)) = slow {
            hypervisor = hypervisor.with_delay(&format!("instance-{}", idx), delay);
        }

        MetricsCollector::new(
            Arc::new(hypervisor),
            Arc::new(FakeProcessTable::default()),
            Arc::new(FakeImageInspector::default()),
            CollectorSettings {
                instances_dir: std::env::temp_dir().join("instance-metrics-none"),
                disk_roles: Vec::new(),
                interface_prefix: "vnet".to_string(),
                interface_label: "eth0".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_blocks_are_contiguous_and_ordered() {
        let collector = collector(5, None);
        let mut out = Vec::new();

        let summary = run_report(&collector, instances(5), 4, &mut out, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            summary,
            RunSummary {
                discovered: 5,
                reported: 5,
                cancelled: false
            }
        );

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5 * 3);
        for (block, chunk) in lines.chunks(3).enumerate() {
            let expected = uuid(block + 1);
            assert!(chunk.iter().all(|line| line.starts_with(&expected)), "{:?}", chunk);
            assert!(chunk[0].ends_with(&format!("instance:instance-{}", block + 1)));
            assert!(chunk[1].contains(" memory available:2048 used:1024"));
            assert!(chunk[2].contains(" cpu cpu_usage:0 cpu_time:1"));
        }
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let collector = collector(0, None);
        let mut out = Vec::new();

        let summary = run_report(&collector, Vec::new(), 1, &mut out, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.reported, 0);
        assert!(!summary.cancelled);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let collector = collector(3, None);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut out = Vec::new();

        let summary = run_report(&collector, instances(3), 1, &mut out, cancel).await.unwrap();
        assert_eq!(summary.reported, 0);
        assert!(summary.cancelled);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_keeps_finished_blocks() {
        let collector = collector(3, Some((2, Duration::from_secs(30))));
        let cancel = CancellationToken::new();
        let mut out = Vec::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let summary = run_report(&collector, instances(3), 1, &mut out, cancel).await.unwrap();
        assert_eq!(summary.reported, 1);
        assert!(summary.cancelled);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().all(|line| line.starts_with(&uuid(1))));
    }
}
