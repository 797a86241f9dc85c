//! 广播指标收集模块
//!
//! 通过 `metrics` facade 上报，安装 Prometheus recorder 后可被抓取；
//! 未安装时调用为空操作。

use std::collections::HashMap;
use std::time::Duration;

use contracts::{BroadcastResult, BroadcastSummary, DeliveryStatus};
use metrics::{counter, gauge, histogram};

/// 记录单个连接的投递结果
pub fn record_delivery(status: DeliveryStatus) {
    counter!(
        "fanout_deliveries_total",
        "status" => status.as_str()
    )
    .increment(1);
}

/// 记录一次广播的汇总
///
/// 每次 dispatcher 返回 `BroadcastResult` 时调用。
pub fn record_broadcast(result: &BroadcastResult, elapsed: Duration) {
    counter!("fanout_broadcasts_total").increment(1);
    histogram!("fanout_broadcast_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
    histogram!("fanout_broadcast_recipients").record((result.len() + result.abandoned()) as f64);

    if result.is_cancelled() {
        counter!("fanout_broadcasts_cancelled_total").increment(1);
        counter!("fanout_deliveries_abandoned_total").increment(result.abandoned() as u64);
    }
}

/// 记录 stale 连接清理
pub fn record_cleanup(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("fanout_stale_cleanup_total", "status" => status).increment(1);
}

/// 记录注册表快照大小
pub fn record_snapshot_size(size: usize) {
    gauge!("fanout_registry_connections").set(size as f64);
}

/// 广播指标聚合器
///
/// 在内存中聚合，用于 CLI 结束时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct BroadcastStatsAggregator {
    pub total_broadcasts: u64,
    pub cancelled_broadcasts: u64,
    /// 按投递状态计数
    pub status_counts: HashMap<DeliveryStatus, u64>,
    pub total_abandoned: u64,
    /// 每次广播的接收者数量
    pub fanout_stats: RunningStats,
    /// 每次广播耗时 (毫秒)
    pub latency_stats: RunningStats,
}

impl BroadcastStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并一次广播结果
    pub fn update(&mut self, result: &BroadcastResult, elapsed: Duration) {
        self.update_summary(&result.summary(), elapsed);
    }

    /// 合并一次广播摘要 (例如从网关响应中解析得到)
    pub fn update_summary(&mut self, summary: &BroadcastSummary, elapsed: Duration) {
        self.total_broadcasts += 1;
        if summary.cancelled {
            self.cancelled_broadcasts += 1;
        }
        self.total_abandoned += summary.abandoned as u64;

        for (status, n) in [
            (DeliveryStatus::Delivered, summary.delivered),
            (DeliveryStatus::TransientFailure, summary.transient_failures),
            (DeliveryStatus::StaleRecipient, summary.stale),
        ] {
            *self.status_counts.entry(status).or_insert(0) += n as u64;
        }

        self.fanout_stats.push(summary.recipients as f64);
        self.latency_stats.push(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn count(&self, status: DeliveryStatus) -> u64 {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    pub fn summary(&self) -> BroadcastStatsSummary {
        let attempted: u64 = self.status_counts.values().sum();
        BroadcastStatsSummary {
            total_broadcasts: self.total_broadcasts,
            cancelled_broadcasts: self.cancelled_broadcasts,
            delivered: self.count(DeliveryStatus::Delivered),
            transient_failures: self.count(DeliveryStatus::TransientFailure),
            stale: self.count(DeliveryStatus::StaleRecipient),
            abandoned: self.total_abandoned,
            delivery_rate: if attempted > 0 {
                self.count(DeliveryStatus::Delivered) as f64 / attempted as f64 * 100.0
            } else {
                0.0
            },
            fanout: StatsSummary::from(&self.fanout_stats),
            latency_ms: StatsSummary::from(&self.latency_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 聚合摘要
#[derive(Debug, Clone, Default)]
pub struct BroadcastStatsSummary {
    pub total_broadcasts: u64,
    pub cancelled_broadcasts: u64,
    pub delivered: u64,
    pub transient_failures: u64,
    pub stale: u64,
    pub abandoned: u64,
    pub delivery_rate: f64,
    pub fanout: StatsSummary,
    pub latency_ms: StatsSummary,
}

impl std::fmt::Display for BroadcastStatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Broadcast Summary ===")?;
        writeln!(
            f,
            "Broadcasts: {} ({} cancelled)",
            self.total_broadcasts, self.cancelled_broadcasts
        )?;
        writeln!(
            f,
            "Delivered: {} ({:.2}%)",
            self.delivered, self.delivery_rate
        )?;
        writeln!(f, "Transient failures: {}", self.transient_failures)?;
        writeln!(f, "Stale recipients: {}", self.stale)?;
        if self.abandoned > 0 {
            writeln!(f, "Abandoned: {}", self.abandoned)?;
        }
        writeln!(f, "Recipients per broadcast: {}", self.fanout)?;
        writeln!(f, "Broadcast latency (ms): {}", self.latency_ms)
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "N/A");
        }
        write!(
            f,
            "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
            self.min, self.max, self.mean, self.std_dev, self.count
        )
    }
}

/// 在线统计 (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::DeliveryOutcome;

    fn result() -> BroadcastResult {
        BroadcastResult::completed(vec![
            DeliveryOutcome::delivered("b".into()),
            DeliveryOutcome::delivered("c".into()),
            DeliveryOutcome::stale("d".into(), "gone"),
            DeliveryOutcome::transient("e".into(), "boom"),
        ])
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [2.0, 4.0, 6.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 3);
        assert!((stats.mean() - 4.0).abs() < 1e-10);
        assert!((stats.variance() - 4.0).abs() < 1e-10);
        assert!((stats.min() - 2.0).abs() < 1e-10);
        assert!((stats.max() - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = BroadcastStatsAggregator::new();
        aggregator.update(&result(), Duration::from_millis(10));
        aggregator.update(
            &BroadcastResult::cancelled(vec![DeliveryOutcome::delivered("b".into())], 3),
            Duration::from_millis(30),
        );

        let summary = aggregator.summary();
        assert_eq!(summary.total_broadcasts, 2);
        assert_eq!(summary.cancelled_broadcasts, 1);
        assert_eq!(summary.delivered, 3);
        assert_eq!(summary.stale, 1);
        assert_eq!(summary.transient_failures, 1);
        assert_eq!(summary.abandoned, 3);
        assert!((summary.delivery_rate - 60.0).abs() < 1e-10);
        assert!((summary.fanout.mean - 4.0).abs() < 1e-10);
        assert!((summary.latency_ms.mean - 20.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = BroadcastStatsAggregator::new();
        assert!(aggregator.summary().to_string().contains("N/A"));

        aggregator.update(&result(), Duration::from_millis(5));
        let text = aggregator.summary().to_string();
        assert!(text.contains("Broadcasts: 1 (0 cancelled)"));
        assert!(text.contains("Stale recipients: 1"));
    }

    #[test]
    fn test_recorders_without_exporter() {
        record_delivery(DeliveryStatus::Delivered);
        record_broadcast(&result(), Duration::from_millis(1));
        record_cleanup(false);
        record_snapshot_size(4);
    }
}
