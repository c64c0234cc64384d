use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use histogram::Histogram;
use parking_lot::Mutex;

use crate::models::failure_stats::FailureStats;
use crate::models::outcome::{FailureKind, Outcome};
use crate::models::result::{Percentiles, RunSummary};

pub const FAILURE_SAMPLE_LIMIT: usize = 10;

/// Connect attempts of one run. A round is pending from dispatch until its
/// connect attempt settles, successfully or not.
#[derive(Default)]
pub struct ConnectTracker {
    pending: AtomicU64,
    connected: AtomicU64,
}

impl ConnectTracker {
    pub fn begin(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    pub fn settle(&self, connected: bool) {
        if connected {
            self.connected.fetch_add(1, Ordering::SeqCst);
        }
        let _ = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn connected(&self) -> u64 {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Shared sink for round outcomes. Workers append concurrently; the summary
/// is reduced once after the run drains.
#[derive(Default)]
pub struct ResultAggregator {
    outcomes: Mutex<Vec<Outcome>>,
    ok_count: AtomicU64,
    exhausted_count: AtomicU64,
    connects: Arc<ConnectTracker>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: Outcome) {
        if outcome.ok {
            self.ok_count.fetch_add(1, Ordering::SeqCst);
        }
        if outcome.failure_kind == Some(FailureKind::ResourceExhausted) {
            self.exhausted_count.fetch_add(1, Ordering::SeqCst);
        }
        self.outcomes.lock().push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn connect_tracker(&self) -> Arc<ConnectTracker> {
        self.connects.clone()
    }

    /// True when rounds fail for lack of local sockets, no connection was
    /// ever opened and no dispatched round is still trying to connect.
    pub fn exhausted(&self) -> bool {
        self.exhausted_count.load(Ordering::SeqCst) > 0
            && self.ok_count.load(Ordering::SeqCst) == 0
            && self.connects.connected() == 0
            && self.connects.pending() == 0
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.outcomes.lock().clone()
    }

    pub fn summarize(&self, elapsed: Duration) -> RunSummary {
        let outcomes = self.outcomes.lock();
        let total = outcomes.len() as u64;
        let mut summary = RunSummary {
            total,
            elapsed_secs: elapsed.as_secs_f64(),
            ..Default::default()
        };
        if outcomes.is_empty() {
            return summary;
        }

        let mut duration_sum = 0.0;
        let mut min_duration = f64::MAX;
        let mut max_duration = 0.0f64;
        let mut durations_ms = Vec::with_capacity(outcomes.len());
        let mut ttfbs_ms = Vec::new();
        let mut failure_stats = FailureStats::new();

        for outcome in outcomes.iter() {
            if outcome.ok {
                summary.ok += 1;
            } else {
                summary.failed += 1;
                if let Some(kind) = outcome.failure_kind {
                    failure_stats.increment(kind, &outcome.error_text);
                    if kind.is_unreachable() {
                        summary.unreachable += 1;
                    }
                }
                // 保留最先出现的失败样本
                if summary.failure_samples.len() < FAILURE_SAMPLE_LIMIT {
                    summary.failure_samples.push(outcome.clone());
                }
            }
            if outcome.aborted {
                summary.aborted += 1;
            }
            summary.total_bytes += outcome.bytes_read;
            duration_sum += outcome.duration_secs;
            min_duration = min_duration.min(outcome.duration_secs);
            max_duration = max_duration.max(outcome.duration_secs);
            durations_ms.push(to_millis(outcome.duration_secs));
            if let Some(ttfb) = outcome.ttfb_secs {
                ttfbs_ms.push(to_millis(ttfb));
            }
        }

        summary.avg_bytes = summary.total_bytes as f64 / total as f64;
        summary.avg_duration_secs = duration_sum / total as f64;
        summary.min_duration_secs = min_duration;
        summary.max_duration_secs = max_duration;
        summary.duration_ms = percentiles(&durations_ms);
        summary.ttfb_ms = percentiles(&ttfbs_ms);
        summary.failure_counts = failure_stats.into_sorted();
        summary
    }
}

fn to_millis(secs: f64) -> u64 {
    (secs * 1000.0).round() as u64
}

fn percentiles(values_ms: &[u64]) -> Percentiles {
    if values_ms.is_empty() {
        return Percentiles::default();
    }
    let Ok(mut histogram) = Histogram::new(7, 32) else {
        return Percentiles::default();
    };
    for value in values_ms {
        if let Err(e) = histogram.increment(*value) {
            tracing::warn!("histogram设置数据错误:{:?}", e);
        }
    }
    let line = |p: f64| match histogram.percentile(p) {
        Ok(bucket) => *bucket.range().start(),
        Err(_) => 0,
    };
    Percentiles {
        p50: line(50.0),
        p95: line(95.0),
        p99: line(99.0),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn outcome(index: u64, ok: bool, aborted: bool, bytes: u64, secs: f64) -> Outcome {
        Outcome {
            index,
            ok,
            aborted,
            bytes_read: bytes,
            duration_secs: secs,
            ttfb_secs: (bytes > 0).then_some(secs / 2.0),
            error_text: if ok { String::new() } else { format!("err {index}") },
            failure_kind: (!ok).then_some(FailureKind::Reset),
            abort_after_secs: aborted.then_some(secs),
        }
    }

    #[test]
    fn test_empty_summary_is_zero() {
        let aggregator = ResultAggregator::new();
        let summary = aggregator.summarize(Duration::from_secs(1));
        assert_eq!(summary.total, 0);
        assert_eq!(summary.avg_bytes, 0.0);
        assert_eq!(summary.avg_duration_secs, 0.0);
        assert!(summary.failure_samples.is_empty());
        assert_eq!(summary.duration_ms, Percentiles::default());
    }

    #[test]
    fn test_counts_and_means() {
        let aggregator = ResultAggregator::new();
        aggregator.record(outcome(1, true, false, 100, 1.0));
        aggregator.record(outcome(2, true, true, 50, 0.5));
        aggregator.record(outcome(3, false, false, 0, 1.5));
        aggregator.record(outcome(4, true, false, 150, 1.0));

        let summary = aggregator.summarize(Duration::from_secs(2));
        assert_eq!(summary.total, 4);
        assert_eq!(summary.ok, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.aborted, 1);
        assert_eq!(summary.ok + summary.failed, summary.total);
        assert_eq!(summary.total_bytes, 300);
        assert!((summary.avg_bytes - 75.0).abs() < 1e-9);
        assert!((summary.avg_duration_secs - 1.0).abs() < 1e-9);
        assert_eq!(summary.min_duration_secs, 0.5);
        assert_eq!(summary.max_duration_secs, 1.5);
        assert_eq!(summary.failure_counts.len(), 1);
        assert_eq!(summary.elapsed_secs, 2.0);
    }

    #[test]
    fn test_failure_samples_capped_in_arrival_order() {
        let aggregator = ResultAggregator::new();
        for index in 1..=25 {
            aggregator.record(outcome(index, index % 2 == 0, false, 0, 0.1));
        }
        let summary = aggregator.summarize(Duration::ZERO);
        assert_eq!(summary.failed, 13);
        assert_eq!(summary.failure_samples.len(), FAILURE_SAMPLE_LIMIT);
        let indexes: Vec<u64> = summary.failure_samples.iter().map(|o| o.index).collect();
        assert_eq!(indexes, vec![1, 3, 5, 7, 9, 11, 13, 15, 17, 19]);
    }

    #[test]
    fn test_percentiles() {
        let aggregator = ResultAggregator::new();
        for index in 1..=100 {
            aggregator.record(outcome(index, true, false, 10, index as f64 / 1000.0));
        }
        let summary = aggregator.summarize(Duration::ZERO);
        assert!((49..=51).contains(&summary.duration_ms.p50), "{:?}", summary.duration_ms);
        assert!((94..=96).contains(&summary.duration_ms.p95), "{:?}", summary.duration_ms);
        assert!(summary.ttfb_ms.p50 <= summary.duration_ms.p50);
    }

    fn starved(index: u64) -> Outcome {
        let mut starved = outcome(index, false, false, 0, 0.0);
        starved.failure_kind = Some(FailureKind::ResourceExhausted);
        starved
    }

    #[test]
    fn test_exhausted() {
        let aggregator = ResultAggregator::new();
        assert!(!aggregator.exhausted());
        aggregator.record(starved(1));
        assert!(aggregator.exhausted());
        aggregator.record(outcome(2, true, false, 10, 0.1));
        assert!(!aggregator.exhausted());
    }

    #[test]
    fn test_not_exhausted_while_rounds_still_connecting() {
        let aggregator = ResultAggregator::new();
        let connects = aggregator.connect_tracker();
        connects.begin();
        connects.begin();
        aggregator.record(starved(1));
        assert!(!aggregator.exhausted());

        // 剩下一轮也没连上
        connects.settle(false);
        connects.settle(false);
        assert!(aggregator.exhausted());
    }

    #[test]
    fn test_not_exhausted_once_any_connection_opened() {
        let aggregator = ResultAggregator::new();
        let connects = aggregator.connect_tracker();
        connects.begin();
        connects.settle(true);
        // 已连上的轮次还在传输，尚未记录结果
        aggregator.record(starved(2));
        assert_eq!(connects.pending(), 0);
        assert!(!aggregator.exhausted());
    }

    #[test]
    fn test_settle_without_begin_does_not_underflow() {
        let connects = ConnectTracker::default();
        connects.settle(false);
        assert_eq!(connects.pending(), 0);
    }

    #[test]
    fn test_concurrent_record() {
        let aggregator = Arc::new(ResultAggregator::new());
        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let aggregator = aggregator.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        aggregator.record(outcome(t * 100 + i + 1, true, false, 1, 0.01));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let summary = aggregator.summarize(Duration::ZERO);
        assert_eq!(summary.total, 800);
        assert_eq!(summary.total_bytes, 800);
    }
}
