use serde::Serialize;

use crate::models::failure_stats::FailureCount;
use crate::models::outcome::Outcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Percentiles {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
}

/// How the failures of a run should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnosis {
    Clean,
    // 主动断开附近的超时、reset，属于预期
    ExpectedDisruption,
    // 大面积连接被拒，服务端大概率挂了
    ServerDown,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub total: u64,
    pub ok: u64,
    pub failed: u64,
    pub aborted: u64,
    pub unreachable: u64,
    pub total_bytes: u64,
    pub avg_bytes: f64,
    pub avg_duration_secs: f64,
    pub min_duration_secs: f64,
    pub max_duration_secs: f64,
    pub duration_ms: Percentiles,
    pub ttfb_ms: Percentiles,
    pub elapsed_secs: f64,
    pub failure_samples: Vec<Outcome>,
    pub failure_counts: Vec<FailureCount>,
}

impl RunSummary {
    pub fn diagnosis(&self) -> Diagnosis {
        if self.failed == 0 {
            Diagnosis::Clean
        } else if self.unreachable * 2 >= self.total {
            Diagnosis::ServerDown
        } else {
            Diagnosis::ExpectedDisruption
        }
    }
}
