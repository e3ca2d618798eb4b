use std::collections::VecDeque;

use serde::Serialize;

use crate::utils::now_epoch_ms;

const DEFAULT_WINDOW_SIZE: usize = 256;
const CHECK_P95_TARGET_MS: u64 = 2_000;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    pub samples: usize,
    pub average_ms: u64,
    pub p95_ms: u64,
    pub max_ms: u64,
}

impl MetricSummary {
    fn empty() -> Self {
        Self {
            samples: 0,
            average_ms: 0,
            p95_ms: 0,
            max_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub generated_at_ms: u64,
    pub check_latency: MetricSummary,
    pub checks_completed: u64,
    pub checks_failed: u64,
    pub stale_responses_discarded: u64,
    pub checks_skipped_while_locked: u64,
    pub corrections_applied: u64,
    pub warnings: Vec<String>,
}

#[derive(Debug)]
struct RollingMetric {
    values: VecDeque<u64>,
    capacity: usize,
}

impl RollingMetric {
    fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn record(&mut self, value_ms: u64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value_ms);
    }

    fn summary(&self) -> MetricSummary {
        if self.values.is_empty() {
            return MetricSummary::empty();
        }

        let samples = self.values.len();
        let sum: u64 = self.values.iter().sum();
        let average_ms = sum / samples as u64;
        let max_ms = *self.values.iter().max().unwrap_or(&0);

        let mut sorted = self.values.iter().copied().collect::<Vec<_>>();
        sorted.sort_unstable();
        let p95_index = ((samples as f64 * 0.95).ceil() as usize)
            .saturating_sub(1)
            .min(samples - 1);
        let p95_ms = sorted[p95_index];

        MetricSummary {
            samples,
            average_ms,
            p95_ms,
            max_ms,
        }
    }
}

#[derive(Debug)]
pub struct AnalysisMetrics {
    check_latency_ms: RollingMetric,
    checks_completed: u64,
    checks_failed: u64,
    stale_responses_discarded: u64,
    checks_skipped_while_locked: u64,
    corrections_applied: u64,
}

impl AnalysisMetrics {
    pub fn new() -> Self {
        Self {
            check_latency_ms: RollingMetric::new(DEFAULT_WINDOW_SIZE),
            checks_completed: 0,
            checks_failed: 0,
            stale_responses_discarded: 0,
            checks_skipped_while_locked: 0,
            corrections_applied: 0,
        }
    }

    pub fn record_check(&mut self, latency_ms: u64) {
        self.check_latency_ms.record(latency_ms);
        self.checks_completed += 1;
    }

    pub fn record_failure(&mut self) {
        self.checks_failed += 1;
    }

    pub fn record_stale_discard(&mut self) {
        self.stale_responses_discarded += 1;
    }

    pub fn record_locked_skip(&mut self) {
        self.checks_skipped_while_locked += 1;
    }

    pub fn record_corrections(&mut self, count: u64) {
        self.corrections_applied += count;
    }

    pub fn report(&self) -> AnalysisReport {
        let check_latency = self.check_latency_ms.summary();

        let mut warnings = Vec::new();
        if self.checks_failed > 0 {
            warnings.push(format!(
                "{} analysis requests failed; highlights may be out of date.",
                self.checks_failed
            ));
        }
        if check_latency.samples > 0 && check_latency.p95_ms > CHECK_P95_TARGET_MS {
            warnings.push(format!(
                "Analysis P95 latency {}ms exceeded target {}ms.",
                check_latency.p95_ms, CHECK_P95_TARGET_MS
            ));
        }

        AnalysisReport {
            generated_at_ms: now_epoch_ms(),
            check_latency,
            checks_completed: self.checks_completed,
            checks_failed: self.checks_failed,
            stale_responses_discarded: self.stale_responses_discarded,
            checks_skipped_while_locked: self.checks_skipped_while_locked,
            corrections_applied: self.corrections_applied,
            warnings,
        }
    }
}

impl Default for AnalysisMetrics {
    fn default() -> Self {
        Self::new()
    }
}
