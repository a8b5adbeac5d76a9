//! Ring buffer of timestamped request outcomes

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_SAMPLE_CAPACITY: usize = 4096;

/// One completed request as seen by the alert evaluator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeSample {
    pub at: DateTime<Utc>,
    pub latency_ms: u64,
    /// Any non-success outcome
    pub failed: bool,
    /// Model empty, timeout or transport/upstream failure
    pub ai_error: bool,
}

impl OutcomeSample {
    pub fn success(at: DateTime<Utc>, latency_ms: u64) -> Self {
        Self {
            at,
            latency_ms,
            failed: false,
            ai_error: false,
        }
    }

    pub fn failure(at: DateTime<Utc>, latency_ms: u64, ai_error: bool) -> Self {
        Self {
            at,
            latency_ms,
            failed: true,
            ai_error,
        }
    }
}

/// Bounded sample buffer; the oldest sample is evicted first.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<OutcomeSample>,
    capacity: usize,
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SAMPLE_CAPACITY)
    }
}

impl SampleWindow {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(DEFAULT_SAMPLE_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, sample: OutcomeSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples within `(now - window_minutes, now]`
    pub fn within(&self, now: DateTime<Utc>, window_minutes: u32) -> Vec<OutcomeSample> {
        let since = now - Duration::minutes(i64::from(window_minutes));
        self.samples
            .iter()
            .filter(|s| s.at > since && s.at <= now)
            .copied()
            .collect()
    }
}

/// Nearest-rank percentile over sorted values; 0 when empty.
pub fn nearest_rank_percentile(sorted: &[u64], percentile: u8) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let p = u128::from(percentile.clamp(1, 100));
    let n = sorted.len() as u128;
    let rank = (p * n + 99) / 100;
    let index = (rank.saturating_sub(1) as usize).min(sorted.len() - 1);
    sorted[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_evicts_oldest() {
        let now = Utc::now();
        let mut window = SampleWindow::with_capacity(3);
        for i in 0..5 {
            window.push(OutcomeSample::success(now, i));
        }
        assert_eq!(window.len(), 3);
        let latencies: Vec<u64> = window.within(now, 1).iter().map(|s| s.latency_ms).collect();
        assert_eq!(latencies, vec![2, 3, 4]);
    }

    #[test]
    fn test_within_excludes_old_and_future() {
        let now = Utc::now();
        let mut window = SampleWindow::default();
        window.push(OutcomeSample::success(now - Duration::minutes(11), 10));
        window.push(OutcomeSample::success(now - Duration::minutes(9), 20));
        window.push(OutcomeSample::success(now + Duration::seconds(5), 30));
        let inside = window.within(now, 10);
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].latency_ms, 20);
    }

    #[test]
    fn test_nearest_rank_percentile() {
        let values: Vec<u64> = (1..=100).collect();
        assert_eq!(nearest_rank_percentile(&values, 95), 95);
        assert_eq!(nearest_rank_percentile(&[700], 95), 700);
        assert_eq!(nearest_rank_percentile(&[100, 200, 300, 400], 95), 400);
        assert_eq!(nearest_rank_percentile(&[], 95), 0);
    }
}
