//! Windowed alert evaluation
//!
//! ```text
//! OutcomeSample ──record──▶ SampleWindow (ring, 4096)
//!                                │
//!                evaluate_at(now, windowMinutes)
//!                                │
//!        failureRate / p95LatencyMs / aiErrorCount
//!                                │
//!          two-tier thresholds ──▶ OpsAlert (deduped while active)
//! ```
//!
//! The clock is an argument, so evaluation is reproducible in tests. Active
//! conditions are tracked per window length, so evaluating a short window
//! never clears a condition that is still active over a longer one.
//! [`AlertEvaluator::peek_at`] reads a window without touching that state.

use crate::window::{nearest_rank_percentile, OutcomeSample, SampleWindow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const DEFAULT_WINDOW_MINUTES: u32 = 10;
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    FailureRate,
    Latency,
    AiError,
}

impl AlertType {
    pub const ALL: [AlertType; 3] = [AlertType::FailureRate, AlertType::Latency, AlertType::AiError];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::FailureRate => "failure_rate",
            AlertType::Latency => "latency",
            AlertType::AiError => "ai_error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "failure_rate" => Some(AlertType::FailureRate),
            "latency" => Some(AlertType::Latency),
            "ai_error" => Some(AlertType::AiError),
            _ => None,
        }
    }

    fn unit(&self) -> &'static str {
        match self {
            AlertType::FailureRate => "ratio",
            AlertType::Latency => "ms",
            AlertType::AiError => "count",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertMetric {
    pub value: f64,
    pub threshold: f64,
    pub unit: String,
    pub window_minutes: u32,
}

/// An emitted alert. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpsAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub metric: AlertMetric,
    pub created_at: DateTime<Utc>,
    /// Synthesized by an operational drill
    #[serde(default)]
    pub test: bool,
}

/// Two-tier thresholds per alert type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertThresholds {
    pub failure_rate_warning: f64,
    pub failure_rate_critical: f64,
    /// Failure rate is not judged on fewer samples than this
    pub failure_rate_min_samples: usize,
    pub p95_warning_ms: u64,
    pub p95_critical_ms: u64,
    pub ai_error_warning: usize,
    pub ai_error_critical: usize,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            failure_rate_warning: 0.20,
            failure_rate_critical: 0.50,
            failure_rate_min_samples: 5,
            p95_warning_ms: 1500,
            p95_critical_ms: 3000,
            ai_error_warning: 3,
            ai_error_critical: 10,
        }
    }
}

impl AlertThresholds {
    fn tier<T: PartialOrd>(value: T, warning: T, critical: T) -> Option<AlertSeverity> {
        if value >= critical {
            Some(AlertSeverity::Critical)
        } else if value >= warning {
            Some(AlertSeverity::Warning)
        } else {
            None
        }
    }

    fn threshold(&self, alert_type: AlertType, severity: AlertSeverity) -> f64 {
        match (alert_type, severity) {
            (AlertType::FailureRate, AlertSeverity::Warning) => self.failure_rate_warning,
            (AlertType::FailureRate, AlertSeverity::Critical) => self.failure_rate_critical,
            (AlertType::Latency, AlertSeverity::Warning) => self.p95_warning_ms as f64,
            (AlertType::Latency, AlertSeverity::Critical) => self.p95_critical_ms as f64,
            (AlertType::AiError, AlertSeverity::Warning) => self.ai_error_warning as f64,
            (AlertType::AiError, AlertSeverity::Critical) => self.ai_error_critical as f64,
        }
    }
}

/// Derived metrics over one window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowMetrics {
    pub total_samples: usize,
    pub failure_rate: f64,
    pub p95_latency_ms: u64,
    pub ai_error_count: usize,
}

impl WindowMetrics {
    pub fn from_samples(samples: &[OutcomeSample]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let failed = samples.iter().filter(|s| s.failed).count();
        let mut latencies: Vec<u64> = samples.iter().map(|s| s.latency_ms).collect();
        latencies.sort_unstable();
        Self {
            total_samples: samples.len(),
            failure_rate: failed as f64 / samples.len() as f64,
            p95_latency_ms: nearest_rank_percentile(&latencies, 95),
            ai_error_count: samples.iter().filter(|s| s.ai_error).count(),
        }
    }

    fn value(&self, alert_type: AlertType) -> f64 {
        match alert_type {
            AlertType::FailureRate => self.failure_rate,
            AlertType::Latency => self.p95_latency_ms as f64,
            AlertType::AiError => self.ai_error_count as f64,
        }
    }

    fn severity(&self, alert_type: AlertType, t: &AlertThresholds) -> Option<AlertSeverity> {
        match alert_type {
            AlertType::FailureRate if self.total_samples >= t.failure_rate_min_samples => {
                AlertThresholds::tier(self.failure_rate, t.failure_rate_warning, t.failure_rate_critical)
            }
            AlertType::FailureRate => None,
            AlertType::Latency if self.total_samples > 0 => {
                AlertThresholds::tier(self.p95_latency_ms, t.p95_warning_ms, t.p95_critical_ms)
            }
            AlertType::Latency => None,
            AlertType::AiError => {
                AlertThresholds::tier(self.ai_error_count, t.ai_error_warning, t.ai_error_critical)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAlertCounts {
    pub warning: usize,
    pub critical: usize,
}

/// Windowed snapshot returned by `evaluate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpsAlertSummary {
    pub failure_rate: f64,
    pub p95_latency_ms: u64,
    pub ai_error_count: usize,
    pub total_samples: usize,
    pub window_minutes: u32,
    pub active_alerts: ActiveAlertCounts,
    pub evaluated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct EvaluatorState {
    window: SampleWindow,
    /// Conditions currently over threshold per window length, with the last
    /// emitted severity
    active: HashMap<(AlertType, u32), AlertSeverity>,
    history: VecDeque<OpsAlert>,
}

/// Consumes outcome samples and emits threshold alerts
#[derive(Debug)]
pub struct AlertEvaluator {
    thresholds: AlertThresholds,
    history_limit: usize,
    state: Mutex<EvaluatorState>,
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::new(AlertThresholds::default())
    }
}

impl AlertEvaluator {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self {
            thresholds,
            history_limit: DEFAULT_HISTORY_LIMIT,
            state: Mutex::new(EvaluatorState::default()),
        }
    }

    pub fn with_sample_capacity(self, capacity: usize) -> Self {
        self.lock().window = SampleWindow::with_capacity(capacity);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EvaluatorState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a completed outcome to the window.
    pub fn record(&self, sample: OutcomeSample) {
        self.lock().window.push(sample);
    }

    pub fn sample_count(&self) -> usize {
        self.lock().window.len()
    }

    pub fn evaluate(&self, window_minutes: u32) -> OpsAlertSummary {
        self.evaluate_at(Utc::now(), window_minutes)
    }

    /// Recompute window metrics at `now`, emit alerts for newly crossed or
    /// escalated thresholds and clear conditions that dropped below warning.
    pub fn evaluate_at(&self, now: DateTime<Utc>, window_minutes: u32) -> OpsAlertSummary {
        let window_minutes = window_minutes.max(1);
        let mut state = self.lock();
        let metrics = WindowMetrics::from_samples(&state.window.within(now, window_minutes));

        for alert_type in AlertType::ALL {
            let current = metrics.severity(alert_type, &self.thresholds);
            let key = (alert_type, window_minutes);
            let previous = state.active.get(&key).copied();
            match current {
                None => {
                    if previous.is_some() {
                        tracing::info!(alert = %alert_type, window_minutes, "alert condition cleared");
                        state.active.remove(&key);
                    }
                }
                Some(severity) => {
                    if previous.map_or(true, |p| severity > p) {
                        let alert = OpsAlert {
                            id: uuid::Uuid::new_v4().to_string(),
                            alert_type,
                            severity,
                            metric: AlertMetric {
                                value: metrics.value(alert_type),
                                threshold: self.thresholds.threshold(alert_type, severity),
                                unit: alert_type.unit().to_string(),
                                window_minutes,
                            },
                            created_at: now,
                            test: false,
                        };
                        tracing::warn!(
                            alert = %alert_type,
                            severity = severity.as_str(),
                            value = alert.metric.value,
                            threshold = alert.metric.threshold,
                            "ops alert raised"
                        );
                        push_bounded(&mut state.history, alert, self.history_limit);
                    }
                    state.active.insert(key, severity);
                }
            }
        }

        summarize(&state, &metrics, window_minutes, now)
    }

    pub fn peek(&self, window_minutes: u32) -> OpsAlertSummary {
        self.peek_at(Utc::now(), window_minutes)
    }

    /// Window metrics and the active conditions last recorded for this window
    /// length. Emits nothing and clears nothing.
    pub fn peek_at(&self, now: DateTime<Utc>, window_minutes: u32) -> OpsAlertSummary {
        let window_minutes = window_minutes.max(1);
        let state = self.lock();
        let metrics = WindowMetrics::from_samples(&state.window.within(now, window_minutes));
        summarize(&state, &metrics, window_minutes, now)
    }

    /// Newest first
    pub fn recent_alerts(&self, limit: usize) -> Vec<OpsAlert> {
        self.lock().history.iter().rev().take(limit).cloned().collect()
    }

    /// Synthesize a warning alert for drills. Does not touch samples or the
    /// active-condition set.
    pub fn trigger_test(&self, alert_type: AlertType) -> OpsAlert {
        let threshold = self.thresholds.threshold(alert_type, AlertSeverity::Warning);
        let alert = OpsAlert {
            id: uuid::Uuid::new_v4().to_string(),
            alert_type,
            severity: AlertSeverity::Warning,
            metric: AlertMetric {
                value: threshold,
                threshold,
                unit: alert_type.unit().to_string(),
                window_minutes: DEFAULT_WINDOW_MINUTES,
            },
            created_at: Utc::now(),
            test: true,
        };
        tracing::info!(alert = %alert_type, id = %alert.id, "test alert triggered");
        push_bounded(&mut self.lock().history, alert.clone(), self.history_limit);
        alert
    }
}

fn summarize(
    state: &EvaluatorState,
    metrics: &WindowMetrics,
    window_minutes: u32,
    now: DateTime<Utc>,
) -> OpsAlertSummary {
    let mut active_alerts = ActiveAlertCounts::default();
    for ((_, window), severity) in &state.active {
        if *window != window_minutes {
            continue;
        }
        match severity {
            AlertSeverity::Warning => active_alerts.warning += 1,
            AlertSeverity::Critical => active_alerts.critical += 1,
        }
    }

    OpsAlertSummary {
        failure_rate: metrics.failure_rate,
        p95_latency_ms: metrics.p95_latency_ms,
        ai_error_count: metrics.ai_error_count,
        total_samples: metrics.total_samples,
        window_minutes,
        active_alerts,
        evaluated_at: now,
    }
}

fn push_bounded(history: &mut VecDeque<OpsAlert>, alert: OpsAlert, limit: usize) {
    history.push_back(alert);
    while history.len() > limit {
        history.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn failures(evaluator: &AlertEvaluator, now: DateTime<Utc>, n: usize, ai_error: bool) {
        for _ in 0..n {
            evaluator.record(OutcomeSample::failure(now - Duration::seconds(30), 200, ai_error));
        }
    }

    fn successes(evaluator: &AlertEvaluator, now: DateTime<Utc>, n: usize, latency_ms: u64) {
        for _ in 0..n {
            evaluator.record(OutcomeSample::success(now - Duration::seconds(30), latency_ms));
        }
    }

    #[test]
    fn test_quiet_window_has_no_alerts() {
        let evaluator = AlertEvaluator::default();
        let now = Utc::now();
        successes(&evaluator, now, 20, 300);
        let summary = evaluator.evaluate_at(now, 10);
        assert_eq!(summary.total_samples, 20);
        assert_eq!(summary.failure_rate, 0.0);
        assert_eq!(summary.active_alerts, ActiveAlertCounts::default());
        assert!(evaluator.recent_alerts(10).is_empty());
    }

    #[test]
    fn test_failure_rate_warning_and_critical() {
        let evaluator = AlertEvaluator::default();
        let now = Utc::now();
        successes(&evaluator, now, 7, 100);
        failures(&evaluator, now, 3, false);

        let summary = evaluator.evaluate_at(now, 10);
        assert!((summary.failure_rate - 0.3).abs() < 1e-9);
        assert_eq!(summary.active_alerts.warning, 1);
        let alerts = evaluator.recent_alerts(10);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::FailureRate);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
        assert_eq!(alerts[0].metric.threshold, 0.20);

        // Escalation emits a new alert
        failures(&evaluator, now, 10, false);
        let summary = evaluator.evaluate_at(now, 10);
        assert_eq!(summary.active_alerts.critical, 1);
        assert_eq!(evaluator.recent_alerts(10)[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_failure_rate_needs_minimum_samples() {
        let evaluator = AlertEvaluator::default();
        let now = Utc::now();
        failures(&evaluator, now, 2, false);
        let summary = evaluator.evaluate_at(now, 10);
        assert_eq!(summary.failure_rate, 1.0);
        assert!(evaluator.recent_alerts(10).is_empty());
    }

    #[test]
    fn test_duplicate_suppressed_until_cleared() {
        let evaluator = AlertEvaluator::default();
        let now = Utc::now();
        failures(&evaluator, now, 3, true);

        evaluator.evaluate_at(now, 10);
        evaluator.evaluate_at(now, 10);
        let ai_alerts = |e: &AlertEvaluator| {
            e.recent_alerts(100)
                .into_iter()
                .filter(|a| a.alert_type == AlertType::AiError)
                .count()
        };
        assert_eq!(ai_alerts(&evaluator), 1);

        // Samples age out, the condition clears, and a new breach re-alerts
        let later = now + Duration::minutes(20);
        let summary = evaluator.evaluate_at(later, 10);
        assert_eq!(summary.total_samples, 0);
        assert_eq!(summary.active_alerts, ActiveAlertCounts::default());

        failures(&evaluator, later, 3, true);
        evaluator.evaluate_at(later, 10);
        assert_eq!(ai_alerts(&evaluator), 2);
    }

    #[test]
    fn test_short_window_does_not_clear_longer_window() {
        let evaluator = AlertEvaluator::default();
        let now = Utc::now();
        for _ in 0..3 {
            evaluator.record(OutcomeSample::failure(now - Duration::minutes(5), 200, true));
        }

        evaluator.evaluate_at(now, 10);
        let short = evaluator.evaluate_at(now, 1);
        assert_eq!(short.ai_error_count, 0);
        assert_eq!(short.active_alerts, ActiveAlertCounts::default());
        let summary = evaluator.evaluate_at(now, 10);
        assert_eq!(summary.active_alerts.warning, 1);

        let ai_alerts = evaluator
            .recent_alerts(100)
            .into_iter()
            .filter(|a| a.alert_type == AlertType::AiError)
            .count();
        assert_eq!(ai_alerts, 1);
    }

    #[test]
    fn test_peek_is_read_only() {
        let evaluator = AlertEvaluator::default();
        let now = Utc::now();
        failures(&evaluator, now, 3, true);

        let peeked = evaluator.peek_at(now, 10);
        assert_eq!(peeked.ai_error_count, 3);
        assert_eq!(peeked.active_alerts, ActiveAlertCounts::default());
        assert!(evaluator.recent_alerts(10).is_empty());

        evaluator.evaluate_at(now, 10);
        assert_eq!(evaluator.peek_at(now, 10).active_alerts.warning, 1);
        // An empty window seen through peek leaves the condition active
        evaluator.peek_at(now + Duration::minutes(30), 10);
        evaluator.evaluate_at(now, 10);
        assert_eq!(evaluator.recent_alerts(10).len(), 1);
    }

    #[test]
    fn test_p95_latency() {
        let evaluator = AlertEvaluator::default();
        let now = Utc::now();
        successes(&evaluator, now, 18, 200);
        successes(&evaluator, now, 2, 3200);
        let summary = evaluator.evaluate_at(now, 10);
        assert_eq!(summary.p95_latency_ms, 3200);
        assert_eq!(summary.active_alerts.critical, 1);
        assert_eq!(evaluator.recent_alerts(1)[0].alert_type, AlertType::Latency);
        assert_eq!(evaluator.recent_alerts(1)[0].metric.unit, "ms");
    }

    #[test]
    fn test_trigger_test_is_isolated() {
        let evaluator = AlertEvaluator::default();
        let alert = evaluator.trigger_test(AlertType::Latency);
        assert!(alert.test);
        assert_eq!(evaluator.sample_count(), 0);
        let summary = evaluator.evaluate(10);
        assert_eq!(summary.active_alerts, ActiveAlertCounts::default());
        assert_eq!(evaluator.recent_alerts(5), vec![alert]);
    }

    #[test]
    fn test_history_is_bounded() {
        let evaluator = AlertEvaluator::default().with_history_limit(3);
        for _ in 0..5 {
            evaluator.trigger_test(AlertType::AiError);
        }
        assert_eq!(evaluator.recent_alerts(10).len(), 3);
    }

    #[test]
    fn test_alert_wire_shape() {
        let alert = AlertEvaluator::default().trigger_test(AlertType::FailureRate);
        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["type"], "failure_rate");
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["metric"]["windowMinutes"], 10);
        assert!(value.get("createdAt").is_some());
        assert_eq!(AlertType::parse("AI-ERROR"), Some(AlertType::AiError));
    }
}
