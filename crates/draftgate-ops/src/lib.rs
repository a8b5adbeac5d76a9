//! draftgate ops: telemetry, alerting and the admin audit trail
//!
//! The orchestrator writes; admin endpoints and the periodic tick read.
//!
//! ```text
//! finalized outcome ─┬─▶ TelemetryAggregator   (monotonic counters by mode/emotion)
//!                    └─▶ AlertEvaluator.record (latency + failure sample)
//!
//! admin update ─────────▶ AdminAuditLog
//! ```

pub mod alerts;
pub mod audit;
pub mod telemetry;
pub mod window;

pub use alerts::{
    ActiveAlertCounts, AlertEvaluator, AlertMetric, AlertSeverity, AlertThresholds, AlertType,
    OpsAlert, OpsAlertSummary, WindowMetrics, DEFAULT_WINDOW_MINUTES,
};
pub use audit::{AdminAuditEntry, AdminAuditLog, AuditAction};
pub use telemetry::{
    Bucket, TelemetryAggregator, TelemetryCounters, TelemetrySnapshot, MAX_EMOTION_KEYS,
    MAX_EMOTION_KEY_CHARS, OVERFLOW_EMOTION,
};
pub use window::{nearest_rank_percentile, OutcomeSample, SampleWindow};
