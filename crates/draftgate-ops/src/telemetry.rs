//! Telemetry counters keyed by pipeline mode and emotion category
//!
//! Counters are monotonic atomics owned by the service instance. A finalized
//! request bumps `requests`, exactly one terminal bucket, and `retries` when
//! a retry was issued.
//!
//! Emotion keys come from clients, so the per-emotion tree is bounded: keys
//! are cut to [`MAX_EMOTION_KEY_CHARS`] and once [`MAX_EMOTION_KEYS`] distinct
//! keys exist, new ones fold into [`OVERFLOW_EMOTION`].

use draftgate_core::{DraftError, PipelineMode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

pub const MAX_EMOTION_KEYS: usize = 64;
pub const MAX_EMOTION_KEY_CHARS: usize = 32;
pub const OVERFLOW_EMOTION: &str = "other";

/// A single counter bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Bucket {
    Requests,
    Success,
    Retries,
    FallbackRecoveries,
    ParseFailures,
    SchemaBlocks,
    SimilarityBlocks,
    ComplianceBlocks,
    ModelEmpty,
    ReferenceBlocks,
    ModelErrors,
    InputRejects,
}

const BUCKETS: usize = 12;

impl Bucket {
    pub const ALL: [Bucket; BUCKETS] = [
        Bucket::Requests,
        Bucket::Success,
        Bucket::Retries,
        Bucket::FallbackRecoveries,
        Bucket::ParseFailures,
        Bucket::SchemaBlocks,
        Bucket::SimilarityBlocks,
        Bucket::ComplianceBlocks,
        Bucket::ModelEmpty,
        Bucket::ReferenceBlocks,
        Bucket::ModelErrors,
        Bucket::InputRejects,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Requests => "requests",
            Bucket::Success => "success",
            Bucket::Retries => "retries",
            Bucket::FallbackRecoveries => "fallbackRecoveries",
            Bucket::ParseFailures => "parseFailures",
            Bucket::SchemaBlocks => "schemaBlocks",
            Bucket::SimilarityBlocks => "similarityBlocks",
            Bucket::ComplianceBlocks => "complianceBlocks",
            Bucket::ModelEmpty => "modelEmpty",
            Bucket::ReferenceBlocks => "referenceBlocks",
            Bucket::ModelErrors => "modelErrors",
            Bucket::InputRejects => "inputRejects",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }

    /// Terminal bucket for a rejection. `None` for outcomes that are never
    /// recorded (cancelled before the model answered).
    pub fn for_error(err: &DraftError) -> Option<Bucket> {
        let bucket = match err {
            DraftError::SchemaInvalid { .. } => Bucket::SchemaBlocks,
            DraftError::ParseFailed { .. } => Bucket::ParseFailures,
            DraftError::ModelEmpty => Bucket::ModelEmpty,
            DraftError::ModelTimeout { .. }
            | DraftError::ModelError { .. }
            | DraftError::KeyMissing => Bucket::ModelErrors,
            DraftError::ReferenceRequired
            | DraftError::ReferenceOutOfScope { .. }
            | DraftError::ReferenceWeakGrounding { .. } => Bucket::ReferenceBlocks,
            DraftError::SimilarityBlocked { .. } => Bucket::SimilarityBlocks,
            DraftError::ComplianceBlocked { .. } => Bucket::ComplianceBlocks,
            DraftError::ParagraphInvalid { .. }
            | DraftError::InteractiveSpecOnly
            | DraftError::RequestInvalid { .. } => Bucket::InputRejects,
            DraftError::Cancelled => return None,
        };
        Some(bucket)
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One set of atomic counters
#[derive(Debug, Default)]
struct Counters {
    values: [AtomicU64; BUCKETS],
}

impl Counters {
    fn incr(&self, bucket: Bucket) {
        self.values[bucket.index()].fetch_add(1, Ordering::SeqCst);
    }

    fn load(&self, bucket: Bucket) -> u64 {
        self.values[bucket.index()].load(Ordering::SeqCst)
    }

    /// `requests` is read last so a snapshot never shows a bucket above it.
    fn snapshot(&self) -> TelemetryCounters {
        let mut c = TelemetryCounters {
            success: self.load(Bucket::Success),
            retries: self.load(Bucket::Retries),
            fallback_recoveries: self.load(Bucket::FallbackRecoveries),
            parse_failures: self.load(Bucket::ParseFailures),
            schema_blocks: self.load(Bucket::SchemaBlocks),
            similarity_blocks: self.load(Bucket::SimilarityBlocks),
            compliance_blocks: self.load(Bucket::ComplianceBlocks),
            model_empty: self.load(Bucket::ModelEmpty),
            reference_blocks: self.load(Bucket::ReferenceBlocks),
            model_errors: self.load(Bucket::ModelErrors),
            input_rejects: self.load(Bucket::InputRejects),
            ..Default::default()
        };
        c.requests = self.load(Bucket::Requests);
        c
    }
}

/// Plain counter values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryCounters {
    pub requests: u64,
    pub success: u64,
    pub retries: u64,
    pub fallback_recoveries: u64,
    pub parse_failures: u64,
    pub schema_blocks: u64,
    pub similarity_blocks: u64,
    pub compliance_blocks: u64,
    pub model_empty: u64,
    pub reference_blocks: u64,
    pub model_errors: u64,
    pub input_rejects: u64,
}

impl TelemetryCounters {
    pub fn get(&self, bucket: Bucket) -> u64 {
        match bucket {
            Bucket::Requests => self.requests,
            Bucket::Success => self.success,
            Bucket::Retries => self.retries,
            Bucket::FallbackRecoveries => self.fallback_recoveries,
            Bucket::ParseFailures => self.parse_failures,
            Bucket::SchemaBlocks => self.schema_blocks,
            Bucket::SimilarityBlocks => self.similarity_blocks,
            Bucket::ComplianceBlocks => self.compliance_blocks,
            Bucket::ModelEmpty => self.model_empty,
            Bucket::ReferenceBlocks => self.reference_blocks,
            Bucket::ModelErrors => self.model_errors,
            Bucket::InputRejects => self.input_rejects,
        }
    }

    /// Outcomes that are terminal failures
    pub fn failures(&self) -> u64 {
        self.parse_failures
            + self.schema_blocks
            + self.similarity_blocks
            + self.compliance_blocks
            + self.model_empty
            + self.reference_blocks
            + self.model_errors
            + self.input_rejects
    }

    /// No bucket exceeds `requests`, and the terminal buckets sum to at most it.
    pub fn is_consistent(&self) -> bool {
        Bucket::ALL.iter().all(|b| self.get(*b) <= self.requests)
            && self.success + self.fallback_recoveries + self.failures() <= self.requests
    }
}

/// Stats tree served by the admin endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub totals: TelemetryCounters,
    pub by_mode: BTreeMap<String, TelemetryCounters>,
    pub by_emotion: BTreeMap<String, TelemetryCounters>,
}

/// Concurrency-safe counters. Owned by the service instance, shared via `Arc`.
#[derive(Debug, Default)]
pub struct TelemetryAggregator {
    totals: Counters,
    by_mode: [Counters; 6],
    by_emotion: RwLock<HashMap<String, Arc<Counters>>>,
}

impl TelemetryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bump one bucket for the aggregate, the mode and (if any) the emotion.
    pub fn increment(&self, mode: PipelineMode, emotion: Option<&str>, bucket: Bucket) {
        self.totals.incr(bucket);
        self.by_mode[mode.index()].incr(bucket);
        if let Some(emotion) = emotion {
            self.emotion_counters(emotion).incr(bucket);
        }
    }

    /// Record one finalized request.
    pub fn record_outcome(
        &self,
        mode: PipelineMode,
        emotion: Option<&str>,
        terminal: Bucket,
        retried: bool,
    ) {
        self.increment(mode, emotion, Bucket::Requests);
        if retried {
            self.increment(mode, emotion, Bucket::Retries);
        }
        self.increment(mode, emotion, terminal);
        tracing::debug!(mode = %mode, bucket = %terminal, retried, "telemetry recorded");
    }

    fn emotion_counters(&self, emotion: &str) -> Arc<Counters> {
        let key: String = emotion.chars().take(MAX_EMOTION_KEY_CHARS).collect();
        if let Some(counters) = self
            .by_emotion
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
        {
            return Arc::clone(counters);
        }
        let mut map = self
            .by_emotion
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let key = if map.contains_key(&key) || map.len() < MAX_EMOTION_KEYS {
            key
        } else {
            OVERFLOW_EMOTION.to_string()
        };
        Arc::clone(map.entry(key).or_default())
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let by_emotion = self
            .by_emotion
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(k, v)| (k.clone(), v.snapshot()))
            .collect();

        TelemetrySnapshot {
            totals: self.totals.snapshot(),
            by_mode: PipelineMode::ALL
                .iter()
                .map(|m| (m.as_str().to_string(), self.by_mode[m.index()].snapshot()))
                .collect(),
            by_emotion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_record_outcome_updates_all_trees() {
        let telemetry = TelemetryAggregator::new();
        telemetry.record_outcome(PipelineMode::Draft, Some("hope"), Bucket::Success, false);
        telemetry.record_outcome(PipelineMode::Draft, None, Bucket::SchemaBlocks, true);

        let snap = telemetry.snapshot();
        assert_eq!(snap.totals.requests, 2);
        assert_eq!(snap.totals.success, 1);
        assert_eq!(snap.totals.schema_blocks, 1);
        assert_eq!(snap.totals.retries, 1);
        assert_eq!(snap.by_mode["draft"].requests, 2);
        assert_eq!(snap.by_mode["interactive-longform"].requests, 0);
        assert_eq!(snap.by_emotion["hope"].success, 1);
        assert!(snap.totals.is_consistent());
    }

    #[test]
    fn test_emotion_keys_are_bounded() {
        let telemetry = TelemetryAggregator::new();
        for i in 0..500 {
            let emotion = format!("mood-{}", i);
            telemetry.record_outcome(PipelineMode::Draft, Some(&emotion), Bucket::Success, false);
        }
        telemetry.record_outcome(PipelineMode::Draft, Some("mood-3"), Bucket::Success, false);
        let long = "x".repeat(1000);
        telemetry.record_outcome(PipelineMode::Chat, Some(&long), Bucket::Success, false);

        let snap = telemetry.snapshot();
        assert!(snap.by_emotion.len() <= MAX_EMOTION_KEYS + 1);
        assert_eq!(snap.by_emotion["mood-3"].requests, 2);
        assert_eq!(
            snap.by_emotion[OVERFLOW_EMOTION].requests,
            (500 - MAX_EMOTION_KEYS + 1) as u64
        );
        assert!(snap.by_emotion.keys().all(|k| k.chars().count() <= MAX_EMOTION_KEY_CHARS));
        let total: u64 = snap.by_emotion.values().map(|c| c.requests).sum();
        assert_eq!(total, snap.totals.requests);
    }

    #[test]
    fn test_every_mode_present_in_snapshot() {
        let snap = TelemetryAggregator::new().snapshot();
        assert_eq!(snap.by_mode.len(), PipelineMode::ALL.len());
        assert!(snap.by_emotion.is_empty());
    }

    #[test]
    fn test_bucket_for_error() {
        assert_eq!(
            Bucket::for_error(&DraftError::ModelTimeout { timeout_ms: 8000 }),
            Some(Bucket::ModelErrors)
        );
        assert_eq!(
            Bucket::for_error(&DraftError::ReferenceRequired),
            Some(Bucket::ReferenceBlocks)
        );
        assert_eq!(Bucket::for_error(&DraftError::Cancelled), None);
    }

    #[test]
    fn test_bucket_names_match_wire_names() {
        let value = serde_json::to_value(TelemetryCounters::default()).unwrap();
        for bucket in Bucket::ALL {
            assert!(value.get(bucket.as_str()).is_some(), "{}", bucket);
        }
    }

    #[test]
    fn test_concurrent_increments() {
        let telemetry = Arc::new(TelemetryAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let telemetry = Arc::clone(&telemetry);
                thread::spawn(move || {
                    let emotion = if i % 2 == 0 { "anger" } else { "joy" };
                    for _ in 0..250 {
                        telemetry.record_outcome(
                            PipelineMode::InteractiveLongform,
                            Some(emotion),
                            Bucket::Success,
                            false,
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snap = telemetry.snapshot();
        assert_eq!(snap.totals.requests, 2000);
        assert_eq!(snap.by_mode["interactive-longform"].success, 2000);
        assert_eq!(snap.by_emotion["anger"].requests, 1000);
        assert_eq!(snap.by_emotion["joy"].requests, 1000);
    }
}
