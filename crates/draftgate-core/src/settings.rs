//! Admin-tunable settings with bounds-clamped updates
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;

pub const TITLE_MAX_LENGTH_MIN: u32 = 30;
pub const TITLE_MAX_LENGTH_MAX: u32 = 140;
pub const MODEL_TIMEOUT_MS_MIN: u64 = 8_000;
pub const MODEL_TIMEOUT_MS_MAX: u64 = 45_000;

pub const DEFAULT_TITLE_MAX_LENGTH: u32 = 60;
pub const DEFAULT_MODEL_TIMEOUT_MS: u64 = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsSource {
    Env,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSettings {
    pub title_max_length: u32,
    pub model_timeout_ms: u64,
    pub source: SettingsSource,
    pub updated_at: DateTime<Utc>,
}

impl AdminSettings {
    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms)
    }
}

/// Partial update. Values are signed so negative input clamps instead of
/// failing to deserialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default)]
    pub title_max_length: Option<i64>,
    #[serde(default)]
    pub model_timeout_ms: Option<i64>,
}

pub fn clamp_title_max_length(value: i64) -> u32 {
    value.clamp(TITLE_MAX_LENGTH_MIN as i64, TITLE_MAX_LENGTH_MAX as i64) as u32
}

pub fn clamp_model_timeout_ms(value: i64) -> u64 {
    value.clamp(MODEL_TIMEOUT_MS_MIN as i64, MODEL_TIMEOUT_MS_MAX as i64) as u64
}

/// Process-wide settings. Last writer wins; no merging of concurrent patches.
#[derive(Debug)]
pub struct SettingsStore {
    inner: RwLock<AdminSettings>,
}

impl SettingsStore {
    /// Seed from environment-provided values (clamped).
    pub fn from_env_values(title_max_length: i64, model_timeout_ms: i64) -> Self {
        Self {
            inner: RwLock::new(AdminSettings {
                title_max_length: clamp_title_max_length(title_max_length),
                model_timeout_ms: clamp_model_timeout_ms(model_timeout_ms),
                source: SettingsSource::Env,
                updated_at: Utc::now(),
            }),
        }
    }

    pub fn get(&self) -> AdminSettings {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Apply `patch`, clamping out-of-range values to the nearest bound.
    pub fn update(&self, patch: SettingsPatch) -> AdminSettings {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(title) = patch.title_max_length {
            guard.title_max_length = clamp_title_max_length(title);
        }
        if let Some(timeout) = patch.model_timeout_ms {
            guard.model_timeout_ms = clamp_model_timeout_ms(timeout);
        }
        guard.source = SettingsSource::Admin;
        guard.updated_at = Utc::now();
        tracing::info!(
            title_max_length = guard.title_max_length,
            model_timeout_ms = guard.model_timeout_ms,
            "admin settings updated"
        );
        guard.clone()
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::from_env_values(
            DEFAULT_TITLE_MAX_LENGTH as i64,
            DEFAULT_MODEL_TIMEOUT_MS as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_defaults_come_from_env() {
        let store = SettingsStore::default();
        let s = store.get();
        assert_eq!(s.title_max_length, DEFAULT_TITLE_MAX_LENGTH);
        assert_eq!(s.model_timeout_ms, DEFAULT_MODEL_TIMEOUT_MS);
        assert_eq!(s.source, SettingsSource::Env);
    }

    #[test]
    fn test_env_values_are_clamped() {
        let store = SettingsStore::from_env_values(5, 1_000_000);
        assert_eq!(store.get().title_max_length, TITLE_MAX_LENGTH_MIN);
        assert_eq!(store.get().model_timeout_ms, MODEL_TIMEOUT_MS_MAX);
    }

    #[test]
    fn test_update_clamps_and_round_trips() {
        let store = SettingsStore::default();
        let original = store.get();

        let updated = store.update(SettingsPatch {
            model_timeout_ms: Some(1_000),
            title_max_length: Some(500),
        });
        assert_eq!(updated.model_timeout_ms, MODEL_TIMEOUT_MS_MIN);
        assert_eq!(updated.title_max_length, TITLE_MAX_LENGTH_MAX);
        assert_eq!(updated.source, SettingsSource::Admin);
        assert_eq!(store.get().model_timeout_ms, MODEL_TIMEOUT_MS_MIN);

        let restored = store.update(SettingsPatch {
            model_timeout_ms: Some(original.model_timeout_ms as i64),
            title_max_length: Some(original.title_max_length as i64),
        });
        assert_eq!(restored.model_timeout_ms, original.model_timeout_ms);
        assert_eq!(restored.title_max_length, original.title_max_length);
    }

    #[test]
    fn test_partial_patch_leaves_other_field() {
        let store = SettingsStore::default();
        store.update(SettingsPatch {
            title_max_length: Some(-3),
            model_timeout_ms: None,
        });
        let s = store.get();
        assert_eq!(s.title_max_length, TITLE_MAX_LENGTH_MIN);
        assert_eq!(s.model_timeout_ms, DEFAULT_MODEL_TIMEOUT_MS);
    }

    #[test]
    fn test_concurrent_updates_settle_on_a_written_value() {
        let store = Arc::new(SettingsStore::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.update(SettingsPatch {
                        title_max_length: Some(40 + i),
                        model_timeout_ms: None,
                    });
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let title = store.get().title_max_length;
        assert!((40..48).contains(&title));
    }
}
