//! Server configuration read from the environment
use draftgate_core::settings::{DEFAULT_MODEL_TIMEOUT_MS, DEFAULT_TITLE_MAX_LENGTH};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8787";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ALERT_TICK_SECS: u64 = 60;

/// Connection settings for the OpenAI-compatible model backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelClientConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for ModelClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: String,
    /// Raw env value; clamping happens in the settings store.
    pub title_max_length: i64,
    pub model_timeout_ms: i64,
    pub model: ModelClientConfig,
    /// Reference URLs a draft may cite
    pub citation_pool: Vec<String>,
    /// Extra mode profiles (YAML files) replacing the built-in ones
    pub profile_paths: Vec<PathBuf>,
    /// Honor the `x-ai-draft-scenario` header
    pub test_mode: bool,
    pub alert_tick: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            title_max_length: DEFAULT_TITLE_MAX_LENGTH as i64,
            model_timeout_ms: DEFAULT_MODEL_TIMEOUT_MS as i64,
            model: ModelClientConfig::default(),
            citation_pool: Vec::new(),
            profile_paths: Vec::new(),
            test_mode: false,
            alert_tick: Duration::from_secs(DEFAULT_ALERT_TICK_SECS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            addr: get("DRAFTGATE_ADDR").unwrap_or(defaults.addr),
            title_max_length: parse_or("AI_DRAFT_TITLE_MAX_LENGTH", get("AI_DRAFT_TITLE_MAX_LENGTH"), defaults.title_max_length),
            model_timeout_ms: parse_or("AI_NEWS_MODEL_TIMEOUT_MS", get("AI_NEWS_MODEL_TIMEOUT_MS"), defaults.model_timeout_ms),
            model: ModelClientConfig {
                api_key: get("AI_NEWS_API_KEY"),
                model: get("AI_NEWS_MODEL").unwrap_or(defaults.model.model),
                base_url: get("AI_NEWS_BASE_URL").unwrap_or(defaults.model.base_url),
            },
            citation_pool: get("AI_NEWS_CITATION_POOL")
                .map(|raw| parse_citation_pool(&raw))
                .unwrap_or_default(),
            profile_paths: get("DRAFTGATE_PROFILE_PATHS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(PathBuf::from)
                        .collect()
                })
                .unwrap_or_default(),
            test_mode: get("DRAFTGATE_TEST_MODE").is_some_and(|v| is_truthy(&v)),
            alert_tick: Duration::from_secs(
                parse_or("DRAFTGATE_ALERT_TICK_SECS", get("DRAFTGATE_ALERT_TICK_SECS"), DEFAULT_ALERT_TICK_SECS)
                    .max(1),
            ),
        }
    }

    pub fn with_test_mode(mut self, enabled: bool) -> Self {
        self.test_mode = enabled;
        self
    }

    pub fn with_citation_pool(mut self, pool: Vec<String>) -> Self {
        self.citation_pool = pool;
        self
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparseable config value");
            default
        }),
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Comma-separated absolute URLs; anything else is dropped with a warning.
pub fn parse_citation_pool(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match url::Url::parse(entry) {
            Ok(_) => Some(entry.to_string()),
            Err(e) => {
                tracing::warn!(url = entry, error = %e, "dropping invalid citation pool entry");
                None
            }
        })
        .collect()
}
