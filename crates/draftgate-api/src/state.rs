//! Shared application state handed to every handler
use crate::config::AppConfig;
use crate::model_client::HttpModelGateway;
use axum::http::HeaderMap;
use draftgate_core::{ModelGateway, Scenario, ScenarioGateway, SettingsStore};
use draftgate_ops::AdminAuditLog;
use draftgate_pipeline::GenerationOrchestrator;
use draftgate_quality::{ModeProfile, ValidationGate};
use std::sync::Arc;

pub const SCENARIO_HEADER: &str = "x-ai-draft-scenario";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub orchestrator: GenerationOrchestrator,
    pub audit: Arc<AdminAuditLog>,
}

impl AppState {
    /// State backed by an explicit gateway.
    pub fn new(config: AppConfig, gateway: Arc<dyn ModelGateway>) -> Self {
        Self::with_gate(config, gateway, Vec::new())
    }

    fn with_gate(config: AppConfig, gateway: Arc<dyn ModelGateway>, profiles: Vec<ModeProfile>) -> Self {
        let settings = Arc::new(SettingsStore::from_env_values(
            config.title_max_length,
            config.model_timeout_ms,
        ));
        let gate = profiles
            .into_iter()
            .fold(ValidationGate::new(config.citation_pool.clone()), |gate, p| {
                gate.with_profile(p)
            });
        let orchestrator = GenerationOrchestrator::new(gateway, settings).with_gate(gate);

        Self {
            config: Arc::new(config),
            orchestrator,
            audit: Arc::new(AdminAuditLog::new()),
        }
    }

    /// Production state: HTTP model client plus any YAML profiles.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let gateway = HttpModelGateway::new(config.model.clone())?;
        let mut profiles = Vec::with_capacity(config.profile_paths.len());
        for path in &config.profile_paths {
            let yaml = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("reading profile {}: {}", path.display(), e))?;
            let profile = ModeProfile::from_yaml(&yaml)?;
            tracing::info!(profile = %profile.name, mode = %profile.mode, "loaded mode profile");
            profiles.push(profile);
        }
        if config.model.api_key.is_none() {
            tracing::warn!("AI_NEWS_API_KEY is not set; model calls will fail with AI_NEWS_KEY_MISSING");
        }
        Ok(Self::with_gate(config, Arc::new(gateway), profiles))
    }

    /// Per-request scenario gateway. Only honored in test mode.
    pub fn scenario_gateway(&self, headers: &HeaderMap) -> Option<Arc<dyn ModelGateway>> {
        if !self.config.test_mode {
            return None;
        }
        let raw = headers.get(SCENARIO_HEADER)?.to_str().ok()?;
        match Scenario::parse(raw) {
            Some(scenario) => Some(Arc::new(ScenarioGateway::new(scenario))),
            None => {
                tracing::debug!(scenario = raw, "unknown scenario header ignored");
                None
            }
        }
    }
}
