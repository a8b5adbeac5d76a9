//! draftgate core: data model, error taxonomy, model gateway seam, settings
//!
//! Shared vocabulary for the validation-and-orchestration layer that sits
//! between editorial clients and the generative model.

pub mod context;
pub mod data_model;
pub mod error;
pub mod gateway;
pub mod scenario;
pub mod settings;

pub use context::{Actor, RequestContext};
pub use data_model::{
    ChatIntent, ChatReply, ComplianceFlag, ComplianceReport, DraftSection, FallbackReason,
    GeneratedDraft, GenerationMode, GenerationOutcome, GenerationRequest, MediaSlot,
    PipelineMode, ReferenceArticle, RegeneratedParagraph, RiskLevel, SourceCitation,
    ValidationIssue,
};
pub use error::DraftError;
pub use gateway::{invoke_bounded, CallFailure, GatewayError, ModelCall, ModelGateway};
pub use scenario::{Scenario, ScenarioGateway};
pub use settings::{AdminSettings, SettingsPatch, SettingsSource, SettingsStore};

/// Engine version reported by the health endpoint
pub const DRAFTGATE_VERSION: &str = "1.0.0";
