//! Data Model: requests, drafts, compliance reports and chat replies
use serde::{Deserialize, Serialize};

/// Generation pipeline selected by a draft request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationMode {
    /// Short-form draft, at most one media slot.
    #[default]
    Draft,
    /// Extended article, at least three media slots.
    InteractiveLongform,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Draft => "draft",
            GenerationMode::InteractiveLongform => "interactive-longform",
        }
    }

    pub fn pipeline(&self) -> PipelineMode {
        match self {
            GenerationMode::Draft => PipelineMode::Draft,
            GenerationMode::InteractiveLongform => PipelineMode::InteractiveLongform,
        }
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every pipeline the orchestrator dispatches to. Telemetry is keyed by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineMode {
    Draft,
    InteractiveLongform,
    ParagraphRegeneration,
    Chat,
    ComplianceCheck,
    InteractiveSpec,
}

impl PipelineMode {
    pub const ALL: [PipelineMode; 6] = [
        PipelineMode::Draft,
        PipelineMode::InteractiveLongform,
        PipelineMode::ParagraphRegeneration,
        PipelineMode::Chat,
        PipelineMode::ComplianceCheck,
        PipelineMode::InteractiveSpec,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::Draft => "draft",
            PipelineMode::InteractiveLongform => "interactive-longform",
            PipelineMode::ParagraphRegeneration => "paragraph-regeneration",
            PipelineMode::Chat => "chat",
            PipelineMode::ComplianceCheck => "compliance-check",
            PipelineMode::InteractiveSpec => "interactive-spec",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            PipelineMode::Draft => 0,
            PipelineMode::InteractiveLongform => 1,
            PipelineMode::ParagraphRegeneration => 2,
            PipelineMode::Chat => 3,
            PipelineMode::ComplianceCheck => 4,
            PipelineMode::InteractiveSpec => 5,
        }
    }
}

impl std::fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Article the draft must be grounded on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceArticle {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub url: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub keyword: String,
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default)]
    pub reference_article: Option<ReferenceArticle>,
    /// Editorial emotion category (e.g. "hope", "anger"); only used for telemetry.
    #[serde(default)]
    pub emotion: Option<String>,
}

impl GenerationRequest {
    pub fn new(keyword: impl Into<String>, mode: GenerationMode) -> Self {
        Self {
            keyword: keyword.into(),
            mode,
            reference_article: None,
            emotion: None,
        }
    }

    pub fn with_reference(mut self, reference: ReferenceArticle) -> Self {
        self.reference_article = Some(reference);
        self
    }

    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = Some(emotion.into());
        self
    }

    /// Lowercased, trimmed emotion category; `None` when absent or blank.
    pub fn emotion_key(&self) -> Option<String> {
        normalize_emotion(self.emotion.as_deref())
    }
}

pub fn normalize_emotion(emotion: Option<&str>) -> Option<String> {
    emotion
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSection {
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSlot {
    pub id: String,
    /// image | video | chart
    pub kind: String,
    #[serde(default)]
    pub caption: String,
    /// Index of the section the slot is anchored after.
    #[serde(default)]
    pub anchor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCitation {
    pub url: String,
    pub source: String,
}

/// Compliance risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceFlag {
    /// Stable flag code (e.g. "GUARANTEED_RETURN")
    pub code: String,
    pub level: RiskLevel,
    /// The text fragment that triggered the flag
    pub matched: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub risk_level: RiskLevel,
    pub flags: Vec<ComplianceFlag>,
}

impl ComplianceReport {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn is_blocking(&self) -> bool {
        self.risk_level >= RiskLevel::Medium
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDraft {
    pub title: String,
    pub content: String,
    pub sections: Vec<DraftSection>,
    pub compliance: ComplianceReport,
    pub source_citation: SourceCitation,
    pub media_slots: Vec<MediaSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Why a fallback draft was served instead of model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    ParseFailed,
    ModelEmpty,
}

/// Final result of a draft generation.
///
/// A fallback result is a different variant from a grounded success so it
/// can never be mistaken for model-authored content.
#[derive(Debug)]
pub enum GenerationOutcome {
    Success(GeneratedDraft),
    FallbackRecovered {
        draft: GeneratedDraft,
        reason: FallbackReason,
    },
    Blocked(crate::error::DraftError),
}

impl GenerationOutcome {
    pub fn draft(&self) -> Option<&GeneratedDraft> {
        match self {
            GenerationOutcome::Success(draft) => Some(draft),
            GenerationOutcome::FallbackRecovered { draft, .. } => Some(draft),
            GenerationOutcome::Blocked(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            GenerationOutcome::Success(_) => "success",
            GenerationOutcome::FallbackRecovered { .. } => "fallback_recovered",
            GenerationOutcome::Blocked(_) => "blocked",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegeneratedParagraph {
    pub paragraph: String,
    pub paragraph_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatIntent {
    DraftRequest,
    TitleSuggestion,
    ComplianceQuestion,
    FactCheck,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub text: String,
    pub intent: ChatIntent,
    pub recommendation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bias_warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neutral_prompt: Option<String>,
}
