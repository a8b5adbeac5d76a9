//! Unified Error Model
//!
//! Every rejection carries a stable machine code, an HTTP status and a
//! non-empty issue list.
use crate::data_model::{ComplianceReport, ValidationIssue};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DraftError {
    #[error("SCHEMA/{} invalid field(s)", .issues.len())]
    SchemaInvalid { issues: Vec<ValidationIssue> },

    #[error("PARSE/{detail}")]
    ParseFailed { detail: String },

    #[error("MODEL/empty output")]
    ModelEmpty,

    #[error("MODEL/timeout after {timeout_ms}ms")]
    ModelTimeout { timeout_ms: u64 },

    #[error("MODEL/{detail}")]
    ModelError { detail: String },

    #[error("CONFIG/model credentials missing")]
    KeyMissing,

    #[error("REFERENCE/required")]
    ReferenceRequired,

    #[error("REFERENCE/out of scope: {url}")]
    ReferenceOutOfScope { url: String },

    #[error("REFERENCE/weak grounding ({overlap:.2})")]
    ReferenceWeakGrounding { overlap: f64 },

    #[error("SIMILARITY/{} issue(s)", .issues.len())]
    SimilarityBlocked { issues: Vec<ValidationIssue> },

    #[error("COMPLIANCE/{}", .report.risk_level)]
    ComplianceBlocked { report: ComplianceReport },

    #[error("INPUT/paragraph index {index} outside [0, {len})")]
    ParagraphInvalid { index: i64, len: usize },

    #[error("INPUT/interactive story endpoint is spec-only")]
    InteractiveSpecOnly,

    #[error("INPUT/{detail}")]
    RequestInvalid { detail: String },

    #[error("CANCELLED/request cancelled before the model responded")]
    Cancelled,
}

impl DraftError {
    /// Stable code exposed to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SchemaInvalid { .. } | Self::ParseFailed { .. } => "AI_DRAFT_SCHEMA_INVALID",
            Self::ModelEmpty => "AI_NEWS_MODEL_EMPTY",
            Self::ModelTimeout { .. } => "AI_NEWS_MODEL_TIMEOUT",
            Self::ModelError { .. } => "AI_NEWS_MODEL_ERROR",
            Self::KeyMissing => "AI_NEWS_KEY_MISSING",
            Self::ReferenceRequired => "AI_NEWS_REFERENCE_REQUIRED",
            Self::ReferenceOutOfScope { .. } => "AI_NEWS_REFERENCE_OUT_OF_SCOPE",
            Self::ReferenceWeakGrounding { .. } => "AI_NEWS_REFERENCE_WEAK_GROUNDING",
            Self::SimilarityBlocked { issues } => {
                if issues.iter().any(|i| i.code == "AI_NEWS_TITLE_COPY_DETECTED") {
                    "AI_NEWS_TITLE_COPY_DETECTED"
                } else {
                    "AI_NEWS_CONTENT_COPY_DETECTED"
                }
            }
            Self::ComplianceBlocked { .. } => "AI_DRAFT_COMPLIANCE_BLOCKED",
            Self::ParagraphInvalid { .. } => "AI_DRAFT_PARAGRAPH_INVALID",
            Self::InteractiveSpecOnly => "INTERACTIVE_STORY_SPEC_ONLY",
            Self::RequestInvalid { .. } => "AI_DRAFT_REQUEST_INVALID",
            Self::Cancelled => "AI_DRAFT_CANCELLED",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::ParagraphInvalid { .. }
            | Self::InteractiveSpecOnly
            | Self::RequestInvalid { .. } => 400,
            Self::ModelTimeout { .. } => 504,
            Self::KeyMissing => 503,
            // nginx-style "client closed request"
            Self::Cancelled => 499,
            _ => 502,
        }
    }

    /// Human-readable issue list; never empty.
    pub fn issues(&self) -> Vec<ValidationIssue> {
        let issues = match self {
            Self::SchemaInvalid { issues } | Self::SimilarityBlocked { issues } => issues.clone(),
            Self::ParseFailed { detail } => vec![ValidationIssue::new(
                "PARSE_FAILED",
                format!("model output is not a well-formed JSON object: {}", detail),
            )],
            Self::ComplianceBlocked { report } => report
                .flags
                .iter()
                .map(|f| ValidationIssue::new(f.code.clone(), f.message.clone()))
                .collect(),
            _ => Vec::new(),
        };

        if issues.is_empty() {
            vec![ValidationIssue::new(self.code(), self.message())]
        } else {
            issues
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::SchemaInvalid { .. } => "model output is missing required fields".to_string(),
            Self::ParseFailed { .. } => "model output could not be parsed".to_string(),
            Self::ModelEmpty => "model returned an empty response".to_string(),
            Self::ModelTimeout { timeout_ms } => {
                format!("model did not respond within {}ms", timeout_ms)
            }
            Self::ModelError { detail } => format!("model call failed: {}", detail),
            Self::KeyMissing => "model credentials are not configured".to_string(),
            Self::ReferenceRequired => "a reference article is required for citation".to_string(),
            Self::ReferenceOutOfScope { url } => {
                format!("cited url {} is not among the offered references", url)
            }
            Self::ReferenceWeakGrounding { overlap } => format!(
                "content overlaps the reference too little ({:.0}%)",
                overlap * 100.0
            ),
            Self::SimilarityBlocked { .. } => "output copies the reference too closely".to_string(),
            Self::ComplianceBlocked { report } => format!(
                "compliance risk {} with {} flag(s)",
                report.risk_level,
                report.flags.len()
            ),
            Self::ParagraphInvalid { index, len } => format!(
                "paragraphIndex {} is outside the {} available paragraph(s)",
                index, len
            ),
            Self::InteractiveSpecOnly => {
                "interactive stories are generated from a structured spec only; raw markup is not accepted"
                    .to_string()
            }
            Self::RequestInvalid { detail } => format!("invalid request: {}", detail),
            Self::Cancelled => "request was cancelled".to_string(),
        }
    }

    /// Transient failures get one retry; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ParseFailed { .. } | Self::ModelEmpty)
    }

    /// Caller mistakes: never forwarded to the model, never retried.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::ParagraphInvalid { .. } | Self::InteractiveSpecOnly | Self::RequestInvalid { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::{ComplianceFlag, RiskLevel};

    #[test]
    fn test_schema_invalid_keeps_field_issues() {
        let err = DraftError::SchemaInvalid {
            issues: vec![
                ValidationIssue::new("MISSING_FIELD", "title is required"),
                ValidationIssue::new("MISSING_FIELD", "content is required"),
            ],
        };
        assert_eq!(err.code(), "AI_DRAFT_SCHEMA_INVALID");
        assert_eq!(err.http_status(), 502);
        assert_eq!(err.issues().len(), 2);
    }

    #[test]
    fn test_every_error_has_issues() {
        let errors = vec![
            DraftError::ModelEmpty,
            DraftError::ModelTimeout { timeout_ms: 8000 },
            DraftError::KeyMissing,
            DraftError::ReferenceRequired,
            DraftError::ReferenceOutOfScope {
                url: "https://x.test".into(),
            },
            DraftError::ParagraphInvalid { index: 4, len: 2 },
            DraftError::InteractiveSpecOnly,
            DraftError::Cancelled,
        ];
        for err in errors {
            assert!(!err.issues().is_empty(), "{} has no issues", err.code());
        }
    }

    #[test]
    fn test_similarity_code_prefers_title_copy() {
        let err = DraftError::SimilarityBlocked {
            issues: vec![
                ValidationIssue::new("AI_NEWS_CONTENT_COPY_DETECTED", "content"),
                ValidationIssue::new("AI_NEWS_TITLE_COPY_DETECTED", "title"),
            ],
        };
        assert_eq!(err.code(), "AI_NEWS_TITLE_COPY_DETECTED");
    }

    #[test]
    fn test_compliance_issues_come_from_flags() {
        let err = DraftError::ComplianceBlocked {
            report: ComplianceReport {
                risk_level: RiskLevel::Medium,
                flags: vec![ComplianceFlag {
                    code: "GUARANTEED_RETURN".into(),
                    level: RiskLevel::Medium,
                    matched: "원금 보장".into(),
                    message: "guaranteed return claim".into(),
                }],
            },
        };
        assert_eq!(err.issues()[0].code, "GUARANTEED_RETURN");
    }

    #[test]
    fn test_transient_classification() {
        assert!(DraftError::ModelEmpty.is_transient());
        assert!(DraftError::ParseFailed { detail: "eof".into() }.is_transient());
        assert!(!DraftError::ReferenceRequired.is_transient());
        assert!(!DraftError::ModelTimeout { timeout_ms: 1 }.is_transient());
        assert_eq!(
            DraftError::ParagraphInvalid { index: 4, len: 2 }.http_status(),
            400
        );
    }
}
