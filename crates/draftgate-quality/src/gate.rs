//! Validation Gate for raw model output
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. emptiness          → `ModelEmpty`
//! 2. parseability       → `ParseFailed`
//! 3. schema             → `SchemaInvalid(issues)`
//! 4. reference grounding→ `ReferenceRequired` / `ReferenceOutOfScope` / `ReferenceWeakGrounding`
//! 5. copy detection     → `SimilarityBlocked(issues)`
//! 6. compliance         → `ComplianceBlocked(report)`

use crate::checks::{check_raw, check_schema, strip_inline_citations, RawCheck};
use crate::grounding::{check_grounding, GroundingFailure};
use crate::profile::ModeProfile;
use crate::similarity::check_copy;
use draftgate_core::{
    ComplianceReport, DraftError, GeneratedDraft, GenerationMode, GenerationRequest,
    ValidationIssue,
};
use draftgate_policy::{merge_reports, ComplianceScreener};
use serde_json::Value;

/// Verdict of the gate for one raw model output
#[derive(Debug, Clone, PartialEq)]
pub enum GateVerdict {
    Accepted(GeneratedDraft),
    SchemaInvalid(Vec<ValidationIssue>),
    ParseFailed(String),
    ModelEmpty,
    SimilarityBlocked(Vec<ValidationIssue>),
    ComplianceBlocked(ComplianceReport),
    ReferenceRequired,
    ReferenceOutOfScope(String),
    ReferenceWeakGrounding(f64),
}

impl GateVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, GateVerdict::Accepted(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            GateVerdict::Accepted(_) => "accepted",
            GateVerdict::SchemaInvalid(_) => "schema_invalid",
            GateVerdict::ParseFailed(_) => "parse_failed",
            GateVerdict::ModelEmpty => "model_empty",
            GateVerdict::SimilarityBlocked(_) => "similarity_blocked",
            GateVerdict::ComplianceBlocked(_) => "compliance_blocked",
            GateVerdict::ReferenceRequired => "reference_required",
            GateVerdict::ReferenceOutOfScope(_) => "reference_out_of_scope",
            GateVerdict::ReferenceWeakGrounding(_) => "reference_weak_grounding",
        }
    }

    pub fn into_result(self) -> Result<GeneratedDraft, DraftError> {
        match self {
            GateVerdict::Accepted(draft) => Ok(draft),
            GateVerdict::SchemaInvalid(issues) => Err(DraftError::SchemaInvalid { issues }),
            GateVerdict::ParseFailed(detail) => Err(DraftError::ParseFailed { detail }),
            GateVerdict::ModelEmpty => Err(DraftError::ModelEmpty),
            GateVerdict::SimilarityBlocked(issues) => Err(DraftError::SimilarityBlocked { issues }),
            GateVerdict::ComplianceBlocked(report) => Err(DraftError::ComplianceBlocked { report }),
            GateVerdict::ReferenceRequired => Err(DraftError::ReferenceRequired),
            GateVerdict::ReferenceOutOfScope(url) => Err(DraftError::ReferenceOutOfScope { url }),
            GateVerdict::ReferenceWeakGrounding(overlap) => {
                Err(DraftError::ReferenceWeakGrounding { overlap })
            }
        }
    }
}

/// Central quality filter between the model and the caller. Stateless per
/// request; safe to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ValidationGate {
    draft: ModeProfile,
    longform: ModeProfile,
    citation_pool: Vec<String>,
    screener: ComplianceScreener,
}

impl Default for ValidationGate {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ValidationGate {
    pub fn new(citation_pool: Vec<String>) -> Self {
        Self {
            draft: ModeProfile::draft(),
            longform: ModeProfile::interactive_longform(),
            citation_pool,
            screener: ComplianceScreener::default(),
        }
    }

    /// Replace the profile for the profile's own mode
    pub fn with_profile(mut self, profile: ModeProfile) -> Self {
        match profile.mode {
            GenerationMode::Draft => self.draft = profile,
            GenerationMode::InteractiveLongform => self.longform = profile,
        }
        self
    }

    pub fn with_screener(mut self, screener: ComplianceScreener) -> Self {
        self.screener = screener;
        self
    }

    pub fn profile(&self, mode: GenerationMode) -> &ModeProfile {
        match mode {
            GenerationMode::Draft => &self.draft,
            GenerationMode::InteractiveLongform => &self.longform,
        }
    }

    pub fn citation_pool(&self) -> &[String] {
        &self.citation_pool
    }

    pub fn screener(&self) -> &ComplianceScreener {
        &self.screener
    }

    /// Classify raw draft output for `request`.
    pub fn validate(&self, raw: &str, request: &GenerationRequest) -> GateVerdict {
        let verdict = self.run_checks(raw, request);
        tracing::debug!(
            mode = %request.mode,
            verdict = verdict.label(),
            "validation gate verdict"
        );
        verdict
    }

    fn run_checks(&self, raw: &str, request: &GenerationRequest) -> GateVerdict {
        let profile = self.profile(request.mode);

        let object = match check_raw(raw) {
            RawCheck::Empty => return GateVerdict::ModelEmpty,
            RawCheck::Malformed(detail) => return GateVerdict::ParseFailed(detail),
            RawCheck::Object(object) => object,
        };

        let parsed = match check_schema(&object, profile) {
            Ok(parsed) => parsed,
            Err(issues) => return GateVerdict::SchemaInvalid(issues),
        };

        let body = std::iter::once(parsed.content.as_str())
            .chain(parsed.sections.iter().map(|s| s.body.as_str()))
            .collect::<Vec<_>>()
            .join("\n");

        let grounding = check_grounding(
            &parsed.source_citation.url,
            &body,
            request.reference_article.as_ref(),
            &self.citation_pool,
            profile,
        );
        match grounding.reason {
            Some(GroundingFailure::ReferenceRequired) => return GateVerdict::ReferenceRequired,
            Some(GroundingFailure::OutOfScope) => {
                return GateVerdict::ReferenceOutOfScope(grounding.cited_url)
            }
            Some(GroundingFailure::WeakGrounding) => {
                return GateVerdict::ReferenceWeakGrounding(grounding.overlap.unwrap_or(0.0))
            }
            None => {}
        }

        if let Some(reference) = &request.reference_article {
            let issues = check_copy(&parsed.title, &body, reference, profile);
            if !issues.is_empty() {
                return GateVerdict::SimilarityBlocked(issues);
            }
        }

        let mut texts: Vec<&str> = vec![parsed.title.as_str(), parsed.content.as_str()];
        texts.extend(parsed.sections.iter().map(|s| s.heading.as_str()));
        texts.extend(parsed.sections.iter().map(|s| s.body.as_str()));
        let screened = self.screener.screen_all(&texts);
        let compliance = merge_reports(&parsed.compliance, &screened);
        if profile.compliance_gated && compliance.is_blocking() {
            return GateVerdict::ComplianceBlocked(compliance);
        }

        GateVerdict::Accepted(GeneratedDraft {
            title: parsed.title,
            content: parsed.content,
            sections: parsed.sections,
            compliance,
            source_citation: parsed.source_citation,
            media_slots: parsed.media_slots,
        })
    }

    /// Classify raw output of a paragraph regeneration: `{"paragraph": "..."}`.
    pub fn validate_paragraph(&self, raw: &str) -> Result<String, DraftError> {
        let object = match check_raw(raw) {
            RawCheck::Empty => return Err(DraftError::ModelEmpty),
            RawCheck::Malformed(detail) => return Err(DraftError::ParseFailed { detail }),
            RawCheck::Object(object) => object,
        };

        let paragraph = match object.get("paragraph") {
            Some(Value::String(text)) => strip_inline_citations(text),
            Some(_) => {
                return Err(DraftError::SchemaInvalid {
                    issues: vec![ValidationIssue::new(
                        crate::checks::ISSUE_INVALID_FIELD,
                        "paragraph must be a string",
                    )],
                })
            }
            None => {
                return Err(DraftError::SchemaInvalid {
                    issues: vec![ValidationIssue::new(
                        crate::checks::ISSUE_MISSING_FIELD,
                        "paragraph is required",
                    )],
                })
            }
        };
        if paragraph.is_empty() {
            return Err(DraftError::ModelEmpty);
        }

        let report = self.screener.screen(&paragraph);
        if report.is_blocking() {
            return Err(DraftError::ComplianceBlocked { report });
        }
        Ok(paragraph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftgate_core::{ReferenceArticle, RiskLevel};
    use serde_json::json;

    fn reference() -> ReferenceArticle {
        ReferenceArticle {
            title: "반도체 수출 석 달 만에 반등".to_string(),
            summary: "메모리 가격 회복에 힘입어 반도체 수출이 전년 같은 달보다 크게 늘었으며 \
                      정부는 하반기에도 증가세가 이어질 것으로 내다봤다"
                .to_string(),
            url: "https://news.example.com/economy/123".to_string(),
            source: "Example".to_string(),
        }
    }

    fn request(mode: GenerationMode) -> GenerationRequest {
        GenerationRequest::new("반도체", mode).with_reference(reference())
    }

    fn draft_output() -> serde_json::Value {
        json!({
            "title": "반도체가 다시 끌어올린 수출",
            "content": "반도체 수출이 석 달 만에 반등했다[1]. 메모리 가격 회복이 배경이다.",
            "sections": [
                { "heading": "배경", "body": "메모리 가격이 회복세다." },
                { "heading": "쟁점", "body": "하반기 흐름이 관건이다." },
                { "heading": "전망", "body": "증가세 지속 여부를 지켜봐야 한다." }
            ],
            "compliance": { "riskLevel": "low", "flags": [] },
            "sourceCitation": { "url": "https://news.example.com/economy/123", "source": "Example" },
            "mediaSlots": []
        })
    }

    #[test]
    fn test_accepts_grounded_draft() {
        let gate = ValidationGate::default();
        let verdict = gate.validate(&draft_output().to_string(), &request(GenerationMode::Draft));
        let draft = verdict.into_result().unwrap();
        assert!(!draft.content.contains("[1]"));
        assert_eq!(draft.compliance.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_empty_before_parse() {
        let gate = ValidationGate::default();
        assert_eq!(gate.validate("  ", &request(GenerationMode::Draft)), GateVerdict::ModelEmpty);
        assert!(matches!(
            gate.validate("{\"title\":", &request(GenerationMode::Draft)),
            GateVerdict::ParseFailed(_)
        ));
    }

    #[test]
    fn test_schema_before_grounding() {
        let gate = ValidationGate::default();
        let mut output = draft_output();
        output["sourceCitation"] = json!({ "url": "https://elsewhere.example.org" });
        let verdict = gate.validate(&output.to_string(), &request(GenerationMode::Draft));
        match verdict {
            GateVerdict::SchemaInvalid(issues) => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].message, "sourceCitation.source is required");
            }
            other => panic!("expected schema invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_reference_required_without_reference_or_pool() {
        let gate = ValidationGate::default();
        let verdict = gate.validate(
            &draft_output().to_string(),
            &GenerationRequest::new("반도체", GenerationMode::Draft),
        );
        assert_eq!(verdict, GateVerdict::ReferenceRequired);
    }

    #[test]
    fn test_pool_allows_citation_without_reference() {
        let gate = ValidationGate::new(vec!["https://news.example.com/economy/123".to_string()]);
        let verdict = gate.validate(
            &draft_output().to_string(),
            &GenerationRequest::new("반도체", GenerationMode::Draft),
        );
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_out_of_scope_before_similarity() {
        let gate = ValidationGate::default();
        let mut output = draft_output();
        output["title"] = json!("반도체 수출 석 달 만에 반등");
        output["sourceCitation"]["url"] = json!("https://elsewhere.example.org/x");
        let verdict = gate.validate(&output.to_string(), &request(GenerationMode::Draft));
        assert_eq!(
            verdict,
            GateVerdict::ReferenceOutOfScope("https://elsewhere.example.org/x".to_string())
        );
    }

    #[test]
    fn test_title_copy_blocked() {
        let gate = ValidationGate::default();
        let mut output = draft_output();
        output["title"] = json!("반도체 수출, 석 달 만에 반등");
        let verdict = gate.validate(&output.to_string(), &request(GenerationMode::Draft));
        match verdict {
            GateVerdict::SimilarityBlocked(issues) => {
                assert_eq!(issues[0].code, "AI_NEWS_TITLE_COPY_DETECTED")
            }
            other => panic!("expected similarity block, got {:?}", other),
        }
    }

    #[test]
    fn test_similarity_before_compliance() {
        let gate = ValidationGate::default();
        let mut output = draft_output();
        output["content"] = json!(format!("{} 원금 보장", reference().summary));
        let verdict = gate.validate(&output.to_string(), &request(GenerationMode::Draft));
        assert!(matches!(verdict, GateVerdict::SimilarityBlocked(_)));
    }

    #[test]
    fn test_compliance_blocked() {
        let gate = ValidationGate::default();
        let mut output = draft_output();
        output["content"] = json!(
            "반도체 수출이 석 달 만에 반등했다. 메모리 가격 회복이 배경이다. 원금 보장 상품도 나왔다."
        );
        let verdict = gate.validate(&output.to_string(), &request(GenerationMode::Draft));
        match verdict {
            GateVerdict::ComplianceBlocked(report) => {
                assert_eq!(report.risk_level, RiskLevel::Medium);
                assert!(!report.flags.is_empty());
            }
            other => panic!("expected compliance block, got {:?}", other),
        }
    }

    #[test]
    fn test_model_reported_risk_is_honoured() {
        let gate = ValidationGate::default();
        let mut output = draft_output();
        output["compliance"] = json!({ "riskLevel": "high", "flags": ["PERSONAL_DATA"] });
        let verdict = gate.validate(&output.to_string(), &request(GenerationMode::Draft));
        assert!(matches!(verdict, GateVerdict::ComplianceBlocked(_)));
    }

    #[test]
    fn test_longform_section_minimum() {
        let gate = ValidationGate::default();
        let mut output = draft_output();
        output["sections"] = json!([{ "heading": "하나", "body": "본문" }]);
        assert!(gate
            .validate(&output.to_string(), &request(GenerationMode::Draft))
            .is_accepted());
        assert!(matches!(
            gate.validate(&output.to_string(), &request(GenerationMode::InteractiveLongform)),
            GateVerdict::SchemaInvalid(_)
        ));
    }

    #[test]
    fn test_paragraph_validation() {
        let gate = ValidationGate::default();
        assert_eq!(
            gate.validate_paragraph(r#"{"paragraph": "새 문단입니다 [2]"}"#).unwrap(),
            "새 문단입니다"
        );
        assert!(matches!(
            gate.validate_paragraph(""),
            Err(DraftError::ModelEmpty)
        ));
        assert!(matches!(
            gate.validate_paragraph(r#"{"text": "x"}"#),
            Err(DraftError::SchemaInvalid { .. })
        ));
        assert!(matches!(
            gate.validate_paragraph(r#"{"paragraph": "무조건 오른다"}"#),
            Err(DraftError::ComplianceBlocked { .. })
        ));
    }
}
