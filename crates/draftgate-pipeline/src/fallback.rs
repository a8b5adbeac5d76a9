//! Deterministic fallbacks and chat intent rules
//!
//! A fallback draft is assembled from the reference article alone when the
//! model keeps failing transiently. It is still compliance-screened.

use draftgate_core::{
    ChatIntent, DraftSection, FallbackReason, GeneratedDraft, GenerationRequest, SourceCitation,
};
use draftgate_policy::ComplianceScreener;
use draftgate_quality::strip_inline_citations;
use once_cell::sync::Lazy;
use regex::Regex;

/// Build a fallback draft. `None` without a reference or when the assembled
/// text itself would be compliance-blocked.
pub fn fallback_draft(
    request: &GenerationRequest,
    screener: &ComplianceScreener,
) -> Option<GeneratedDraft> {
    let reference = request.reference_article.as_ref()?;
    let keyword = request.keyword.trim();
    // Reference text may carry its own citation markers.
    let cleaned = strip_inline_citations(&reference.summary);
    let summary = if cleaned.trim().is_empty() {
        strip_inline_citations(&reference.title)
    } else {
        cleaned
    };
    let summary = summary.trim();
    let source = if reference.source.trim().is_empty() {
        "reference".to_string()
    } else {
        reference.source.trim().to_string()
    };

    let title = format!("{} 관련 주요 내용 정리", keyword);
    let content = format!("{} 관련 보도 내용을 정리했습니다. {}", keyword, summary);
    let sections = vec![
        DraftSection {
            heading: "요약".to_string(),
            body: summary.to_string(),
        },
        DraftSection {
            heading: "원문 정보".to_string(),
            body: format!("{} 보도 '{}'를 바탕으로 정리한 임시 초안입니다.", source, reference.title.trim()),
        },
        DraftSection {
            heading: "후속 확인".to_string(),
            body: "세부 수치와 발언은 원문 확인 후 보완이 필요합니다.".to_string(),
        },
    ];

    let mut texts = vec![title.as_str(), content.as_str()];
    texts.extend(sections.iter().map(|s| s.body.as_str()));
    let compliance = screener.screen_all(&texts);
    if compliance.is_blocking() {
        return None;
    }

    Some(GeneratedDraft {
        title,
        content,
        sections,
        compliance,
        source_citation: SourceCitation {
            url: reference.url.clone(),
            source,
        },
        media_slots: Vec::new(),
    })
}

pub fn fallback_reason(err: &draftgate_core::DraftError) -> Option<FallbackReason> {
    match err {
        draftgate_core::DraftError::ParseFailed { .. } => Some(FallbackReason::ParseFailed),
        draftgate_core::DraftError::ModelEmpty => Some(FallbackReason::ModelEmpty),
        _ => None,
    }
}

// === Chat ===

static TITLE_INTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)제목|헤드라인|\b(?:title|headline)s?\b").unwrap());

static COMPLIANCE_INTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)규정|위반|법적|컴플라이언스|심의|광고성|\b(?:compliance|legal|regulation)\b").unwrap()
});

static FACT_CHECK_INTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)사실\s*확인|팩트|검증|출처|\b(?:fact|verify|source)\b").unwrap());

static DRAFT_INTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)초안|기사.{0,6}(?:써|작성)|작성해|\b(?:draft|write)\b").unwrap());

pub fn classify_intent(message: &str) -> ChatIntent {
    if TITLE_INTENT.is_match(message) {
        ChatIntent::TitleSuggestion
    } else if COMPLIANCE_INTENT.is_match(message) {
        ChatIntent::ComplianceQuestion
    } else if FACT_CHECK_INTENT.is_match(message) {
        ChatIntent::FactCheck
    } else if DRAFT_INTENT.is_match(message) {
        ChatIntent::DraftRequest
    } else {
        ChatIntent::General
    }
}

pub fn recommendation(intent: ChatIntent) -> &'static str {
    match intent {
        ChatIntent::DraftRequest => "generate_draft",
        ChatIntent::TitleSuggestion => "regenerate_title",
        ChatIntent::ComplianceQuestion => "run_compliance_check",
        ChatIntent::FactCheck => "verify_with_reference",
        ChatIntent::General => "continue_editing",
    }
}

/// Canned reply when the model is unavailable
pub fn fallback_chat_text(intent: ChatIntent) -> &'static str {
    match intent {
        ChatIntent::DraftRequest => {
            "지금은 AI 응답을 받을 수 없습니다. 키워드와 참고 기사를 지정해 초안 생성을 다시 시도해 주세요."
        }
        ChatIntent::TitleSuggestion => {
            "지금은 AI 응답을 받을 수 없습니다. 제목은 핵심 사실 하나를 담아 간결하게 작성해 보세요."
        }
        ChatIntent::ComplianceQuestion => {
            "지금은 AI 응답을 받을 수 없습니다. 본문을 컴플라이언스 검사로 먼저 점검해 주세요."
        }
        ChatIntent::FactCheck => {
            "지금은 AI 응답을 받을 수 없습니다. 수치와 인용은 원문 출처에서 직접 확인해 주세요."
        }
        ChatIntent::General => "지금은 AI 응답을 받을 수 없습니다. 잠시 후 다시 시도해 주세요.",
    }
}
