//! Structural checks: emptiness, parseability and schema conformance
//!
//! Also removes inline citation markers; a citation lives only in
//! `sourceCitation`, never in body text.

use crate::profile::ModeProfile;
use draftgate_core::{
    ComplianceFlag, ComplianceReport, DraftSection, MediaSlot, RiskLevel, SourceCitation,
    ValidationIssue,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

pub const ISSUE_MISSING_FIELD: &str = "MISSING_FIELD";
pub const ISSUE_INVALID_FIELD: &str = "INVALID_FIELD";
pub const ISSUE_SECTION_COUNT: &str = "SECTION_COUNT";

/// Raw output shorter than this (after trimming fences) counts as empty
const MIN_RAW_CHARS: usize = 2;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_-]*\s*|\s*```$").unwrap());

static INLINE_CITATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*\[\^?\s*\d{1,3}\s*\]|\s*\[(?:출처|source|citation|ref)[^\]]*\]|\s*\((?:출처|source)\s*[:：][^)]*\)",
    )
    .unwrap()
});

static CITATION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*(?:출처|source|sources|참고)\s*[:：].*$").unwrap());

static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());

static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Outcome of the first two checks
#[derive(Debug, Clone, PartialEq)]
pub enum RawCheck {
    Empty,
    Malformed(String),
    Object(Map<String, Value>),
}

/// Remove markdown fences and any prose around the outermost JSON object.
pub fn unwrap_payload(raw: &str) -> String {
    let trimmed = raw.trim();
    let unfenced = CODE_FENCE.replace_all(trimmed, "");
    let unfenced = unfenced.trim();
    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => unfenced[start..=end].to_string(),
        _ => unfenced.to_string(),
    }
}

/// Steps 1-2: emptiness, then parseability.
pub fn check_raw(raw: &str) -> RawCheck {
    let payload = unwrap_payload(raw);
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.chars().count() < MIN_RAW_CHARS || matches!(compact.as_str(), "null" | "{}" | "\"\"" | "[]") {
        return RawCheck::Empty;
    }

    match serde_json::from_str::<Value>(&payload) {
        Ok(Value::Object(map)) => RawCheck::Object(map),
        Ok(other) => RawCheck::Malformed(format!("expected a JSON object, got {}", kind_of(&other))),
        Err(e) => RawCheck::Malformed(e.to_string()),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strip inline citation markers and source lines from body text.
pub fn strip_inline_citations(text: &str) -> String {
    let without_lines = CITATION_LINE.replace_all(text, "");
    let without_markers = INLINE_CITATION.replace_all(&without_lines, "");
    let spaced = MULTI_SPACE.replace_all(&without_markers, " ");
    BLANK_LINES.replace_all(&spaced, "\n\n").trim().to_string()
}

/// True when `text` still carries an inline citation marker.
pub fn has_inline_citation(text: &str) -> bool {
    INLINE_CITATION.is_match(text) || CITATION_LINE.is_match(text)
}

/// Schema-conformant model output, before grounding and shaping
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDraft {
    pub title: String,
    pub content: String,
    pub sections: Vec<DraftSection>,
    pub compliance: ComplianceReport,
    pub source_citation: SourceCitation,
    pub media_slots: Vec<MediaSlot>,
}

/// Step 3: schema conformance. One issue per missing or invalid field.
pub fn check_schema(
    object: &Map<String, Value>,
    profile: &ModeProfile,
) -> Result<ParsedDraft, Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    let title = required_text(object, "title", &mut issues);
    let content = required_text(object, "content", &mut issues).map(|c| strip_inline_citations(&c));
    if content.as_deref() == Some("") {
        issues.push(ValidationIssue::new(
            ISSUE_INVALID_FIELD,
            "content is empty once inline citations are removed",
        ));
    }
    let sections = parse_sections(object.get("sections"), profile, &mut issues);
    let compliance = parse_compliance(object.get("compliance"), &mut issues);
    let source_citation = parse_citation(object.get("sourceCitation"), &mut issues);
    let media_slots = parse_media_slots(object.get("mediaSlots"), &mut issues);

    match (title, content, sections, compliance, source_citation, media_slots) {
        (Some(title), Some(content), Some(sections), Some(compliance), Some(source_citation), Some(media_slots))
            if issues.is_empty() =>
        {
            Ok(ParsedDraft {
                title,
                content,
                sections,
                compliance,
                source_citation,
                media_slots,
            })
        }
        _ => Err(issues),
    }
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn required_text(
    object: &Map<String, Value>,
    field: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<String> {
    match object.get(field) {
        None | Some(Value::Null) => {
            issues.push(ValidationIssue::new(
                ISSUE_MISSING_FIELD,
                format!("{} is required", field),
            ));
            None
        }
        Some(value) => {
            let text = non_blank(Some(value));
            if text.is_none() {
                issues.push(ValidationIssue::new(
                    ISSUE_INVALID_FIELD,
                    format!("{} must be a non-empty string", field),
                ));
            }
            text
        }
    }
}

fn parse_sections(
    value: Option<&Value>,
    profile: &ModeProfile,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Vec<DraftSection>> {
    let items = match value {
        None | Some(Value::Null) => {
            issues.push(ValidationIssue::new(ISSUE_MISSING_FIELD, "sections is required"));
            return None;
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            issues.push(ValidationIssue::new(
                ISSUE_INVALID_FIELD,
                "sections must be an array",
            ));
            return None;
        }
    };

    let mut sections = Vec::with_capacity(items.len());
    let mut valid = true;
    for (i, item) in items.iter().enumerate() {
        let section = match item {
            Value::String(body) if !body.trim().is_empty() => Some(DraftSection {
                heading: String::new(),
                body: strip_inline_citations(body),
            }),
            Value::Object(map) => non_blank(map.get("body")).map(|body| DraftSection {
                heading: non_blank(map.get("heading")).unwrap_or_default(),
                body: strip_inline_citations(&body),
            }),
            _ => None,
        };
        match section {
            Some(s) if !s.body.is_empty() => sections.push(s),
            _ => {
                valid = false;
                issues.push(ValidationIssue::new(
                    ISSUE_INVALID_FIELD,
                    format!("sections[{}] must have a non-empty body", i),
                ));
            }
        }
    }

    if valid && sections.len() < profile.min_sections {
        issues.push(ValidationIssue::new(
            ISSUE_SECTION_COUNT,
            format!(
                "{} mode needs at least {} section(s), got {}",
                profile.mode,
                profile.min_sections,
                sections.len()
            ),
        ));
        valid = false;
    }

    valid.then_some(sections)
}

fn parse_compliance(
    value: Option<&Value>,
    issues: &mut Vec<ValidationIssue>,
) -> Option<ComplianceReport> {
    let map = match value {
        None | Some(Value::Null) => {
            issues.push(ValidationIssue::new(ISSUE_MISSING_FIELD, "compliance is required"));
            return None;
        }
        Some(Value::Object(map)) => map,
        Some(_) => {
            issues.push(ValidationIssue::new(
                ISSUE_INVALID_FIELD,
                "compliance must be an object",
            ));
            return None;
        }
    };

    let risk_level = match map.get("riskLevel").and_then(Value::as_str).and_then(RiskLevel::parse) {
        Some(level) => level,
        None => {
            issues.push(ValidationIssue::new(
                ISSUE_INVALID_FIELD,
                "compliance.riskLevel must be one of low, medium, high",
            ));
            return None;
        }
    };

    let flags = match map.get("flags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(code) => Some(ComplianceFlag {
                    code: code.clone(),
                    level: risk_level,
                    matched: String::new(),
                    message: code.clone(),
                }),
                Value::Object(_) => serde_json::from_value(item.clone()).ok(),
                _ => None,
            })
            .collect(),
        Some(_) => {
            issues.push(ValidationIssue::new(
                ISSUE_INVALID_FIELD,
                "compliance.flags must be an array",
            ));
            return None;
        }
    };

    Some(ComplianceReport { risk_level, flags })
}

fn parse_citation(
    value: Option<&Value>,
    issues: &mut Vec<ValidationIssue>,
) -> Option<SourceCitation> {
    let map = match value {
        Some(Value::Object(map)) => map,
        None | Some(Value::Null) => {
            issues.push(ValidationIssue::new(
                ISSUE_MISSING_FIELD,
                "sourceCitation.url is required",
            ));
            issues.push(ValidationIssue::new(
                ISSUE_MISSING_FIELD,
                "sourceCitation.source is required",
            ));
            return None;
        }
        Some(_) => {
            issues.push(ValidationIssue::new(
                ISSUE_INVALID_FIELD,
                "sourceCitation must be an object",
            ));
            return None;
        }
    };

    let url = non_blank(map.get("url"));
    let source = non_blank(map.get("source"));
    if url.is_none() {
        issues.push(ValidationIssue::new(
            ISSUE_MISSING_FIELD,
            "sourceCitation.url is required",
        ));
    }
    if source.is_none() {
        issues.push(ValidationIssue::new(
            ISSUE_MISSING_FIELD,
            "sourceCitation.source is required",
        ));
    }
    Some(SourceCitation {
        url: url?,
        source: source?,
    })
}

fn parse_media_slots(
    value: Option<&Value>,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Vec<MediaSlot>> {
    let items = match value {
        None | Some(Value::Null) => return Some(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            issues.push(ValidationIssue::new(
                ISSUE_INVALID_FIELD,
                "mediaSlots must be an array",
            ));
            return None;
        }
    };

    let slots = items
        .iter()
        .filter_map(Value::as_object)
        .enumerate()
        .map(|(i, map)| MediaSlot {
            id: non_blank(map.get("id")).unwrap_or_else(|| format!("slot-{}", i + 1)),
            kind: non_blank(map.get("kind")).unwrap_or_else(|| "image".to_string()),
            caption: non_blank(map.get("caption")).unwrap_or_default(),
            anchor: map
                .get("anchor")
                .and_then(Value::as_u64)
                .map(|a| a as usize)
                .unwrap_or(i),
        })
        .collect();
    Some(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn valid() -> Value {
        json!({
            "title": "수출 반등의 의미",
            "content": "수출이 석 달 만에 늘었다 [1]. 반도체가 이끌었다.",
            "sections": [{ "heading": "배경", "body": "수출 지표" }, "전망 본문"],
            "compliance": { "riskLevel": "low", "flags": [] },
            "sourceCitation": { "url": "https://news.example.com/a/1", "source": "Example" },
            "mediaSlots": [{ "kind": "chart" }]
        })
    }

    #[test]
    fn test_empty_outputs() {
        assert_eq!(check_raw(""), RawCheck::Empty);
        assert_eq!(check_raw("   \n"), RawCheck::Empty);
        assert_eq!(check_raw("```json\n{}\n```"), RawCheck::Empty);
        assert_eq!(check_raw("null"), RawCheck::Empty);
    }

    #[test]
    fn test_malformed_outputs() {
        assert!(matches!(check_raw("{\"title\": "), RawCheck::Malformed(_)));
        assert!(matches!(check_raw("just prose"), RawCheck::Malformed(_)));
        assert!(matches!(check_raw("[1, 2]"), RawCheck::Malformed(_)));
    }

    #[test]
    fn test_fenced_object_parses() {
        let raw = "Here you go:\n```json\n{\"title\": \"t\"}\n```";
        assert!(matches!(check_raw(raw), RawCheck::Object(_)));
    }

    #[test]
    fn test_valid_schema_strips_citations() {
        let parsed = check_schema(&object(valid()), &ModeProfile::draft()).unwrap();
        assert!(!has_inline_citation(&parsed.content));
        assert_eq!(parsed.sections.len(), 2);
        assert_eq!(parsed.media_slots[0].id, "slot-1");
        assert_eq!(parsed.media_slots[0].kind, "chart");
    }

    #[test]
    fn test_missing_fields_yield_one_issue_each() {
        let issues = check_schema(&object(json!({ "title": "only title" })), &ModeProfile::draft())
            .unwrap_err();
        let messages: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();
        assert!(messages.contains(&"content is required"));
        assert!(messages.contains(&"sections is required"));
        assert!(messages.contains(&"compliance is required"));
        assert!(messages.contains(&"sourceCitation.url is required"));
        assert!(messages.contains(&"sourceCitation.source is required"));
        assert_eq!(issues.len(), 5);
    }

    #[test]
    fn test_citation_missing_url_only() {
        let mut value = valid();
        value["sourceCitation"] = json!({ "source": "Example" });
        let issues = check_schema(&object(value), &ModeProfile::draft()).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "sourceCitation.url is required");
    }

    #[test]
    fn test_longform_needs_three_sections() {
        let issues =
            check_schema(&object(valid()), &ModeProfile::interactive_longform()).unwrap_err();
        assert_eq!(issues[0].code, ISSUE_SECTION_COUNT);
    }

    #[test]
    fn test_invalid_risk_level() {
        let mut value = valid();
        value["compliance"] = json!({ "riskLevel": "severe" });
        let issues = check_schema(&object(value), &ModeProfile::draft()).unwrap_err();
        assert!(issues[0].message.contains("riskLevel"));
    }

    #[test]
    fn test_strip_inline_citations() {
        let text = "금리가 동결됐다[1]. 시장은 안도했다 (출처: 연합뉴스).\n출처: https://x.test\n끝[source: A]";
        let stripped = strip_inline_citations(text);
        assert_eq!(stripped, "금리가 동결됐다. 시장은 안도했다.\n\n끝");
        assert!(!has_inline_citation(&stripped));
    }
}
