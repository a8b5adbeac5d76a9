//! Scenario gateway: canned model behaviour for drills and tests
//!
//! Only wired in when the server runs with test mode enabled. Each instance
//! serves a single request so attempt counting stays request-local.
use crate::data_model::PipelineMode;
use crate::gateway::{GatewayError, ModelCall, ModelGateway};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Success,
    SchemaBlock,
    ParseFailure,
    /// Malformed output on the first attempt, valid output afterwards.
    ParseFailureOnce,
    ModelEmpty,
    ModelTimeout,
    ModelError,
    KeyMissing,
    TitleCopy,
    ContentCopy,
    ComplianceRisk,
    ReferenceOutOfScope,
    WeakGrounding,
}

impl Scenario {
    pub const ALL: [Scenario; 13] = [
        Scenario::Success,
        Scenario::SchemaBlock,
        Scenario::ParseFailure,
        Scenario::ParseFailureOnce,
        Scenario::ModelEmpty,
        Scenario::ModelTimeout,
        Scenario::ModelError,
        Scenario::KeyMissing,
        Scenario::TitleCopy,
        Scenario::ContentCopy,
        Scenario::ComplianceRisk,
        Scenario::ReferenceOutOfScope,
        Scenario::WeakGrounding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Success => "success",
            Scenario::SchemaBlock => "schema-block",
            Scenario::ParseFailure => "parse-failure",
            Scenario::ParseFailureOnce => "parse-failure-once",
            Scenario::ModelEmpty => "model-empty",
            Scenario::ModelTimeout => "model-timeout",
            Scenario::ModelError => "model-error",
            Scenario::KeyMissing => "key-missing",
            Scenario::TitleCopy => "title-copy",
            Scenario::ContentCopy => "content-copy",
            Scenario::ComplianceRisk => "compliance-risk",
            Scenario::ReferenceOutOfScope => "reference-out-of-scope",
            Scenario::WeakGrounding => "weak-grounding",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let wanted = value.trim().to_lowercase().replace('_', "-");
        Self::ALL.iter().copied().find(|s| s.as_str() == wanted)
    }
}

pub struct ScenarioGateway {
    scenario: Scenario,
    attempts: AtomicUsize,
    name: String,
}

impl ScenarioGateway {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            attempts: AtomicUsize::new(0),
            name: format!("scenario:{}", scenario.as_str()),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn respond(&self, call: &ModelCall, attempt: usize) -> Result<String, GatewayError> {
        let text = match (self.scenario, call.mode) {
            (Scenario::KeyMissing, _) => return Err(GatewayError::KeyMissing),
            (Scenario::ModelError, _) => {
                return Err(GatewayError::Upstream {
                    status: 500,
                    body: "synthetic upstream failure".to_string(),
                })
            }
            (Scenario::ModelEmpty, _) => String::new(),
            (Scenario::ParseFailure, _) => MALFORMED.to_string(),
            (Scenario::ParseFailureOnce, _) if attempt == 0 => MALFORMED.to_string(),
            (_, PipelineMode::Chat) => chat_text(call),
            (Scenario::SchemaBlock, PipelineMode::ParagraphRegeneration) => {
                json!({ "text": "paragraph key is missing" }).to_string()
            }
            (Scenario::ComplianceRisk, PipelineMode::ParagraphRegeneration) => json!({
                "paragraph": format!("{}에 투자하면 원금 보장은 물론 무조건 수익이 납니다.", call.keyword)
            })
            .to_string(),
            (_, PipelineMode::ParagraphRegeneration) => json!({
                "paragraph": format!(
                    "{} 관련 흐름을 다시 정리하면, 최근 지표는 완만한 회복세를 보이고 있습니다.",
                    call.keyword
                )
            })
            .to_string(),
            (scenario, _) => draft_json(scenario, call).to_string(),
        };
        Ok(text)
    }
}

#[async_trait]
impl ModelGateway for ScenarioGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, call: &ModelCall) -> Result<String, GatewayError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.scenario == Scenario::ModelTimeout {
            // Outlives every allowed timeout; the caller's timeout cancels it.
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.respond(call, attempt)
    }
}

const MALFORMED: &str = "```json\n{\"title\": \"unterminated\", \"content\": ";

fn chat_text(call: &ModelCall) -> String {
    format!(
        "'{}'에 대해 정리하면, 핵심 쟁점과 확인된 사실을 먼저 구분해 보시길 권합니다.",
        call.keyword
    )
}

fn leading_words(text: &str, fraction_denominator: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let take = (words.len() / fraction_denominator).max(1).min(words.len());
    words[..take].join(" ")
}

fn draft_json(scenario: Scenario, call: &ModelCall) -> Value {
    let keyword = call.keyword.as_str();
    let (ref_title, ref_summary) = call
        .reference
        .as_ref()
        .map(|r| (r.title.clone(), r.summary.clone()))
        .unwrap_or_default();

    let (citation_url, citation_source) = match (&call.reference, call.citation_pool.first()) {
        (Some(r), _) => (
            r.url.clone(),
            if r.source.trim().is_empty() {
                "reference".to_string()
            } else {
                r.source.clone()
            },
        ),
        (None, Some(url)) => (url.clone(), "citation-pool".to_string()),
        (None, None) => (
            "https://news.example.com/uncited".to_string(),
            "unknown".to_string(),
        ),
    };

    let grounded = format!(
        "{keyword} 이슈를 짚어봅니다. {ref_title} 관련 흐름을 보면 {} 등의 변화가 이어지고 있습니다 [1]. \
         전문가들은 향후 추이를 차분히 지켜봐야 한다고 말합니다.",
        leading_words(&ref_summary, 3)
    );

    let mut title = format!("{keyword}, 지금 무엇이 달라졌나");
    let mut content = grounded;
    let mut url = citation_url;

    match scenario {
        Scenario::TitleCopy => title = ref_title.clone(),
        Scenario::ContentCopy => content = format!("{ref_summary} {ref_summary}"),
        Scenario::ComplianceRisk => {
            content.push_str(" 지금 가입하면 원금 보장에 무조건 수익을 약속합니다.")
        }
        Scenario::ReferenceOutOfScope => url = "https://unrelated.example.org/story".to_string(),
        Scenario::WeakGrounding => {
            content = "주말 동안 전국에 비 소식이 있으며 기온은 평년보다 낮겠습니다. \
                       외출 시 우산을 챙기시기 바랍니다."
                .to_string()
        }
        _ => {}
    }

    let sections = json!([
        { "heading": "배경", "body": format!("{keyword}을(를) 둘러싼 최근 상황을 정리합니다.") },
        { "heading": "쟁점", "body": "시장과 정책 당국의 시각이 엇갈리는 지점을 살펴봅니다." },
        { "heading": "전망", "body": "단기 변동성보다 중장기 흐름에 주목할 필요가 있습니다." }
    ]);
    let media_slots = json!([
        { "id": "slot-1", "kind": "image", "caption": format!("{keyword} 관련 현장 사진"), "anchor": 0 },
        { "id": "slot-2", "kind": "chart", "caption": "최근 지표 추이", "anchor": 1 }
    ]);

    if scenario == Scenario::SchemaBlock {
        return json!({
            "title": title,
            "sections": "not-an-array",
            "sourceCitation": { "source": citation_source }
        });
    }

    json!({
        "title": title,
        "content": content,
        "sections": sections,
        "compliance": { "riskLevel": "low", "flags": [] },
        "sourceCitation": { "url": url, "source": citation_source },
        "mediaSlots": media_slots
    })
}
