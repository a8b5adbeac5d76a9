//! Bias / neutrality advisory for conversational input
//!
//! Advisory only: a match attaches a warning and a neutral rephrasing to the
//! chat reply, it never blocks.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const GROUPS_KO: &str = "여자|여성|남자|남성|노인|청년|외국인|이민자|장애인|기자|정치인|공무원|[가-힣]{1,4}충";
const GROUPS_EN: &str = "women|men|immigrants|foreigners|old people|young people|millennials|boomers|journalists|politicians";

static ABSOLUTE_BEFORE_GROUP_KO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?:모든|전부|죄다)\s*(?P<group>{GROUPS_KO})")).unwrap()
});

static GROUP_THEN_ABSOLUTE_KO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?P<group>{GROUPS_KO})(?:들)?(?:은|는|이|가)\s*(?:다|전부|모두|항상|원래|하나같이)\b"
    ))
    .unwrap()
});

static GROUP_ABSOLUTE_EN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:(?:all|every)\s+)?(?P<group>{GROUPS_EN})\s+(?:are\s+all|always|never|are\s+always)\b|\b(?:all|every)\s+(?P<group2>{GROUPS_EN})\s+(?:are|is)\b"
    ))
    .unwrap()
});

/// Advice attached to a chat reply when group-absolute language is found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiasAdvice {
    pub group: String,
    pub matched: String,
    pub warning: String,
    pub neutral_prompt: String,
}

#[derive(Debug, Clone, Default)]
pub struct BiasDetector;

impl BiasDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, text: &str) -> Option<BiasAdvice> {
        let (group, matched, korean) = [&*ABSOLUTE_BEFORE_GROUP_KO, &*GROUP_THEN_ABSOLUTE_KO]
            .iter()
            .find_map(|re| {
                let caps = re.captures(text)?;
                Some((
                    caps.name("group")?.as_str().to_string(),
                    caps.get(0)?.as_str().to_string(),
                    true,
                ))
            })
            .or_else(|| {
                let caps = GROUP_ABSOLUTE_EN.captures(text)?;
                let group = caps.name("group").or_else(|| caps.name("group2"))?;
                Some((
                    group.as_str().to_string(),
                    caps.get(0)?.as_str().to_string(),
                    false,
                ))
            })?;

        let (warning, neutral_prompt) = if korean {
            (
                format!(
                    "'{}' 표현은 특정 집단 전체를 일반화할 수 있습니다.",
                    matched.trim()
                ),
                format!(
                    "{}에 대해 개인차와 근거 자료를 함께 고려해 균형 있게 설명해 주세요.",
                    group
                ),
            )
        } else {
            (
                format!(
                    "'{}' generalizes about an entire group.",
                    matched.trim()
                ),
                format!(
                    "What does the evidence say about {}, including the variation between individuals?",
                    group
                ),
            )
        };

        Some(BiasAdvice {
            group,
            matched: matched.trim().to_string(),
            warning,
            neutral_prompt,
        })
    }
}
