//! Reference grounding: cited URL scope and textual overlap

use crate::profile::ModeProfile;
use crate::similarity::{char_ngrams, containment, normalize};
use draftgate_core::{DraftError, ReferenceArticle};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

/// Why grounding failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundingFailure {
    ReferenceRequired,
    OutOfScope,
    WeakGrounding,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceGroundingResult {
    pub passed: bool,
    pub reason: Option<GroundingFailure>,
    /// Share of reference bigrams present in the generated text, when measured
    pub overlap: Option<f64>,
    pub cited_url: String,
}

impl ReferenceGroundingResult {
    fn pass(cited_url: &str, overlap: Option<f64>) -> Self {
        Self {
            passed: true,
            reason: None,
            overlap,
            cited_url: cited_url.to_string(),
        }
    }

    fn fail(cited_url: &str, reason: GroundingFailure, overlap: Option<f64>) -> Self {
        Self {
            passed: false,
            reason: Some(reason),
            overlap,
            cited_url: cited_url.to_string(),
        }
    }

    pub fn to_error(&self) -> Option<DraftError> {
        match self.reason? {
            GroundingFailure::ReferenceRequired => Some(DraftError::ReferenceRequired),
            GroundingFailure::OutOfScope => Some(DraftError::ReferenceOutOfScope {
                url: self.cited_url.clone(),
            }),
            GroundingFailure::WeakGrounding => Some(DraftError::ReferenceWeakGrounding {
                overlap: self.overlap.unwrap_or(0.0),
            }),
        }
    }
}

/// Canonical comparison key: scheme, `www.`, fragment, tracking params and
/// trailing slash are ignored.
pub fn canonical_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(url) = Url::parse(trimmed) else {
        return trimmed.trim_end_matches('/').to_lowercase();
    };

    let host = url
        .host_str()
        .map(|h| h.trim_start_matches("www.").to_lowercase())
        .unwrap_or_default();
    let path = url.path().trim_end_matches('/');
    let query: Vec<String> = url
        .query_pairs()
        .filter(|(k, _)| !k.starts_with("utm_"))
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    let mut key = format!("{}{}", host, path);
    if let Some(port) = url.port() {
        key = format!("{}:{}{}", host, port, path);
    }
    if !query.is_empty() {
        key.push('?');
        key.push_str(&query.join("&"));
    }
    key
}

/// Step 4: the cited URL must come from the offered reference set, and the
/// text must overlap the reference.
pub fn check_grounding(
    cited_url: &str,
    generated_text: &str,
    reference: Option<&ReferenceArticle>,
    citation_pool: &[String],
    profile: &ModeProfile,
) -> ReferenceGroundingResult {
    if !profile.require_citation {
        return ReferenceGroundingResult::pass(cited_url, None);
    }

    if reference.is_none() && citation_pool.is_empty() {
        return ReferenceGroundingResult::fail(cited_url, GroundingFailure::ReferenceRequired, None);
    }

    let allowed: HashSet<String> = reference
        .map(|r| r.url.as_str())
        .into_iter()
        .chain(citation_pool.iter().map(String::as_str))
        .map(canonical_url)
        .collect();

    if !allowed.contains(&canonical_url(cited_url)) {
        return ReferenceGroundingResult::fail(cited_url, GroundingFailure::OutOfScope, None);
    }

    let Some(reference) = reference else {
        return ReferenceGroundingResult::pass(cited_url, None);
    };

    let mut reference_bigrams = char_ngrams(&normalize(&reference.title), 2);
    reference_bigrams.extend(char_ngrams(&normalize(&reference.summary), 2));
    if reference_bigrams.is_empty() {
        return ReferenceGroundingResult::pass(cited_url, None);
    }

    let overlap = containment(&reference_bigrams, &char_ngrams(&normalize(generated_text), 2));
    if overlap < profile.grounding_min_overlap {
        ReferenceGroundingResult::fail(cited_url, GroundingFailure::WeakGrounding, Some(overlap))
    } else {
        ReferenceGroundingResult::pass(cited_url, Some(overlap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> ReferenceArticle {
        ReferenceArticle {
            title: "반도체 수출 석 달 만에 반등".to_string(),
            summary: "메모리 가격 회복에 힘입어 반도체 수출이 전년 대비 늘었다".to_string(),
            url: "https://www.news.example.com/economy/123/?utm_source=feed#top".to_string(),
            source: "Example".to_string(),
        }
    }

    const GROUNDED: &str = "반도체 수출이 석 달 만에 반등했다. 메모리 가격 회복이 배경으로 꼽힌다.";

    #[test]
    fn test_canonical_url() {
        assert_eq!(
            canonical_url("https://www.News.example.com/economy/123/?utm_source=feed#top"),
            "news.example.com/economy/123"
        );
        assert_eq!(
            canonical_url("http://news.example.com/economy/123"),
            "news.example.com/economy/123"
        );
        assert_eq!(canonical_url("not a url/"), "not a url");
    }

    #[test]
    fn test_grounded_draft_passes() {
        let result = check_grounding(
            "https://news.example.com/economy/123",
            GROUNDED,
            Some(&reference()),
            &[],
            &ModeProfile::draft(),
        );
        assert!(result.passed, "{:?}", result);
        assert!(result.overlap.unwrap() >= 0.15);
    }

    #[test]
    fn test_no_reference_no_pool_is_required() {
        let result = check_grounding(
            "https://news.example.com/economy/123",
            GROUNDED,
            None,
            &[],
            &ModeProfile::draft(),
        );
        assert_eq!(result.reason, Some(GroundingFailure::ReferenceRequired));
        assert!(matches!(result.to_error(), Some(DraftError::ReferenceRequired)));
    }

    #[test]
    fn test_out_of_pool_url() {
        let result = check_grounding(
            "https://elsewhere.example.org/story",
            GROUNDED,
            Some(&reference()),
            &[],
            &ModeProfile::draft(),
        );
        assert_eq!(result.reason, Some(GroundingFailure::OutOfScope));
    }

    #[test]
    fn test_pool_url_allowed_without_reference() {
        let pool = vec!["https://wire.example.com/feed/9".to_string()];
        let result = check_grounding(
            "https://wire.example.com/feed/9/",
            "아무 본문",
            None,
            &pool,
            &ModeProfile::draft(),
        );
        assert!(result.passed);
    }

    #[test]
    fn test_unrelated_text_is_weak() {
        let result = check_grounding(
            "https://news.example.com/economy/123",
            "주말 동안 전국에 비 소식이 있으며 기온은 평년보다 낮겠다.",
            Some(&reference()),
            &[],
            &ModeProfile::draft(),
        );
        assert_eq!(result.reason, Some(GroundingFailure::WeakGrounding));
        assert!(matches!(
            result.to_error(),
            Some(DraftError::ReferenceWeakGrounding { .. })
        ));
    }
}
