//! Text overlap metrics and copy detection
//!
//! Character n-grams over normalized text (lowercase alphanumerics only), so
//! Hangul and Latin scripts behave the same without a tokenizer.

use crate::profile::ModeProfile;
use draftgate_core::{ReferenceArticle, ValidationIssue};
use std::collections::HashSet;

pub const ISSUE_TITLE_COPY: &str = "AI_NEWS_TITLE_COPY_DETECTED";
pub const ISSUE_CONTENT_COPY: &str = "AI_NEWS_CONTENT_COPY_DETECTED";

const SHINGLE_CHARS: usize = 8;

pub fn normalize(text: &str) -> Vec<char> {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn char_ngrams(chars: &[char], n: usize) -> HashSet<String> {
    if n == 0 || chars.len() < n {
        return HashSet::new();
    }
    chars.windows(n).map(|w| w.iter().collect()).collect()
}

/// Dice coefficient over character bigrams, in [0, 1].
pub fn dice_bigrams(a: &str, b: &str) -> f64 {
    let (na, nb) = (normalize(a), normalize(b));
    if !na.is_empty() && na == nb {
        return 1.0;
    }
    let (ba, bb) = (char_ngrams(&na, 2), char_ngrams(&nb, 2));
    if ba.is_empty() || bb.is_empty() {
        return 0.0;
    }
    let shared = ba.intersection(&bb).count();
    (2 * shared) as f64 / (ba.len() + bb.len()) as f64
}

/// Share of `needle`'s n-grams that also occur in `haystack`, in [0, 1].
pub fn containment(needle: &HashSet<String>, haystack: &HashSet<String>) -> f64 {
    if needle.is_empty() {
        return 0.0;
    }
    needle.intersection(haystack).count() as f64 / needle.len() as f64
}

/// Step 5: near-verbatim reuse of the reference title or summary.
pub fn check_copy(
    title: &str,
    body: &str,
    reference: &ReferenceArticle,
    profile: &ModeProfile,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let title_score = dice_bigrams(title, &reference.title);
    if title_score >= profile.title_copy_threshold {
        issues.push(ValidationIssue::new(
            ISSUE_TITLE_COPY,
            format!(
                "title repeats the reference title ({:.0}% similar)",
                title_score * 100.0
            ),
        ));
    }

    let summary = normalize(&reference.summary);
    if summary.len() >= profile.content_copy_min_chars {
        let summary_shingles = char_ngrams(&summary, SHINGLE_CHARS);
        let body_shingles = char_ngrams(&normalize(body), SHINGLE_CHARS);
        let copied = containment(&summary_shingles, &body_shingles);
        if copied >= profile.content_copy_threshold {
            issues.push(ValidationIssue::new(
                ISSUE_CONTENT_COPY,
                format!(
                    "content reproduces {:.0}% of the reference summary verbatim",
                    copied * 100.0
                ),
            ));
        }
    }

    issues
}
