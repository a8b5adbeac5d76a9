//! Compliance screening for generated editorial text
//!
//! Scans for regulated-claim language (guaranteed returns, absolute medical
//! claims) and personally identifying disclosures.
//!
//! - sensitive identifier found → `high`
//! - guarantee / absolute language → `medium`
//! - otherwise → `low`

use draftgate_core::{ComplianceFlag, ComplianceReport, RiskLevel};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// What a pattern protects against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceCategory {
    /// Personally identifying data
    SensitiveIdentifier,
    /// Investment / financial promises
    FinancialClaim,
    /// Health and medical claims
    MedicalClaim,
    /// Unqualified absolutes ("무조건", "100%")
    AbsoluteLanguage,
}

/// A single screening rule
#[derive(Debug, Clone)]
pub struct CompliancePattern {
    pub code: &'static str,
    pub category: ComplianceCategory,
    pub level: RiskLevel,
    pub message: &'static str,
    /// If the regex has a group named `m`, only that group is reported.
    pub regex: Regex,
}

impl CompliancePattern {
    pub fn new(
        code: &'static str,
        category: ComplianceCategory,
        level: RiskLevel,
        message: &'static str,
        pattern: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            code,
            category,
            level,
            message,
            regex: Regex::new(pattern)?,
        })
    }

    fn find(&self, text: &str) -> Option<String> {
        let caps = self.regex.captures(text)?;
        let m = caps.name("m").or_else(|| caps.get(0))?;
        Some(m.as_str().trim().to_string())
    }
}

static DEFAULT_PATTERNS: Lazy<Vec<CompliancePattern>> = Lazy::new(|| {
    use ComplianceCategory::*;
    let specs: [(&'static str, ComplianceCategory, RiskLevel, &'static str, &str); 8] = [
        (
            "RESIDENT_REGISTRATION_NUMBER",
            SensitiveIdentifier,
            RiskLevel::High,
            "resident registration number disclosed",
            r"(?:^|[^0-9])(?P<m>\d{6}\s?-\s?[1-4]\d{6})(?:[^0-9]|$)",
        ),
        (
            "PHONE_NUMBER",
            SensitiveIdentifier,
            RiskLevel::High,
            "personal phone number disclosed",
            r"(?:^|[^0-9])(?P<m>01[016789][-\s.]?\d{3,4}[-\s.]?\d{4})(?:[^0-9]|$)",
        ),
        (
            "EMAIL_ADDRESS",
            SensitiveIdentifier,
            RiskLevel::High,
            "personal email address disclosed",
            r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
        ),
        (
            "CARD_NUMBER",
            SensitiveIdentifier,
            RiskLevel::High,
            "payment card number disclosed",
            r"(?:^|[^0-9])(?P<m>\d{4}[-\s]\d{4}[-\s]\d{4}[-\s]\d{4})(?:[^0-9]|$)",
        ),
        (
            "GUARANTEED_RETURN",
            FinancialClaim,
            RiskLevel::Medium,
            "guaranteed return or principal protection claim",
            r"(?i)원금\s*보장|확정\s*수익|수익\s*보장|보장된\s*수익|guaranteed\s+(?:returns?|profits?|income)|risk[-\s]?free",
        ),
        (
            "ABSOLUTE_CLAIM",
            AbsoluteLanguage,
            RiskLevel::Medium,
            "unqualified absolute language",
            r"(?i)무조건|절대\s*(?:손실|실패|안전)|100\s*%|\b(?:always|never)\s+(?:wins?|loses?|fails?)\b",
        ),
        (
            "MEDICAL_ABSOLUTE",
            MedicalClaim,
            RiskLevel::Medium,
            "absolute medical efficacy claim",
            r"(?i)완치|치료\s*가능|부작용\s*(?:없|제로)|\bcures?\s+(?:all|any|every)\b|miracle\s+cure",
        ),
        (
            "UNVERIFIED_INSIDER",
            FinancialClaim,
            RiskLevel::Medium,
            "unverified insider or tip-off claim",
            r"(?i)내부\s*정보|작전주|insider\s+tip",
        ),
    ];

    specs
        .into_iter()
        .map(|(code, category, level, message, pattern)| {
            CompliancePattern::new(code, category, level, message, pattern).unwrap()
        })
        .collect()
});

/// Pattern-based compliance screener
#[derive(Debug, Clone)]
pub struct ComplianceScreener {
    patterns: Vec<CompliancePattern>,
}

impl Default for ComplianceScreener {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS.clone(),
        }
    }
}

impl ComplianceScreener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a custom rule (e.g. a newsroom-specific banned phrase)
    pub fn with_pattern(mut self, pattern: CompliancePattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn patterns(&self) -> &[CompliancePattern] {
        &self.patterns
    }

    /// Screen one text.
    pub fn screen(&self, text: &str) -> ComplianceReport {
        self.screen_all(&[text])
    }

    /// Screen several fragments; one flag per pattern code.
    pub fn screen_all(&self, texts: &[&str]) -> ComplianceReport {
        let mut flags: Vec<ComplianceFlag> = Vec::new();

        for pattern in &self.patterns {
            let hit = texts.iter().find_map(|t| pattern.find(t));
            if let Some(matched) = hit {
                flags.push(ComplianceFlag {
                    code: pattern.code.to_string(),
                    level: pattern.level,
                    matched,
                    message: pattern.message.to_string(),
                });
            }
        }

        let risk_level = flags
            .iter()
            .map(|f| f.level)
            .max()
            .unwrap_or(RiskLevel::Low);

        ComplianceReport { risk_level, flags }
    }
}

/// Merge a model-reported report with a screened one. The stricter level wins
/// and flags are unioned by code.
pub fn merge_reports(reported: &ComplianceReport, screened: &ComplianceReport) -> ComplianceReport {
    let mut flags = screened.flags.clone();
    for flag in &reported.flags {
        if !flags.iter().any(|f| f.code == flag.code) {
            flags.push(flag.clone());
        }
    }
    ComplianceReport {
        risk_level: reported.risk_level.max(screened.risk_level),
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_is_low() {
        let report = ComplianceScreener::new().screen("한국은행이 기준금리를 동결했다.");
        assert_eq!(report.risk_level, RiskLevel::Low);
        assert!(report.flags.is_empty());
    }

    #[test]
    fn test_guarantee_and_medical_language_is_medium() {
        let report = ComplianceScreener::new().screen("원금 보장, 무조건 수익, 100% 치료 가능");
        assert_eq!(report.risk_level, RiskLevel::Medium);
        let codes: Vec<&str> = report.flags.iter().map(|f| f.code.as_str()).collect();
        assert!(codes.contains(&"GUARANTEED_RETURN"));
        assert!(codes.contains(&"ABSOLUTE_CLAIM"));
        assert!(codes.contains(&"MEDICAL_ABSOLUTE"));
    }

    #[test]
    fn test_identifiers_are_high() {
        let screener = ComplianceScreener::new();
        let rrn = screener.screen("제보자 주민번호는 900101-1234567이다");
        assert_eq!(rrn.risk_level, RiskLevel::High);
        assert_eq!(rrn.flags[0].matched, "900101-1234567");

        let phone = screener.screen("연락처 010-1234-5678로 문의");
        assert_eq!(phone.risk_level, RiskLevel::High);
        assert_eq!(phone.flags[0].code, "PHONE_NUMBER");
        assert_eq!(phone.flags[0].matched, "010-1234-5678");
    }

    #[test]
    fn test_high_outranks_medium() {
        let report =
            ComplianceScreener::new().screen("원금 보장 상품, 문의는 reporter@example.com");
        assert_eq!(report.risk_level, RiskLevel::High);
        assert_eq!(report.flags.len(), 2);
    }

    #[test]
    fn test_english_guarantees() {
        let report = ComplianceScreener::new().screen("A risk-free plan with guaranteed returns");
        assert_eq!(report.risk_level, RiskLevel::Medium);
        assert_eq!(report.flags.len(), 1);
    }

    #[test]
    fn test_long_digit_runs_are_not_phone_numbers() {
        let report = ComplianceScreener::new().screen("거래량은 2024010123456789주였다");
        assert!(report.flags.iter().all(|f| f.code != "PHONE_NUMBER"));
    }

    #[test]
    fn test_custom_pattern() {
        let screener = ComplianceScreener::new().with_pattern(
            CompliancePattern::new(
                "BANNED_PHRASE",
                ComplianceCategory::AbsoluteLanguage,
                RiskLevel::Medium,
                "newsroom banned phrase",
                "대박",
            )
            .unwrap(),
        );
        assert!(screener.screen("대박 종목").is_blocking());
    }

    #[test]
    fn test_merge_prefers_stricter() {
        let screened = ComplianceScreener::new().screen("확정 수익");
        let reported = ComplianceReport::clean();
        let merged = merge_reports(&reported, &screened);
        assert_eq!(merged.risk_level, RiskLevel::Medium);
        assert_eq!(merged.flags.len(), 1);
    }
}
