//! draftgate policy: compliance screening and neutrality advisories
//!
//! ```text
//! text → ComplianceScreener → ComplianceReport { riskLevel, flags }
//!                                   ↓
//!                      riskLevel >= medium blocks gated endpoints
//!
//! chat input → BiasDetector → Option<BiasAdvice>   (advisory only)
//! ```
//!
//! # Example
//!
//! ```
//! use draftgate_policy::screen_text;
//! use draftgate_core::RiskLevel;
//!
//! let report = screen_text("원금 보장, 무조건 수익");
//! assert!(report.risk_level >= RiskLevel::Medium);
//! ```

pub mod bias;
pub mod compliance;

pub use bias::{BiasAdvice, BiasDetector};
pub use compliance::{
    merge_reports, ComplianceCategory, CompliancePattern, ComplianceScreener,
};

use draftgate_core::ComplianceReport;

/// Screen a single text with the default catalogue
pub fn screen_text(text: &str) -> ComplianceReport {
    ComplianceScreener::default().screen(text)
}

/// Check whether a text would pass a gated endpoint
pub fn would_pass(text: &str) -> bool {
    !screen_text(text).is_blocking()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_would_pass() {
        assert!(would_pass("수출이 석 달 만에 반등했다."));
        assert!(!would_pass("확정 수익을 약속합니다."));
    }
}
