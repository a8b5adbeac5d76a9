//! draftgate quality: the Validation Gate for raw model output
//!
//! Every model response passes through [`ValidationGate`] before anything is
//! returned to the caller. Checks short-circuit on the first failure, in the
//! order documented on [`gate`].
//!
//! # Example
//!
//! ```
//! use draftgate_core::{GenerationMode, GenerationRequest};
//! use draftgate_quality::{GateVerdict, ValidationGate};
//!
//! let gate = ValidationGate::default();
//! let request = GenerationRequest::new("금리", GenerationMode::Draft);
//!
//! assert_eq!(gate.validate("", &request), GateVerdict::ModelEmpty);
//! ```

pub mod checks;
pub mod gate;
pub mod grounding;
pub mod profile;
pub mod similarity;

pub use checks::{
    check_raw, check_schema, has_inline_citation, strip_inline_citations, ParsedDraft, RawCheck,
};
pub use gate::{GateVerdict, ValidationGate};
pub use grounding::{canonical_url, check_grounding, GroundingFailure, ReferenceGroundingResult};
pub use profile::{ModeProfile, ProfileError};
pub use similarity::{check_copy, dice_bigrams, ISSUE_CONTENT_COPY, ISSUE_TITLE_COPY};

use draftgate_core::{DraftError, GeneratedDraft, GenerationRequest};

/// Validate one raw output with a default gate
pub fn validate(raw: &str, request: &GenerationRequest) -> Result<GeneratedDraft, DraftError> {
    ValidationGate::default().validate(raw, request).into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftgate_core::GenerationMode;

    #[test]
    fn test_quick_validate_rejects_prose() {
        let request = GenerationRequest::new("금리", GenerationMode::Draft);
        let err = validate("죄송하지만 도와드릴 수 없습니다.", &request).unwrap_err();
        assert!(err.is_transient());
    }
}
