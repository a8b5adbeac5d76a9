//! Mode profiles: shape rules and thresholds per generation pipeline
//!
//! Draft and interactive-longform share one gate but differ in section count
//! and media-slot cardinality.

use draftgate_core::GenerationMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("PROFILE/yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("PROFILE/invalid: {0}")]
    Invalid(String),
}

/// Shape and threshold profile for one generation mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeProfile {
    /// Profile name (e.g., "draft@1.0")
    pub name: String,

    pub mode: GenerationMode,

    // === Shape ===

    /// Minimum number of sections the model must return
    pub min_sections: usize,

    /// Media slots are padded up to this count
    pub min_media_slots: usize,

    /// Media slots are trimmed down to this count
    pub max_media_slots: Option<usize>,

    // === Grounding ===

    /// Whether the draft must cite an offered reference
    pub require_citation: bool,

    /// Minimum share of reference bigrams found in the content
    pub grounding_min_overlap: f64,

    // === Similarity ===

    /// Dice coefficient at which a title counts as copied
    pub title_copy_threshold: f64,

    /// Share of reference summary shingles at which content counts as copied
    pub content_copy_threshold: f64,

    /// Summaries shorter than this (normalized chars) skip the content copy check
    pub content_copy_min_chars: usize,

    // === Compliance ===

    /// Whether medium/high compliance risk blocks the draft
    pub compliance_gated: bool,
}

impl ModeProfile {
    /// Short-form draft: at most one media slot
    pub fn draft() -> Self {
        Self {
            name: "draft@1.0".to_string(),
            mode: GenerationMode::Draft,
            min_sections: 1,
            min_media_slots: 0,
            max_media_slots: Some(1),
            require_citation: true,
            grounding_min_overlap: 0.15,
            title_copy_threshold: 0.85,
            content_copy_threshold: 0.6,
            content_copy_min_chars: 40,
            compliance_gated: true,
        }
    }

    /// Extended interactive article: at least three media slots
    pub fn interactive_longform() -> Self {
        Self {
            name: "interactive-longform@1.0".to_string(),
            mode: GenerationMode::InteractiveLongform,
            min_sections: 3,
            min_media_slots: 3,
            max_media_slots: None,
            ..Self::draft()
        }
    }

    pub fn for_mode(mode: GenerationMode) -> Self {
        match mode {
            GenerationMode::Draft => Self::draft(),
            GenerationMode::InteractiveLongform => Self::interactive_longform(),
        }
    }

    /// Load a profile from YAML and check its invariants
    pub fn from_yaml(yaml: &str) -> Result<Self, ProfileError> {
        let profile: Self = serde_yaml::from_str(yaml)?;
        profile.check()?;
        Ok(profile)
    }

    fn check(&self) -> Result<(), ProfileError> {
        if let Some(max) = self.max_media_slots {
            if max < self.min_media_slots {
                return Err(ProfileError::Invalid(format!(
                    "max_media_slots {} below min_media_slots {}",
                    max, self.min_media_slots
                )));
            }
        }
        for (name, value) in [
            ("grounding_min_overlap", self.grounding_min_overlap),
            ("title_copy_threshold", self.title_copy_threshold),
            ("content_copy_threshold", self.content_copy_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ProfileError::Invalid(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for ModeProfile {
    fn default() -> Self {
        Self::draft()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_cardinality() {
        let draft = ModeProfile::for_mode(GenerationMode::Draft);
        let longform = ModeProfile::for_mode(GenerationMode::InteractiveLongform);
        assert_eq!(draft.max_media_slots, Some(1));
        assert_eq!(longform.min_media_slots, 3);
        assert!(longform.min_sections > draft.min_sections);
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
name: draft@2.0
mode: draft
min_sections: 2
min_media_slots: 0
max_media_slots: 1
require_citation: true
grounding_min_overlap: 0.2
title_copy_threshold: 0.9
content_copy_threshold: 0.5
content_copy_min_chars: 30
compliance_gated: true
"#;
        let profile = ModeProfile::from_yaml(yaml).unwrap();
        assert_eq!(profile.name, "draft@2.0");
        assert_eq!(profile.min_sections, 2);
    }

    #[test]
    fn test_from_yaml_rejects_inverted_slot_bounds() {
        let mut profile = ModeProfile::interactive_longform();
        profile.max_media_slots = Some(1);
        let yaml = serde_yaml::to_string(&profile).unwrap();
        assert!(matches!(
            ModeProfile::from_yaml(&yaml),
            Err(ProfileError::Invalid(_))
        ));
    }
}
