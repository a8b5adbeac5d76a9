//! draftgate pipeline: the Generation Orchestrator
//!
//! # Pipeline Flow
//!
//! ```text
//! draft / interactive-longform ─▶ model ─▶ gate ─▶ shape ─▶ outcome
//! paragraph-regeneration       ─▶ bounds ─▶ model ─▶ gate ─▶ paragraph
//! chat                         ─▶ model (fallback text) + bias advisory
//! compliance-check             ─▶ screener
//! interactive-spec             ─▶ always refused
//! ```
//!
//! Every finalized outcome updates telemetry exactly once.

pub mod fallback;
pub mod orchestrator;
pub mod prompts;
pub mod shaping;

pub use fallback::{classify_intent, fallback_draft};
pub use orchestrator::GenerationOrchestrator;
pub use shaping::{fit_media_slots, shape_draft, truncate_title};
