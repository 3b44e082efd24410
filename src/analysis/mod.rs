//! Accessibility analysis pipeline
//!
//! One chunk at a time, the extractor asks a language model for WCAG
//! findings under a fixed JSON schema; the merger folds the per-chunk
//! results into one canonical report and appends deterministic static
//! findings computed over the full document.

pub mod backend;

mod extractor;
mod merger;
mod static_checks;

pub use extractor::IssueExtractor;
pub use merger::{merge, MergeError, Merged};
pub use static_checks::{missing_alt_count, missing_alt_issue};

use thiserror::Error;

/// Errors from per-chunk issue extraction
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The model call exhausted its retry budget. Propagates to the merge
    /// as a hard stop when it is the first chunk.
    #[error("Analysis failed after {attempts} attempts: {reason}")]
    ExtractionFailed { attempts: u32, reason: String },
}
