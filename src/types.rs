//! Core types for the a11yscan pipeline

use crate::normalize::NormalizedUrl;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Opaque user identity (typically an email address)
pub type Identity = String;

/// Exact content hash using SHA256 (64-character hex string).
///
/// Used to key persona simulations by the HTML they were generated from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute SHA256 hash of content
    pub fn compute(content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let result = hasher.finalize();
        ContentHash(hex::encode(result))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scan depth: Preview analyzes the first chunk only, Full analyzes all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Preview,
    Full,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preview => "preview",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scan submission. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Free-text URL as the user typed it
    pub raw_url: String,
    pub identity: Identity,
    /// Requested depth; may be downgraded by tier gating
    pub mode: ScanMode,
}

impl ScanRequest {
    pub fn new(raw_url: impl Into<String>, identity: impl Into<Identity>, mode: ScanMode) -> Self {
        Self {
            raw_url: raw_url.into(),
            identity: identity.into(),
            mode,
        }
    }
}

/// Issue severity as reported by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Med,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "Low",
            Self::Med => "Med",
            Self::High => "High",
        };
        f.write_str(s)
    }
}

/// WCAG principle the issue falls under.
///
/// `Unknown` absorbs anything the model invents outside the four
/// principles rather than failing the whole chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Category {
    Perceivable,
    Operable,
    Understandable,
    Robust,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Perceivable => "Perceivable",
            Self::Operable => "Operable",
            Self::Understandable => "Understandable",
            Self::Robust => "Robust",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// One accessibility finding. Never mutated after creation; owned by the
/// report once merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// WCAG criterion reference, e.g. "1.1.1"
    pub criterion: String,
    pub description: String,
    pub severity: Severity,
    /// Human-readable fix suggestion
    pub fix: String,
    /// Optional HTML/CSS/JS snippet demonstrating the fix
    #[serde(default)]
    pub code_fix: Option<String>,
    #[serde(default)]
    pub category: Category,
    /// Analyzer's confidence in the finding, 0-100
    pub confidence: u8,
}

/// Successful analysis of a single chunk. Ephemeral: consumed immediately
/// by the merger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkAnalysis {
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub disclaimer: String,
}

/// The canonical merged scan report.
///
/// Created once per successful scan, cached, re-read many times, never
/// mutated. Re-scans produce a new report. The raw HTML is retained so
/// exports and persona simulation can reuse it without a second fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Insertion order: chunk order, then within-chunk order
    pub issues: Vec<Issue>,
    /// Equal-weight mean of chunk scores, in [0, 100]
    pub score: f64,
    /// Newline-joined chunk summaries
    pub summary: String,
    pub disclaimer: String,
    pub url: NormalizedUrl,
    pub html: String,
    pub scanned_at: DateTime<Utc>,
    /// True when the source HTML was cut at the size ceiling
    pub truncated: bool,
}

/// Per-request response: the report plus everything the presentation
/// layer needs to know about how it was produced. Replaces ambient
/// session state with an explicit value.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub report: Arc<Report>,
    pub cache_hit: bool,
    /// Non-fatal notices: truncation, skipped chunks, snapshot errors
    pub warnings: Vec<String>,
}

/// Narrative produced by the persona simulator. Independent lifecycle
/// from the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaSimulation {
    pub persona_id: String,
    pub narrative: String,
    pub chunk_count: usize,
}
