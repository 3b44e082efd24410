//! Merging chunk analyses into the canonical report

use super::static_checks::missing_alt_issue;
use super::AnalysisError;
use crate::normalize::NormalizedUrl;
use crate::types::{ChunkAnalysis, Report};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the merge step
#[derive(Debug, Error)]
pub enum MergeError {
    /// Defensive case: nothing to merge at all
    #[error("No analysis results to merge")]
    NoResults,
    /// The first chunk failed, so there is no disclaimer or baseline to
    /// build a report from
    #[error("First chunk analysis failed: {0}")]
    FirstChunkFailed(String),
}

/// A merged report plus the non-fatal notices produced while merging
#[derive(Debug)]
pub struct Merged {
    pub report: Report,
    /// One entry per skipped later chunk; empty on a clean merge
    pub warnings: Vec<String>,
}

/// Merge per-chunk analyses into one report.
///
/// Ordering: issues are concatenated in chunk order, then within-chunk
/// order; no reordering by severity or category. The aggregate score is
/// the equal-weight arithmetic mean of successful chunk scores. Summaries
/// are newline-joined; the disclaimer comes from the first successful
/// chunk.
///
/// Failure policy: a failed FIRST chunk aborts the merge. A failed LATER
/// chunk is skipped with a visible warning; partial results are reported,
/// never silently dropped.
///
/// The deterministic static checks run against `html`, the complete
/// unchunked document, and their findings are appended after the
/// AI-derived issues.
pub fn merge(
    partials: Vec<Result<ChunkAnalysis, AnalysisError>>,
    url: NormalizedUrl,
    html: String,
    truncated: bool,
) -> Result<Merged, MergeError> {
    if partials.is_empty() {
        return Err(MergeError::NoResults);
    }
    if let Err(e) = &partials[0] {
        return Err(MergeError::FirstChunkFailed(e.to_string()));
    }

    let mut warnings = Vec::new();
    let mut issues = Vec::new();
    let mut summaries = Vec::new();
    let mut disclaimer = String::new();
    let mut score_sum = 0.0;
    let mut success_count = 0usize;

    for (idx, partial) in partials.into_iter().enumerate() {
        match partial {
            Ok(analysis) => {
                if disclaimer.is_empty() {
                    disclaimer = analysis.disclaimer;
                }
                issues.extend(analysis.issues);
                score_sum += analysis.score;
                success_count += 1;
                summaries.push(analysis.summary);
            }
            Err(e) => {
                warn!(chunk = idx, "Skipping failed chunk: {}", e);
                warnings.push(format!(
                    "Chunk {} could not be analyzed and was skipped: {}",
                    idx + 1,
                    e
                ));
            }
        }
    }

    // partials[0] was checked above, so at least one success exists
    let score = score_sum / success_count as f64;

    if let Some(static_issue) = missing_alt_issue(&html) {
        debug!("Appending static missing-alt finding");
        issues.push(static_issue);
    }

    let report = Report {
        issues,
        score,
        summary: summaries.join("\n"),
        disclaimer,
        url,
        html,
        scanned_at: Utc::now(),
        truncated,
    };

    Ok(Merged { report, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::types::{Category, Issue, Severity};

    fn url() -> NormalizedUrl {
        normalize("example.com").unwrap()
    }

    fn issue(criterion: &str) -> Issue {
        Issue {
            criterion: criterion.to_string(),
            description: format!("issue {}", criterion),
            severity: Severity::Low,
            fix: "fix it".to_string(),
            code_fix: None,
            category: Category::Operable,
            confidence: 70,
        }
    }

    fn analysis(issues: Vec<Issue>, score: f64, summary: &str) -> ChunkAnalysis {
        ChunkAnalysis {
            issues,
            score,
            summary: summary.to_string(),
            disclaimer: "disclaimer text".to_string(),
        }
    }

    fn failed(reason: &str) -> Result<ChunkAnalysis, AnalysisError> {
        Err(AnalysisError::ExtractionFailed {
            attempts: 3,
            reason: reason.to_string(),
        })
    }

    #[test]
    fn empty_input_is_merge_failure() {
        let result = merge(vec![], url(), String::new(), false);
        assert!(matches!(result, Err(MergeError::NoResults)));
    }

    #[test]
    fn first_chunk_failure_aborts() {
        let result = merge(
            vec![failed("model down"), Ok(analysis(vec![], 50.0, "s"))],
            url(),
            String::new(),
            false,
        );
        assert!(matches!(result, Err(MergeError::FirstChunkFailed(_))));
    }

    #[test]
    fn merge_preserves_chunk_order_and_counts() {
        let merged = merge(
            vec![
                Ok(analysis(vec![issue("1.1.1"), issue("1.3.1")], 80.0, "first")),
                Ok(analysis(vec![issue("2.1.1")], 60.0, "second")),
            ],
            url(),
            "<p>no images</p>".to_string(),
            false,
        )
        .unwrap();

        let criteria: Vec<&str> = merged
            .report
            .issues
            .iter()
            .map(|i| i.criterion.as_str())
            .collect();
        assert_eq!(criteria, vec!["1.1.1", "1.3.1", "2.1.1"]);
        assert_eq!(merged.report.score, 70.0);
        assert_eq!(merged.report.summary, "first\nsecond");
        assert_eq!(merged.report.disclaimer, "disclaimer text");
        assert!(merged.warnings.is_empty());
    }

    #[test]
    fn later_chunk_failure_yields_partial_report_with_warning() {
        let merged = merge(
            vec![
                Ok(analysis(vec![issue("1.1.1")], 90.0, "ok")),
                failed("timeout"),
                Ok(analysis(vec![issue("4.1.2")], 70.0, "also ok")),
            ],
            url(),
            String::new(),
            false,
        )
        .unwrap();

        assert_eq!(merged.report.issues.len(), 2);
        // Mean over successful chunks only
        assert_eq!(merged.report.score, 80.0);
        assert_eq!(merged.warnings.len(), 1);
        assert!(merged.warnings[0].contains("Chunk 2"));
        assert!(merged.warnings[0].contains("timeout"));
    }

    #[test]
    fn static_alt_issue_appended_after_model_issues() {
        let merged = merge(
            vec![Ok(analysis(vec![issue("2.4.4")], 75.0, "s"))],
            url(),
            r#"<img src="a.png"><img src="b.png">"#.to_string(),
            false,
        )
        .unwrap();

        assert_eq!(merged.report.issues.len(), 2);
        let last = merged.report.issues.last().unwrap();
        assert_eq!(last.criterion, "1.1.1");
        assert!(last.description.contains("2 images"));
    }

    #[test]
    fn zero_model_issues_still_gets_static_finding() {
        let merged = merge(
            vec![Ok(analysis(vec![], 100.0, ""))],
            url(),
            r#"<img src="a.png">"#.to_string(),
            false,
        )
        .unwrap();

        assert_eq!(merged.report.issues.len(), 1);
        assert_eq!(merged.report.issues[0].severity, Severity::High);
    }

    #[test]
    fn score_stays_in_bounds_for_valid_inputs() {
        let merged = merge(
            vec![
                Ok(analysis(vec![], 0.0, "")),
                Ok(analysis(vec![], 100.0, "")),
            ],
            url(),
            String::new(),
            false,
        )
        .unwrap();
        assert!((0.0..=100.0).contains(&merged.report.score));
    }

    #[test]
    fn truncation_flag_carries_into_report() {
        let merged = merge(
            vec![Ok(analysis(vec![], 50.0, ""))],
            url(),
            String::new(),
            true,
        )
        .unwrap();
        assert!(merged.report.truncated);
    }
}
