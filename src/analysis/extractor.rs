//! Per-chunk issue extraction

use super::backend::{CompletionRequest, ModelBackend};
use super::AnalysisError;
use crate::chunking::HtmlChunk;
use crate::config::AnalysisConfig;
use crate::types::ChunkAnalysis;
use crate::util::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Sends one HTML chunk at a time to the model under a fixed response
/// schema and returns the typed analysis.
pub struct IssueExtractor {
    backend: Arc<dyn ModelBackend>,
    temperature: f32,
    max_tokens: u32,
    retry: RetryPolicy,
    chunk_pause: Duration,
}

impl IssueExtractor {
    pub fn new(backend: Arc<dyn ModelBackend>, config: &AnalysisConfig) -> Self {
        Self {
            backend,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: RetryPolicy::new(
                config.max_attempts,
                Duration::from_millis(config.retry_base_delay_ms),
            ),
            chunk_pause: Duration::from_millis(config.chunk_pause_ms),
        }
    }

    /// Analyze a single chunk, retrying transport and parse failures with
    /// exponential backoff. Exhausting the budget yields
    /// [`AnalysisError::ExtractionFailed`]; the caller decides whether that
    /// aborts the scan.
    pub async fn extract(&self, chunk: &HtmlChunk) -> Result<ChunkAnalysis, AnalysisError> {
        let prompt = build_prompt(&chunk.content);
        let mut attempt = 0;

        loop {
            match self.request_analysis(&prompt).await {
                Ok(analysis) => {
                    debug!(
                        chunk = chunk.index,
                        issues = analysis.issues.len(),
                        score = analysis.score,
                        "Chunk analyzed"
                    );
                    return Ok(analysis);
                }
                Err(reason) if self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        chunk = chunk.index,
                        attempt = attempt + 1,
                        "Chunk analysis failed: {} (retrying in {:?})",
                        reason,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(reason) => {
                    return Err(AnalysisError::ExtractionFailed {
                        attempts: attempt + 1,
                        reason,
                    });
                }
            }
        }
    }

    /// Fixed pause between chunk requests. The pipeline analyzes chunks
    /// sequentially and rate-limits itself, trading latency for quota
    /// safety.
    pub async fn pause_between_chunks(&self) {
        tokio::time::sleep(self.chunk_pause).await;
    }

    async fn request_analysis(&self, prompt: &str) -> Result<ChunkAnalysis, String> {
        let raw = self
            .backend
            .complete(CompletionRequest {
                system: None,
                user: prompt,
                temperature: self.temperature,
                max_tokens: Some(self.max_tokens),
                json_output: true,
            })
            .await
            .map_err(|e| e.to_string())?;

        serde_json::from_str(&raw).map_err(|e| format!("Malformed analyzer output: {}", e))
    }
}

/// Neutralize characters that would break the prompt template: HTML-escape
/// the chunk and drop braces entirely.
fn sanitize_chunk(html: &str) -> String {
    html_escape::encode_text(html).replace(['{', '}'], "")
}

fn build_prompt(chunk_html: &str) -> String {
    let safe_snippet = sanitize_chunk(chunk_html);
    format!(
        r#"Analyze the following HTML for WCAG 2.2 accessibility issues. For each issue:
- Specify the WCAG criterion (e.g., 1.1.1).
- Describe the issue clearly.
- Provide a fix suggestion.
- Include a specific code fix (e.g., HTML/CSS/JS snippet) if applicable.
- Assign a category: Perceivable, Operable, Understandable, Robust.

Include a confidence score (0-100) for each issue based on likelihood of correctness.
Return results as a JSON object with this exact shape:
"issues": an array of objects with keys "criterion" (string), "description" (string),
"severity" ("Low", "Med" or "High"), "fix" (string), "code_fix" (string or null),
"category" (string), "confidence" (integer);
"score": integer 0-100 for the overall page;
"disclaimer": "AI-powered scan aligned with WCAG 2.2; not a full manual audit. Consult experts.";
"summary": string (200 chars max).

HTML: {safe_snippet}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::backend::MockBackend;

    fn chunk(content: &str) -> HtmlChunk {
        HtmlChunk {
            index: 0,
            content: content.to_string(),
        }
    }

    fn extractor_with(backend: MockBackend) -> IssueExtractor {
        let config = AnalysisConfig {
            retry_base_delay_ms: 1,
            chunk_pause_ms: 1,
            ..AnalysisConfig::default()
        };
        IssueExtractor::new(Arc::new(backend), &config)
    }

    #[test]
    fn sanitize_strips_braces_and_escapes_tags() {
        let out = sanitize_chunk("<div>{x}</div>");
        assert!(!out.contains('{'));
        assert!(!out.contains('}'));
        assert!(!out.contains('<'));
    }

    #[test]
    fn prompt_embeds_sanitized_chunk() {
        let prompt = build_prompt("<img src=\"a.png\">");
        assert!(prompt.contains("WCAG 2.2"));
        assert!(prompt.contains("&lt;img"));
    }

    #[tokio::test]
    async fn extract_parses_model_output() {
        let backend = MockBackend::new();
        let extractor = extractor_with(backend);
        let analysis = extractor.extract(&chunk("<p>hi</p>")).await.unwrap();
        assert_eq!(analysis.issues.len(), 1);
        assert_eq!(analysis.score, 80.0);
        assert!(!analysis.disclaimer.is_empty());
    }

    #[tokio::test]
    async fn extract_retries_then_succeeds() {
        let backend = MockBackend::with_script(vec![
            Err("transient".to_string()),
            Ok(MockBackend::default_analysis_json()),
        ]);
        let extractor = extractor_with(backend);
        let analysis = extractor.extract(&chunk("<p>hi</p>")).await.unwrap();
        assert_eq!(analysis.issues.len(), 1);
    }

    #[tokio::test]
    async fn extract_retries_malformed_output() {
        let backend = MockBackend::with_script(vec![
            Ok("not json at all".to_string()),
            Ok(MockBackend::default_analysis_json()),
        ]);
        let extractor = extractor_with(backend);
        assert!(extractor.extract(&chunk("<p>hi</p>")).await.is_ok());
    }

    #[tokio::test]
    async fn extract_fails_after_budget_exhausted() {
        let backend = MockBackend::with_script(vec![
            Err("down".to_string()),
            Err("down".to_string()),
            Err("down".to_string()),
        ]);
        let extractor = extractor_with(backend);
        let err = extractor.extract(&chunk("<p>hi</p>")).await.unwrap_err();
        let AnalysisError::ExtractionFailed { attempts, reason } = err;
        assert_eq!(attempts, 3);
        assert!(reason.contains("down"));
    }
}
