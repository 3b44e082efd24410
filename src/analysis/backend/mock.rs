//! Deterministic mock backend for tests and offline runs

use super::traits::{CompletionRequest, ModelBackend, ModelError, ModelResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Scripted backend: serves queued responses in order, then falls back to
/// a fixed deterministic answer. Tracks how many completions were
/// requested so tests can assert on call counts (cache hits, single
/// flight).
#[derive(Debug, Default)]
pub struct MockBackend {
    script: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue responses to serve before the default answer. `Err` entries
    /// are surfaced as request failures.
    pub fn with_script(responses: Vec<Result<String, String>>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Total completions requested so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A minimal well-formed analysis document
    pub fn default_analysis_json() -> String {
        r#"{
            "issues": [{
                "criterion": "1.3.1",
                "description": "Heading levels skip from h1 to h3",
                "severity": "Med",
                "fix": "Use sequential heading levels",
                "code_fix": "<h2>Section</h2>",
                "category": "Perceivable",
                "confidence": 85
            }],
            "score": 80,
            "disclaimer": "AI-powered scan aligned with WCAG 2.2; not a full manual audit. Consult experts.",
            "summary": "Generally accessible with minor heading structure problems."
        }"#
        .to_string()
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    async fn complete(&self, request: CompletionRequest<'_>) -> ModelResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let scripted = {
            let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
            script.pop_front()
        };

        match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(ModelError::RequestFailed(reason)),
            None if request.json_output => Ok(Self::default_analysis_json()),
            None => Ok("The page reads in a reasonable order, but several \
                        controls lack accessible names."
                .to_string()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
