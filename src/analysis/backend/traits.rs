//! Model backend trait definitions

use async_trait::async_trait;
use std::fmt::Debug;

/// Errors that can occur during model calls
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The completion request failed at the API level
    #[error("Model request failed: {0}")]
    RequestFailed(String),

    /// Rate limited by the API
    #[error("Rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited {
        /// Suggested retry delay in milliseconds, if provided by the API
        retry_after_ms: Option<u64>,
    },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// A single completion request.
///
/// When `json_output` is set the backend asks the model for
/// schema-constrained JSON output; the caller still parses and validates
/// the returned text.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    /// Optional system instruction (persona profiles use this)
    pub system: Option<&'a str>,
    pub user: &'a str,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub json_output: bool,
}

/// Core trait for completion model backends.
///
/// Object-safe so pipelines can hold a `dyn ModelBackend` and tests can
/// substitute the mock.
#[async_trait]
pub trait ModelBackend: Send + Sync + Debug {
    /// Run one completion and return the raw model text
    async fn complete(&self, request: CompletionRequest<'_>) -> ModelResult<String>;

    /// Get the backend name (e.g., "http", "mock")
    fn name(&self) -> &str;
}
