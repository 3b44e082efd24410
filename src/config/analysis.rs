//! Analyzer model and chunking configuration

use serde::{Deserialize, Serialize};

/// Configuration for the accessibility analyzer backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// OpenAI-compatible chat completions endpoint
    pub endpoint: String,
    /// API key (falls back to the OPENAI_API_KEY env var)
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// Sampling temperature for issue extraction
    pub temperature: f32,
    /// Completion token budget per chunk
    pub max_tokens: u32,
    /// Request timeout (seconds)
    pub timeout_secs: u64,
    /// Retry attempts per chunk, including the first
    pub max_attempts: u32,
    /// Base delay for exponential backoff (milliseconds)
    pub retry_base_delay_ms: u64,
    /// Fixed pause between chunk requests to stay under rate limits
    /// (milliseconds)
    pub chunk_pause_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-4o".to_string(),
            temperature: 0.3,
            max_tokens: 1500,
            timeout_secs: 30,
            max_attempts: 3,
            retry_base_delay_ms: 500,
            chunk_pause_ms: 500,
        }
    }
}

/// Configuration for tag-safe HTML chunking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Minimum characters accumulated before a chunk may close
    pub max_chunk_chars: usize,
    /// Hard document size ceiling; content beyond it is dropped with a
    /// caller-visible flag
    pub ceiling_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 5000,
            ceiling_chars: 60_000,
        }
    }
}
