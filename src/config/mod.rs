//! Configuration for a11yscan

mod analysis;
mod billing;
mod fetch;
mod logging;
mod simulator;
mod storage;

pub use analysis::{AnalysisConfig, ChunkingConfig};
pub use billing::BillingConfig;
pub use fetch::FetchConfig;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use simulator::SimulatorConfig;
pub use storage::StorageConfig;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default user agent for all HTTP requests (fallback fetch, billing)
pub const DEFAULT_USER_AGENT: &str = "a11yscan/1.0";

/// Main configuration for the scanner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Page fetcher configuration
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Analyzer model configuration
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Chunking configuration (shared by scan and simulation pipelines)
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Persona simulator configuration
    #[serde(default)]
    pub simulator: SimulatorConfig,
    /// Billing / tier resolution configuration
    #[serde(default)]
    pub billing: BillingConfig,
    /// Local storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together so the user
    /// can fix everything in one pass rather than playing whack-a-mole.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Chunking validation
        if self.chunking.max_chunk_chars == 0 {
            errors.push("max_chunk_chars must be positive".to_string());
        }
        if self.chunking.ceiling_chars == 0 {
            errors.push("ceiling_chars must be positive".to_string());
        }
        if self.chunking.ceiling_chars < self.chunking.max_chunk_chars {
            errors.push("ceiling_chars must be >= max_chunk_chars".to_string());
        }

        // Fetch validation
        if self.fetch.navigation_timeout_secs == 0 {
            errors.push("navigation_timeout_secs must be positive".to_string());
        }
        if self.fetch.fallback_timeout_secs == 0 {
            errors.push("fallback_timeout_secs must be positive".to_string());
        }
        if self.fetch.user_agent.is_empty() {
            errors.push("user_agent must not be empty".to_string());
        }

        // Analysis validation
        if self.analysis.endpoint.is_empty() {
            errors.push("analysis endpoint must not be empty".to_string());
        }
        if self.analysis.max_attempts == 0 {
            errors.push("analysis max_attempts must be positive".to_string());
        }
        if !(0.0..=2.0).contains(&self.analysis.temperature) {
            errors.push("analysis temperature must be between 0.0 and 2.0".to_string());
        }
        if self.analysis.max_tokens == 0 {
            errors.push("analysis max_tokens must be positive".to_string());
        }

        // Simulator validation
        if self.simulator.chunk_chars == 0 {
            errors.push("simulator chunk_chars must be positive".to_string());
        }
        if self.simulator.max_chunks_abbreviated == 0 {
            errors.push("simulator max_chunks_abbreviated must be positive".to_string());
        }
        if !(0.0..=2.0).contains(&self.simulator.temperature) {
            errors.push("simulator temperature must be between 0.0 and 2.0".to_string());
        }

        // Billing validation
        if self.billing.max_attempts == 0 {
            errors.push("billing max_attempts must be positive".to_string());
        }

        // Storage validation
        if self.storage.data_dir.as_os_str().is_empty() {
            errors.push("data_dir must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}
