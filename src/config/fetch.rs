//! Page fetching configuration

use serde::{Deserialize, Serialize};

use super::DEFAULT_USER_AGENT;

/// Configuration for the two-tier page fetcher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// User agent sent by the plain-HTTP fallback tier
    pub user_agent: String,
    /// Browser navigation budget (seconds)
    pub navigation_timeout_secs: u64,
    /// Plain-HTTP fallback timeout (seconds)
    pub fallback_timeout_secs: u64,
    /// Enable the headless-browser tier. When off, fetches go straight to
    /// the HTTP tier (useful for CI and machines without chromium).
    pub enable_browser: bool,
    /// URL patterns blocked during browser navigation. Non-essential
    /// resource classes (images, media, fonts) are skipped for latency.
    pub blocked_resource_patterns: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            navigation_timeout_secs: 60,
            fallback_timeout_secs: 10,
            enable_browser: true,
            blocked_resource_patterns: vec![
                "*.png".to_string(),
                "*.jpg".to_string(),
                "*.jpeg".to_string(),
                "*.gif".to_string(),
                "*.webp".to_string(),
                "*.svg".to_string(),
                "*.ico".to_string(),
                "*.mp4".to_string(),
                "*.webm".to_string(),
                "*.mp3".to_string(),
                "*.wav".to_string(),
                "*.woff".to_string(),
                "*.woff2".to_string(),
                "*.ttf".to_string(),
                "*.otf".to_string(),
                "*.eot".to_string(),
            ],
        }
    }
}
