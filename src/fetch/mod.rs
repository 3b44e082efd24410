//! Page fetching
//!
//! Implements a two-tier fetching strategy:
//! - Tier 1: headless browser render (chromiumoxide), capturing the DOM
//!   after scripts run, with non-essential resources blocked for latency
//! - Tier 2: plain HTTP GET (reqwest), the fallback when the browser tier
//!   fails for any reason
//!
//! Each fetch acquires and releases its own isolated browser instance, so
//! no session state bleeds between unrelated scans and nothing leaks on
//! navigation failure.

mod browser;

use crate::config::FetchConfig;
use crate::normalize::NormalizedUrl;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur during fetching
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    /// Terminal failure: both the browser render and the plain-HTTP GET
    /// failed. Not retried inline; the caller may offer a manual retry.
    #[error("Failed to fetch {url}: {reason}. Check URL validity or try again later.")]
    BothTiersFailed { url: String, reason: String },
}

/// Which tier produced the HTML
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTier {
    Browser,
    Http,
}

/// Result of a successful fetch
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    pub tier: FetchTier,
    pub fetch_duration: Duration,
}

/// Fetch statistics counters
#[derive(Debug, Default)]
pub struct FetchStats {
    total_fetches: AtomicU64,
    browser_successes: AtomicU64,
    fallback_successes: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time view of [`FetchStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchStatsSnapshot {
    pub total_fetches: u64,
    pub browser_successes: u64,
    pub fallback_successes: u64,
    pub failures: u64,
}

impl FetchStats {
    pub fn snapshot(&self) -> FetchStatsSnapshot {
        FetchStatsSnapshot {
            total_fetches: self.total_fetches.load(Ordering::Relaxed),
            browser_successes: self.browser_successes.load(Ordering::Relaxed),
            fallback_successes: self.fallback_successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Source of rendered page HTML. The scan coordinator depends on this
/// trait so tests can substitute a canned page source.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &NormalizedUrl) -> Result<FetchedPage, FetchError>;
}

/// Two-tier fetch engine
pub struct PageFetcher {
    http_client: reqwest::Client,
    config: FetchConfig,
    stats: FetchStats,
}

impl PageFetcher {
    /// Create a new fetcher
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fallback_timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            http_client,
            config,
            stats: FetchStats::default(),
        })
    }

    pub fn stats(&self) -> FetchStatsSnapshot {
        self.stats.snapshot()
    }

    async fn fetch_http(&self, url: &NormalizedUrl) -> Result<String, String> {
        let response = self
            .http_client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?;

        response.text().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch(&self, url: &NormalizedUrl) -> Result<FetchedPage, FetchError> {
        self.stats.total_fetches.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();

        // Tier 1: browser render
        if self.config.enable_browser {
            match browser::render_page(url.as_str(), &self.config).await {
                Ok(html) => {
                    self.stats.browser_successes.fetch_add(1, Ordering::Relaxed);
                    info!(url = %url, "Fetched via browser render");
                    return Ok(FetchedPage {
                        html,
                        tier: FetchTier::Browser,
                        fetch_duration: start.elapsed(),
                    });
                }
                Err(e) => {
                    warn!(url = %url, "Browser render failed: {} (falling back to HTTP)", e);
                }
            }
        }

        // Tier 2: plain HTTP GET
        match self.fetch_http(url).await {
            Ok(html) => {
                self.stats.fallback_successes.fetch_add(1, Ordering::Relaxed);
                info!(url = %url, "Fetched via HTTP fallback");
                Ok(FetchedPage {
                    html,
                    tier: FetchTier::Http,
                    fetch_duration: start.elapsed(),
                })
            }
            Err(reason) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                Err(FetchError::BothTiersFailed {
                    url: url.to_string(),
                    reason,
                })
            }
        }
    }
}
