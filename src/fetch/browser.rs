//! Headless browser rendering tier

use crate::config::FetchConfig;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, SetBlockedUrLsParams};
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors from the browser tier. Any of these triggers the HTTP fallback.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Browser config error: {0}")]
    Config(String),
    #[error("Browser error: {0}")]
    Cdp(#[from] CdpError),
    #[error("Navigation timed out")]
    Timeout,
}

/// Render a page in an isolated headless browser and return its serialized
/// DOM.
///
/// The whole browser instance lives for exactly this one fetch: launched
/// here, closed here, including on any failure path. Navigation waits for
/// the document to parse, not for network idle.
pub(crate) async fn render_page(url: &str, config: &FetchConfig) -> Result<String, RenderError> {
    let timeout = Duration::from_secs(config.navigation_timeout_secs);

    let browser_config = BrowserConfig::builder()
        .arg("--no-sandbox")
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage")
        .arg(format!("--user-agent={}", config.user_agent))
        .build()
        .map_err(RenderError::Config)?;

    let (mut browser, mut handler) = Browser::launch(browser_config).await?;
    let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

    let result = navigate_and_capture(&browser, url, config, timeout).await;

    // Teardown happens regardless of the navigation outcome
    if let Err(e) = browser.close().await {
        debug!("Browser close error: {}", e);
    }
    handler_task.abort();

    result
}

async fn navigate_and_capture(
    browser: &Browser,
    url: &str,
    config: &FetchConfig,
    timeout: Duration,
) -> Result<String, RenderError> {
    let page = tokio::time::timeout(timeout, browser.new_page("about:blank"))
        .await
        .map_err(|_| RenderError::Timeout)??;

    // Skip heavyweight sub-resources; only the document and scripts matter
    // for accessibility analysis
    if !config.blocked_resource_patterns.is_empty() {
        page.execute(EnableParams::default()).await?;
        page.execute(SetBlockedUrLsParams::new(
            config.blocked_resource_patterns.clone(),
        ))
        .await?;
    }

    tokio::time::timeout(timeout, page.goto(url))
        .await
        .map_err(|_| RenderError::Timeout)??;

    let html = tokio::time::timeout(timeout, page.content())
        .await
        .map_err(|_| RenderError::Timeout)??;

    if let Err(e) = page.close().await {
        debug!("Page close error: {}", e);
    }

    Ok(html)
}
