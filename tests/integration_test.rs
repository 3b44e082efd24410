//! Integration tests for a11yscan
//!
//! These tests drive the scan coordinator end to end against a scripted
//! model backend and a canned page source, plus the real HTTP fetch tier
//! against a local socket.

use a11yscan::{
    analysis::backend::{MockBackend, ModelBackend},
    billing::{FixedTierResolver, Tier},
    config::Config,
    fetch::{FetchError, FetchTier, FetchedPage, PageFetcher, PageSource},
    normalize::{normalize, NormalizedUrl},
    scan::{ScanCoordinator, ScanError},
    types::{ScanMode, ScanRequest, Severity},
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Page source serving fixed HTML, counting fetches
#[derive(Debug)]
struct StaticPageSource {
    html: String,
    fetches: AtomicUsize,
}

impl StaticPageSource {
    fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            fetches: AtomicUsize::new(0),
        }
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for StaticPageSource {
    async fn fetch(&self, _url: &NormalizedUrl) -> Result<FetchedPage, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(FetchedPage {
            html: self.html.clone(),
            tier: FetchTier::Http,
            fetch_duration: Duration::from_millis(1),
        })
    }
}

fn test_config(data_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = data_dir.to_path_buf();
    config.analysis.chunk_pause_ms = 1;
    config.analysis.retry_base_delay_ms = 1;
    config.billing.retry_base_delay_ms = 1;
    config
}

fn coordinator(
    config: &Config,
    source: Arc<StaticPageSource>,
    backend: Arc<MockBackend>,
    tier: Tier,
) -> ScanCoordinator {
    ScanCoordinator::new(
        config,
        source as Arc<dyn PageSource>,
        backend as Arc<dyn ModelBackend>,
        Arc::new(FixedTierResolver::with_default(tier)),
    )
    .unwrap()
}

/// Scenario A: a schemeless URL is normalized, one chunk is analyzed in
/// preview mode, and the merged report carries issues and an in-range
/// score.
#[tokio::test]
async fn scenario_a_preview_scan_of_schemeless_url() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    // Page with an unlabeled image so the static check fires
    let source = Arc::new(StaticPageSource::new(
        r#"<html><body><h1>Space</h1><img src="rocket.jpg"></body></html>"#,
    ));
    let backend = Arc::new(MockBackend::new());
    let coordinator = coordinator(&config, Arc::clone(&source), Arc::clone(&backend), Tier::Free);

    let request = ScanRequest::new("nasa.gov", "user@example.com", ScanMode::Preview);
    let outcome = coordinator.run_scan(&request).await.unwrap();

    assert_eq!(outcome.report.url, normalize("https://nasa.gov").unwrap());
    // Preview mode analyzed exactly one chunk
    assert_eq!(backend.calls(), 1);
    assert!(!outcome.report.issues.is_empty());
    assert!((0.0..=100.0).contains(&outcome.report.score));
    // The static missing-alt finding is present
    assert!(outcome
        .report
        .issues
        .iter()
        .any(|i| i.criterion == "1.1.1" && i.description.contains("without alt text")));
}

/// Scenario B: empty input is rejected before any fetch, and nothing is
/// cached.
#[tokio::test]
async fn scenario_b_empty_url_is_invalid() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let source = Arc::new(StaticPageSource::new("<p>never fetched</p>"));
    let backend = Arc::new(MockBackend::new());
    let coordinator = coordinator(&config, Arc::clone(&source), Arc::clone(&backend), Tier::Pro);

    let request = ScanRequest::new("", "user@example.com", ScanMode::Preview);
    let err = coordinator.run_scan(&request).await.unwrap_err();

    assert!(matches!(err, ScanError::InvalidUrl(_)));
    assert_eq!(source.fetch_count(), 0);
    assert_eq!(backend.calls(), 0);

    // The identity's next valid scan still computes fresh (no stray cache
    // entry was created)
    let ok = coordinator
        .run_scan(&ScanRequest::new("example.com", "user@example.com", ScanMode::Preview))
        .await
        .unwrap();
    assert!(!ok.cache_hit);
}

/// Scenario C: scanning the same URL twice in the same mode by the same
/// identity computes once; the second call is a value-equal cache hit with
/// no extra fetch or model traffic.
#[tokio::test]
async fn scenario_c_repeat_scan_is_a_cache_hit() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let source = Arc::new(StaticPageSource::new("<p>stable content</p>"));
    let backend = Arc::new(MockBackend::new());
    let coordinator = coordinator(&config, Arc::clone(&source), Arc::clone(&backend), Tier::Pro);

    let request = ScanRequest::new("nasa.gov", "user@example.com", ScanMode::Preview);
    let first = coordinator.run_scan(&request).await.unwrap();

    let fetches_after_first = source.fetch_count();
    let calls_after_first = backend.calls();

    // Equivalent spelling of the same URL routes to the same key
    let request2 = ScanRequest::new("https://nasa.gov", "user@example.com", ScanMode::Preview);
    let second = coordinator.run_scan(&request2).await.unwrap();

    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(*first.report, *second.report);
    assert_eq!(source.fetch_count(), fetches_after_first, "no second fetch");
    assert_eq!(backend.calls(), calls_after_first, "no second extraction");
}

/// Scenario D: a page whose only defect is an unlabeled image yields
/// exactly one synthesized criterion 1.1.1 issue at High severity.
#[tokio::test]
async fn scenario_d_static_alt_check_alone() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let source = Arc::new(StaticPageSource::new(
        r#"<html><body><img src="logo.png"></body></html>"#,
    ));
    // Model finds nothing
    let backend = Arc::new(MockBackend::with_script(vec![Ok(r#"{
        "issues": [],
        "score": 100,
        "disclaimer": "Automated scan",
        "summary": "No model-detected issues."
    }"#
    .to_string())]));
    let coordinator = coordinator(&config, Arc::clone(&source), Arc::clone(&backend), Tier::Pro);

    let request = ScanRequest::new("example.com", "user@example.com", ScanMode::Preview);
    let outcome = coordinator.run_scan(&request).await.unwrap();

    assert_eq!(outcome.report.issues.len(), 1);
    let issue = &outcome.report.issues[0];
    assert_eq!(issue.criterion, "1.1.1");
    assert_eq!(issue.severity, Severity::High);
}

/// Two concurrent requests for the same unpopulated key trigger exactly
/// one pipeline run; both callers observe the same report.
#[tokio::test]
async fn concurrent_same_key_scans_share_one_compute() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    let source = Arc::new(StaticPageSource::new("<p>contended page</p>"));
    let backend = Arc::new(MockBackend::new());
    let coordinator = Arc::new(coordinator(
        &config,
        Arc::clone(&source),
        Arc::clone(&backend),
        Tier::Pro,
    ));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let coordinator = Arc::clone(&coordinator);
        handles.push(tokio::spawn(async move {
            let request = ScanRequest::new("example.com", "user@example.com", ScanMode::Full);
            coordinator.run_scan(&request).await.unwrap()
        }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    assert_eq!(source.fetch_count(), 1, "single-flight violated");
    for outcome in &outcomes[1..] {
        assert_eq!(*outcome.report, *outcomes[0].report);
    }
}

/// Full mode analyzes every chunk; preview mode stops at the first.
#[tokio::test]
async fn full_mode_analyzes_all_chunks() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(tmp.path());
    config.chunking.max_chunk_chars = 10;
    // 30 chars → three chunks at this size
    let source = Arc::new(StaticPageSource::new("<p>aaaaaaaa</p><p>bbbbbbbb</p>"));
    let backend = Arc::new(MockBackend::new());
    let coordinator = coordinator(&config, Arc::clone(&source), Arc::clone(&backend), Tier::Pro);

    let request = ScanRequest::new("example.com", "full@example.com", ScanMode::Full);
    coordinator.run_scan(&request).await.unwrap();
    assert_eq!(backend.calls(), 3);

    let preview = ScanRequest::new("example.com", "preview@example.com", ScanMode::Preview);
    coordinator.run_scan(&preview).await.unwrap();
    assert_eq!(backend.calls(), 4, "preview adds exactly one model call");
}

/// When the browser tier is unavailable, a URL served over plain HTTP
/// still fetches successfully through the fallback tier.
#[tokio::test]
async fn http_fallback_fetches_when_browser_tier_unavailable() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let html = "<html><body><h1>served</h1></body></html>";
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                html.len(),
                html
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });

    let mut fetch_config = a11yscan::config::FetchConfig::default();
    fetch_config.enable_browser = false;
    fetch_config.fallback_timeout_secs = 5;
    let fetcher = PageFetcher::new(fetch_config).unwrap();

    let url = normalize(&format!("http://{}/", addr)).unwrap();
    let page = fetcher.fetch(&url).await.unwrap();

    assert_eq!(page.tier, FetchTier::Http);
    assert!(page.html.contains("served"));
}
