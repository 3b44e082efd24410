//! Scan coordination
//!
//! The coordinator owns the pipeline components and drives a request end
//! to end: normalize → resolve tier → quota check → cached compute
//! (fetch → chunk → extract → merge) → snapshot. All request state flows
//! through the [`ScanRequest`] / [`ScanOutcome`] pair; nothing is ambient.

use crate::analysis::backend::ModelBackend;
use crate::analysis::{merge, AnalysisError, IssueExtractor, MergeError};
use crate::billing::{
    resolve_tier_with_retry, BillingError, QuotaLedger, Tier, TierResolver,
};
use crate::cache::{CacheKey, ScanCache, SnapshotStore};
use crate::chunking::HtmlSplitter;
use crate::config::Config;
use crate::export::{export, ExportError, ExportFormat};
use crate::fetch::{FetchError, PageSource};
use crate::normalize::{normalize, NormalizedUrl, UrlError};
use crate::simulator::{SimulationError, SimulationMode, Simulator};
use crate::types::{ContentHash, PersonaSimulation, Report, ScanMode, ScanOutcome, ScanRequest};
use crate::util::RetryPolicy;
use dashmap::DashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Typed scan pipeline failures. All of these are returned values, never
/// panics; the presentation layer renders them as messages.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    InvalidUrl(#[from] UrlError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error("Free scan limit reached. Upgrade for more.")]
    QuotaExceeded,
    #[error("Persona simulation requires a paid plan (current tier: {0})")]
    SimulationNotAllowed(Tier),
    #[error("Exports require a paid plan (current tier: {0})")]
    ExportNotAllowed(Tier),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Billing(#[from] BillingError),
}

/// Owns the pipeline and serves scan, simulation, and export requests
pub struct ScanCoordinator {
    fetcher: Arc<dyn PageSource>,
    extractor: IssueExtractor,
    splitter: HtmlSplitter,
    simulator: Simulator,
    cache: ScanCache,
    /// Completed simulations, keyed by HTML content identity and persona
    simulations: DashMap<(ContentHash, String), PersonaSimulation>,
    snapshots: SnapshotStore,
    quota: QuotaLedger,
    tier_resolver: Arc<dyn TierResolver>,
    tier_retry: RetryPolicy,
}

impl ScanCoordinator {
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn PageSource>,
        backend: Arc<dyn ModelBackend>,
        tier_resolver: Arc<dyn TierResolver>,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.storage.data_dir)?;

        Ok(Self {
            fetcher,
            extractor: IssueExtractor::new(Arc::clone(&backend), &config.analysis),
            splitter: HtmlSplitter::new(config.chunking.clone()),
            simulator: Simulator::new(backend, &config.simulator, &config.chunking),
            cache: ScanCache::new(),
            simulations: DashMap::new(),
            snapshots: SnapshotStore::open(&config.storage.data_dir)?,
            quota: QuotaLedger::open(&config.storage.data_dir, config.billing.free_scans_per_day)?,
            tier_resolver,
            tier_retry: RetryPolicy::new(
                config.billing.max_attempts,
                Duration::from_millis(config.billing.retry_base_delay_ms),
            ),
        })
    }

    /// Run one scan request.
    ///
    /// The (identity, normalized url, effective mode) triple keys the
    /// cache: equal keys are the same logical scan and share one pipeline
    /// run. A failed run leaves no cache entry and no quota charge.
    pub async fn run_scan(&self, request: &ScanRequest) -> Result<ScanOutcome, ScanError> {
        // Bad input fails before any fetch or cache activity
        let url = normalize(&request.raw_url)?;

        // Tier is re-resolved per scan; it can change out-of-band after a
        // payment
        let tier = resolve_tier_with_retry(
            self.tier_resolver.as_ref(),
            &request.identity,
            &self.tier_retry,
        )
        .await;

        if !self.quota.allows(&request.identity, tier) {
            return Err(ScanError::QuotaExceeded);
        }

        let mode = tier.effective_mode(request.mode);
        let key = CacheKey::new(request.identity.clone(), url.clone(), mode);
        info!(key = %key, tier = %tier, "Scan requested");

        let pending_warnings: Mutex<Vec<String>> = Mutex::new(Vec::new());
        let (report, cache_hit) = self
            .cache
            .get_or_compute(&key, || self.compute_scan(&url, mode, &pending_warnings))
            .await?;

        let mut warnings = pending_warnings
            .into_inner()
            .unwrap_or_else(|e| e.into_inner());

        if !cache_hit {
            if let Err(e) = self.snapshots.store(&request.identity, &report) {
                warn!("Failed to persist report snapshot: {}", e);
                warnings.push("The report could not be saved for later sessions.".to_string());
            }
            if let Err(e) = self.quota.record_scan(&request.identity) {
                warn!("Failed to record scan against quota: {}", e);
            }
        }

        Ok(ScanOutcome {
            report,
            cache_hit,
            warnings,
        })
    }

    /// The expensive pipeline body, run at most once per cache key
    async fn compute_scan(
        &self,
        url: &NormalizedUrl,
        mode: ScanMode,
        warnings_out: &Mutex<Vec<String>>,
    ) -> Result<Report, ScanError> {
        let page = self.fetcher.fetch(url).await?;

        let (analysis_html, truncated) = self.splitter.truncate_to_ceiling(&page.html);
        if truncated {
            warnings_out
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push("Content beyond the size ceiling was not analyzed.".to_string());
        }

        let chunks = self.splitter.split(analysis_html);
        let selected: Vec<_> = match mode {
            // Abbreviated depth: first chunk only
            ScanMode::Preview => chunks.into_iter().take(1).collect(),
            ScanMode::Full => chunks,
        };
        info!(url = %url, mode = %mode, chunks = selected.len(), "Analyzing page");

        let mut partials = Vec::with_capacity(selected.len());
        for (i, chunk) in selected.iter().enumerate() {
            if i > 0 {
                self.extractor.pause_between_chunks().await;
            }
            let result = self.extractor.extract(chunk).await;
            let failed = result.is_err();
            partials.push(result);
            // Nothing to salvage when the very first chunk fails; the
            // merge would abort anyway
            if failed && i == 0 {
                break;
            }
        }

        let merged = merge(partials, url.clone(), page.html, truncated)?;
        warnings_out
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(merged.warnings);

        Ok(merged.report)
    }

    /// Restore the identity's most recent report, if one was persisted
    pub fn last_report(&self, identity: &str) -> Option<Report> {
        self.snapshots.load(identity)
    }

    /// Run a persona simulation over previously fetched HTML. Gated to
    /// paid tiers.
    pub async fn run_simulation(
        &self,
        identity: &str,
        html: &str,
        persona_id: &str,
        mode: SimulationMode,
        cancel: &AtomicBool,
    ) -> Result<PersonaSimulation, ScanError> {
        let tier =
            resolve_tier_with_retry(self.tier_resolver.as_ref(), identity, &self.tier_retry).await;
        if !tier.allows_simulation() {
            return Err(ScanError::SimulationNotAllowed(tier));
        }

        let key = (ContentHash::compute(html), persona_id.to_string());
        if let Some(cached) = self.simulations.get(&key) {
            info!(persona_id, "Simulation served from cache");
            return Ok(cached.clone());
        }

        let simulation = self.simulator.simulate(html, persona_id, mode, cancel).await?;
        self.simulations.insert(key, simulation.clone());
        Ok(simulation)
    }

    /// Export a report as a byte-stream artifact. Gated to paid tiers.
    pub async fn export_report(
        &self,
        identity: &str,
        report: &Report,
        format: ExportFormat,
    ) -> Result<Vec<u8>, ScanError> {
        let tier =
            resolve_tier_with_retry(self.tier_resolver.as_ref(), identity, &self.tier_retry).await;
        if !tier.allows_export() {
            return Err(ScanError::ExportNotAllowed(tier));
        }

        Ok(export(report, format)?)
    }

    /// Create a checkout session URL for a plan upgrade
    pub async fn checkout_url(
        &self,
        identity: &str,
        price_id: &str,
    ) -> Result<String, ScanError> {
        Ok(self.tier_resolver.checkout_url(identity, price_id).await?)
    }

    pub fn personas(&self) -> &crate::simulator::PersonaLibrary {
        self.simulator.personas()
    }

    /// Drop a cached scan (explicit re-run override)
    pub fn invalidate(&self, identity: &str, url: &NormalizedUrl, mode: ScanMode) {
        self.cache
            .invalidate(&CacheKey::new(identity.to_string(), url.clone(), mode));
    }
}
