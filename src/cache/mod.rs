//! Scan result caching
//!
//! The in-process cache guarantees at most one expensive pipeline run per
//! (identity, url, mode) key: population is single-flight per key, reads
//! are lock-free after population, and a failed compute never leaves a
//! value behind. A secondary sled-backed snapshot store persists each
//! identity's most recent report across restarts.

mod snapshot;

pub use snapshot::SnapshotStore;

use crate::normalize::NormalizedUrl;
use crate::types::{Identity, Report, ScanMode};
use dashmap::DashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Composite scan identity: two requests with equal keys are the same
/// logical scan.
///
/// Structured fields with derived equality, not string concatenation, so
/// delimiter collisions between identity/url/mode cannot alias two
/// different scans.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub identity: Identity,
    pub url: NormalizedUrl,
    pub mode: ScanMode,
}

impl CacheKey {
    pub fn new(identity: impl Into<Identity>, url: NormalizedUrl, mode: ScanMode) -> Self {
        Self {
            identity: identity.into(),
            url,
            mode,
        }
    }
}

impl fmt::Display for CacheKey {
    /// Stable string rendering for logs and external correlation only;
    /// equality is structural.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.identity, self.url, self.mode)
    }
}

/// Process-scoped report cache with single-flight population
#[derive(Default)]
pub struct ScanCache {
    entries: DashMap<CacheKey, Arc<OnceCell<Arc<Report>>>>,
}

impl ScanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached report for `key`, or run `compute` to produce it.
    ///
    /// Concurrent callers for an unpopulated key trigger exactly one
    /// compute; all observe the same report. Returns the report and
    /// whether it came from cache. On compute failure the entry is
    /// dropped, so the key stays re-submittable and no failure
    /// masquerades as a cached success.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &CacheKey,
        compute: F,
    ) -> Result<(Arc<Report>, bool), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Report, E>>,
    {
        let cell = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let mut computed_here = false;
        let result = cell
            .get_or_try_init(|| {
                computed_here = true;
                async move { compute().await.map(Arc::new) }
            })
            .await;

        match result {
            Ok(report) => {
                if computed_here {
                    debug!(key = %key, "Scan cache populated");
                } else {
                    debug!(key = %key, "Scan cache hit");
                }
                Ok((Arc::clone(report), !computed_here))
            }
            Err(e) => {
                // Drop the empty cell so a later explicit retry recomputes
                self.entries.remove_if(key, |_, cell| cell.get().is_none());
                Err(e)
            }
        }
    }

    /// Look up without computing
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Report>> {
        self.entries
            .get(key)
            .and_then(|cell| cell.get().map(Arc::clone))
    }

    /// Drop a single key (explicit override path)
    pub fn invalidate(&self, key: &CacheKey) {
        self.entries.remove(key);
    }

    /// Drop everything
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
