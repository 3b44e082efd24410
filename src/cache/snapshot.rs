//! Last-report snapshot persistence
//!
//! Sled-backed store of each identity's most recent report, used to
//! restore a user's results after a tier-upgrade redirect round trip.
//! Best-effort and not authoritative: load failures degrade to `None`.
//! Records carry an explicit schema version so cross-version behavior is
//! testable rather than an opaque blob gamble.

use crate::types::{Identity, Report};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Bump when the serialized report shape changes; older snapshots are
/// ignored on load.
const SNAPSHOT_VERSION: u32 = 1;

/// Versioned persisted record
#[derive(Debug, Serialize, Deserialize)]
struct ReportSnapshot {
    version: u32,
    identity: Identity,
    report: Report,
}

/// Store of the most recent report per identity (last-write-wins)
pub struct SnapshotStore {
    db: sled::Db,
}

impl SnapshotStore {
    /// Open or create the snapshot database under `data_dir`
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let db_path = data_dir.as_ref().join("snapshots.sled");
        let db = sled::open(&db_path)
            .with_context(|| format!("Failed to open snapshot database at {:?}", db_path))?;
        Ok(Self { db })
    }

    /// Persist `report` as the identity's latest snapshot
    pub fn store(&self, identity: &str, report: &Report) -> Result<()> {
        let snapshot = ReportSnapshot {
            version: SNAPSHOT_VERSION,
            identity: identity.to_string(),
            report: report.clone(),
        };
        let data = bincode::serialize(&snapshot)
            .with_context(|| format!("Failed to serialize snapshot for {}", identity))?;
        self.db
            .insert(identity.as_bytes(), data)
            .with_context(|| format!("Failed to store snapshot for {}", identity))?;
        self.db.flush().context("Failed to flush snapshot database")?;
        Ok(())
    }

    /// Load the identity's latest snapshot, if any.
    ///
    /// Read errors, undecodable records, and version mismatches all yield
    /// `None`; this store is a convenience, never a source of truth.
    pub fn load(&self, identity: &str) -> Option<Report> {
        let data = match self.db.get(identity.as_bytes()) {
            Ok(Some(data)) => data,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read snapshot for {}: {}", identity, e);
                return None;
            }
        };

        let snapshot: ReportSnapshot = match bincode::deserialize(&data) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to decode snapshot for {}: {}", identity, e);
                return None;
            }
        };

        if snapshot.version != SNAPSHOT_VERSION {
            warn!(
                "Ignoring snapshot for {} with schema version {} (current {})",
                identity, snapshot.version, SNAPSHOT_VERSION
            );
            return None;
        }

        Some(snapshot.report)
    }

    /// Remove an identity's snapshot
    pub fn remove(&self, identity: &str) -> Result<()> {
        self.db
            .remove(identity.as_bytes())
            .with_context(|| format!("Failed to remove snapshot for {}", identity))?;
        Ok(())
    }
}
