//! Daily scan quota ledger
//!
//! Sled-backed per-identity, per-day scan counts. Only the Free tier is
//! capped; paid tiers scan without limit.

use super::Tier;
use anyhow::{Context, Result};
use sled::IVec;
use std::path::Path;
use tracing::warn;

/// Tracks how many scans each identity ran today
pub struct QuotaLedger {
    db: sled::Db,
    free_scans_per_day: u32,
}

impl QuotaLedger {
    /// Open or create the quota database under `data_dir`
    pub fn open(data_dir: impl AsRef<Path>, free_scans_per_day: u32) -> Result<Self> {
        let db_path = data_dir.as_ref().join("quota.sled");
        let db = sled::open(&db_path)
            .with_context(|| format!("Failed to open quota database at {:?}", db_path))?;
        Ok(Self {
            db,
            free_scans_per_day,
        })
    }

    /// Structured key: (identity, date) serialized together so neither
    /// field can collide with a delimiter in the other.
    fn key(identity: &str, date: &str) -> Vec<u8> {
        bincode::serialize(&(identity, date)).unwrap_or_else(|_| {
            // Serializing two strings cannot fail in practice; fall back to
            // a raw concatenation rather than panicking
            format!("{}\u{1f}{}", identity, date).into_bytes()
        })
    }

    fn today() -> String {
        chrono::Utc::now().date_naive().to_string()
    }

    fn read_count(&self, key: &[u8]) -> u32 {
        let decode = |data: IVec| -> Option<u32> { bincode::deserialize(&data).ok() };
        match self.db.get(key) {
            Ok(Some(data)) => decode(data).unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                warn!("Failed to read quota entry: {}", e);
                0
            }
        }
    }

    /// How many scans this identity ran today
    pub fn scans_today(&self, identity: &str) -> u32 {
        self.read_count(&Self::key(identity, &Self::today()))
    }

    /// Whether this identity may run another scan today
    pub fn allows(&self, identity: &str, tier: Tier) -> bool {
        tier.unlimited_scans() || self.scans_today(identity) < self.free_scans_per_day
    }

    /// Record one completed scan
    pub fn record_scan(&self, identity: &str) -> Result<()> {
        let key = Self::key(identity, &Self::today());
        let next = self.read_count(&key) + 1;
        let data = bincode::serialize(&next).context("Failed to serialize quota count")?;
        self.db
            .insert(key, data)
            .with_context(|| format!("Failed to record scan for {}", identity))?;
        Ok(())
    }
}
