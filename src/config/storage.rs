//! Local storage configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the snapshot store and quota ledger live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".a11yscan"),
        }
    }
}
