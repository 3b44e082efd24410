//! Persona simulator configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the persona simulation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Persona definitions file; built-in personas are used when missing
    /// or malformed
    pub personas_path: PathBuf,
    /// Characters per narrative chunk
    pub chunk_chars: usize,
    /// Chunk cap in abbreviated mode (bounds latency and cost)
    pub max_chunks_abbreviated: usize,
    /// Sampling temperature for narrative generation
    pub temperature: f32,
    /// Pause between chunk requests (milliseconds)
    pub chunk_pause_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            personas_path: PathBuf::from("personas.json"),
            chunk_chars: 3000,
            max_chunks_abbreviated: 10,
            temperature: 0.5,
            chunk_pause_ms: 1000,
        }
    }
}
