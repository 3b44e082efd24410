//! Persona simulation pipeline
//!
//! Independent of the issue-extraction pipeline but sharing its chunking
//! policy: the HTML is ceiling-truncated, split tag-safely, and narrated
//! one chunk at a time through a persona-conditioned model pass. Supports
//! cooperative cancellation between chunks.

mod personas;

pub use personas::{Persona, PersonaLibrary};

use crate::analysis::backend::{CompletionRequest, ModelBackend};
use crate::chunking::HtmlSplitter;
use crate::config::{ChunkingConfig, SimulatorConfig};
use crate::types::PersonaSimulation;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from the persona simulator; independent of scan errors
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Unknown persona: {0}")]
    UnknownPersona(String),
    /// The caller's cancel flag was raised between chunk iterations
    #[error("Simulation cancelled")]
    Cancelled,
    #[error("Failed to simulate experience: {0}")]
    ModelFailed(String),
}

/// Simulation depth. Abbreviated caps the chunk count and digests the
/// result; Full narrates every chunk verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationMode {
    Abbreviated,
    Full,
}

/// Persona simulation engine
pub struct Simulator {
    backend: Arc<dyn ModelBackend>,
    splitter: HtmlSplitter,
    library: PersonaLibrary,
    temperature: f32,
    chunk_pause: Duration,
    max_chunks_abbreviated: usize,
}

impl Simulator {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        config: &SimulatorConfig,
        chunking: &ChunkingConfig,
    ) -> Self {
        let library = PersonaLibrary::load(&config.personas_path);
        Self::with_library(backend, config, chunking, library)
    }

    pub fn with_library(
        backend: Arc<dyn ModelBackend>,
        config: &SimulatorConfig,
        chunking: &ChunkingConfig,
        library: PersonaLibrary,
    ) -> Self {
        Self {
            backend,
            splitter: HtmlSplitter::new(ChunkingConfig {
                max_chunk_chars: config.chunk_chars,
                ceiling_chars: chunking.ceiling_chars,
            }),
            library,
            temperature: config.temperature,
            chunk_pause: Duration::from_millis(config.chunk_pause_ms),
            max_chunks_abbreviated: config.max_chunks_abbreviated,
        }
    }

    pub fn personas(&self) -> &PersonaLibrary {
        &self.library
    }

    /// Narrate the page through a persona.
    ///
    /// `cancel` is checked between chunk iterations; raising it stops the
    /// run with [`SimulationError::Cancelled`] and the partial narrative is
    /// discarded by the caller.
    pub async fn simulate(
        &self,
        html: &str,
        persona_id: &str,
        mode: SimulationMode,
        cancel: &AtomicBool,
    ) -> Result<PersonaSimulation, SimulationError> {
        let persona = self
            .library
            .get(persona_id)
            .ok_or_else(|| SimulationError::UnknownPersona(persona_id.to_string()))?;

        let (html, truncated) = self.splitter.truncate_to_ceiling(html);
        if truncated {
            warn!(persona_id, "HTML truncated at size ceiling for simulation");
        }

        let mut chunks = self.splitter.split(html);
        if mode == SimulationMode::Abbreviated {
            chunks.truncate(self.max_chunks_abbreviated);
        }

        if chunks.is_empty() {
            return Ok(PersonaSimulation {
                persona_id: persona_id.to_string(),
                narrative: String::new(),
                chunk_count: 0,
            });
        }

        let system = format!(
            "{}\n\nOutput in structured Markdown as specified.",
            persona.prompt
        );

        let mut narratives = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                info!(persona_id, chunk = i, "Simulation cancelled by caller");
                return Err(SimulationError::Cancelled);
            }

            let narrative = self
                .backend
                .complete(CompletionRequest {
                    system: Some(&system),
                    user: &chunk.content,
                    temperature: self.temperature,
                    max_tokens: None,
                    json_output: false,
                })
                .await
                .map_err(|e| SimulationError::ModelFailed(e.to_string()))?;

            narratives.push(narrative);
            debug!(persona_id, "Simulated chunk {} of {}", i + 1, chunks.len());

            if i + 1 < chunks.len() {
                tokio::time::sleep(self.chunk_pause).await;
            }
        }

        let combined = narratives.join("\n\n");

        // Abbreviated runs end with a digest pass so the caller gets a
        // bounded summary instead of one narrative per chunk
        let narrative = if mode == SimulationMode::Abbreviated {
            self.digest(persona, &combined).await?
        } else {
            combined
        };

        Ok(PersonaSimulation {
            persona_id: persona_id.to_string(),
            narrative,
            chunk_count: chunks.len(),
        })
    }

    async fn digest(&self, persona: &Persona, combined: &str) -> Result<String, SimulationError> {
        let prompt = format!(
            "The following is a simulated browsing experience, described chunk by \
             chunk. Condense it into the top 5 accessibility issues this user would \
             face, in Markdown, most severe first.\n\n{}",
            combined
        );

        self.backend
            .complete(CompletionRequest {
                system: Some(&persona.prompt),
                user: &prompt,
                temperature: self.temperature,
                max_tokens: None,
                json_output: false,
            })
            .await
            .map_err(|e| SimulationError::ModelFailed(e.to_string()))
    }
}
