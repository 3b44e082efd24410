//! Tag-safe splitting of HTML documents

use crate::config::ChunkingConfig;
use tracing::debug;

/// An ordered segment of the source HTML. Order is significant and is
/// preserved through analysis and merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlChunk {
    /// Zero-based position in the chunk sequence
    pub index: usize,
    pub content: String,
}

/// Splitter that closes chunks only where the running tag depth is zero,
/// so no chunk boundary can land inside an open tag.
pub struct HtmlSplitter {
    config: ChunkingConfig,
}

impl HtmlSplitter {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Split HTML into tag-safe chunks of at least `max_chunk_chars`
    /// characters each (a chunk closes at the first depth-zero point at or
    /// after the limit).
    ///
    /// Tag depth is tracked by counting `<` and `>` only; no well-formedness
    /// validation beyond bracket balance. If the depth never returns to zero
    /// (malformed HTML), the entire remainder becomes one oversized final
    /// chunk. Concatenating the chunks in order reproduces the input
    /// exactly.
    pub fn split(&self, html: &str) -> Vec<HtmlChunk> {
        let max_chars = self.config.max_chunk_chars;
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0usize;
        let mut tag_depth = 0i64;

        for ch in html.chars() {
            current.push(ch);
            current_chars += 1;
            match ch {
                '<' => tag_depth += 1,
                '>' => tag_depth -= 1,
                _ => {}
            }
            if current_chars >= max_chars && tag_depth == 0 {
                chunks.push(HtmlChunk {
                    index: chunks.len(),
                    content: std::mem::take(&mut current),
                });
                current_chars = 0;
            }
        }

        if !current.is_empty() {
            chunks.push(HtmlChunk {
                index: chunks.len(),
                content: current,
            });
        }

        debug!(chunks = chunks.len(), "Split HTML document");
        chunks
    }

    /// Apply the upstream size ceiling, returning the (possibly shortened)
    /// slice and whether anything was dropped. The cut lands on a char
    /// boundary. Callers must surface the flag; truncation is never
    /// silent.
    pub fn truncate_to_ceiling<'a>(&self, html: &'a str) -> (&'a str, bool) {
        let ceiling = self.config.ceiling_chars;
        match html.char_indices().nth(ceiling) {
            Some((byte_idx, _)) => (&html[..byte_idx], true),
            None => (html, false),
        }
    }
}
