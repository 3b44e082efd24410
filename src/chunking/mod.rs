//! HTML chunking
//!
//! Splits arbitrarily large documents into bounded-size segments whose
//! boundaries never fall inside an open tag, so each segment can be fed
//! to the analyzer independently.

mod splitter;

pub use splitter::{HtmlChunk, HtmlSplitter};
