//! Model backend implementations
//!
//! The analyzer and the persona simulator both talk to a completion model
//! through the [`ModelBackend`] trait; the HTTP backend targets any
//! OpenAI-compatible chat completions API.

mod http;
mod mock;
mod traits;

pub use http::HttpBackend;
pub use mock::MockBackend;
pub use traits::{CompletionRequest, ModelBackend, ModelError, ModelResult};
