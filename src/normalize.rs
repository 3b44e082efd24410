//! URL normalization
//!
//! Canonicalizes free-text user input into an absolute, schemed URL. Pure:
//! no I/O, no side effects, and idempotent (normalizing an already
//! normalized URL is a no-op).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

/// Errors from URL normalization
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Invalid URL '{input}': {source}")]
    Unparseable {
        input: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid URL '{0}': no host specified")]
    MissingHost(String),
}

/// A URL guaranteed to carry a scheme and a non-empty host.
///
/// Only constructed through [`normalize`], so two equal `NormalizedUrl`s
/// always address the same page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a free-text URL string.
///
/// A schemeless input gets an `https://` prefix before parsing. Fails when
/// no host component is present after scheme insertion (empty input,
/// whitespace, or a scheme with no authority).
pub fn normalize(raw: &str) -> Result<NormalizedUrl, UrlError> {
    let trimmed = raw.trim();

    let parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        // No scheme at all: retry with the default prefix
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let prefixed = format!("https://{}", trimmed);
            Url::parse(&prefixed).map_err(|source| UrlError::Unparseable {
                input: trimmed.to_string(),
                source,
            })?
        }
        Err(source) => {
            return Err(UrlError::Unparseable {
                input: trimmed.to_string(),
                source,
            })
        }
    };

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(NormalizedUrl(parsed.to_string())),
        _ => Err(UrlError::MissingHost(trimmed.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepends_https_when_schemeless() {
        let url = normalize("nasa.gov").unwrap();
        assert_eq!(url.as_str(), "https://nasa.gov/");
    }

    #[test]
    fn schemeless_and_schemed_inputs_are_equivalent() {
        let a = normalize("nasa.gov").unwrap();
        let b = normalize("https://nasa.gov").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn idempotent() {
        for input in ["nasa.gov", "https://example.com/a/b?q=1", "  example.org/page  "] {
            let once = normalize(input).unwrap();
            let twice = normalize(once.as_str()).unwrap();
            assert_eq!(once, twice, "normalize must be idempotent for {input:?}");
        }
    }

    #[test]
    fn rejects_empty_input() {
        assert!(normalize("").is_err());
        assert!(normalize("   ").is_err());
    }

    #[test]
    fn rejects_scheme_without_host() {
        assert!(normalize("https://").is_err());
        // Parses as scheme "nasa.gov" with no authority
        assert!(normalize("nasa.gov:443").is_err());
    }

    #[test]
    fn preserves_path_and_query() {
        let url = normalize("example.com/path?x=1").unwrap();
        assert_eq!(url.as_str(), "https://example.com/path?x=1");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let url = normalize("  nasa.gov  ").unwrap();
        assert_eq!(url.as_str(), "https://nasa.gov/");
    }
}
