//! Deterministic static analysis
//!
//! Non-AI checks that run against the complete, unchunked document, so
//! counts cannot be doubled or missed across chunk boundaries.

use crate::types::{Category, Issue, Severity};
use scraper::{Html, Selector};

/// Count `<img>` elements with a missing or empty `alt` attribute.
pub fn missing_alt_count(html: &str) -> usize {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("img") {
        Ok(s) => s,
        Err(_) => return 0,
    };

    document
        .select(&selector)
        .filter(|img| img.value().attr("alt").is_none_or(str::is_empty))
        .count()
}

/// Synthesize the missing-alt-text issue when the page has unlabeled
/// images. One issue covers all occurrences.
pub fn missing_alt_issue(html: &str) -> Option<Issue> {
    let count = missing_alt_count(html);
    if count == 0 {
        return None;
    }

    Some(Issue {
        criterion: "1.1.1".to_string(),
        description: format!("Found {} images without alt text.", count),
        severity: Severity::High,
        fix: "Add descriptive alt text to all images.".to_string(),
        code_fix: Some(r#"<img src="example.jpg" alt="Description of image">"#.to_string()),
        category: Category::Perceivable,
        confidence: 95,
    })
}
