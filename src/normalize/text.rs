//! Text cleanup: whitespace, markup and summaries.

use crate::utils::truncate_chars;
use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;

pub const SUMMARY_MAX_CHARS: usize = 200;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());

/// Collapse every whitespace run to one space and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove markup and decode entities, leaving readable plain text.
pub fn strip_tags(html: &str) -> String {
    let without_tags = TAG.replace_all(html, " ");
    clean_text(&decode_html_entities(&without_tags))
}

/// Derive a display summary from a body of (possibly HTML) text.
///
/// Takes the first two sentences of the plain text, capped at
/// [`SUMMARY_MAX_CHARS`]. Falls back to the title when the body is empty.
pub fn extract_summary(content: &str, title: &str) -> String {
    let plain = strip_tags(content);
    if plain.is_empty() {
        return title.to_string();
    }

    let sentences: Vec<&str> = SENTENCE_END
        .split(&plain)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(2)
        .collect();
    if sentences.is_empty() {
        return title.to_string();
    }

    let summary = sentences.join(". ");
    if summary.chars().count() > SUMMARY_MAX_CHARS {
        format!("{}...", truncate_chars(&summary, SUMMARY_MAX_CHARS).trim_end())
    } else {
        format!("{}.", summary)
    }
}
