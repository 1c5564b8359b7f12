//! Small helpers used across the pipeline.
//!
//! - Char-boundary-safe truncation for logs and summaries
//! - Slugification for item identifiers
//! - File system validation for the JSON output directory

use crate::error::Result;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the dropped characters appended. Never splits a multi-byte character, which
/// matters for Portuguese headlines.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 chars)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

/// Keep at most `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Keep at most `max` characters of `s`, appending `...` when anything was cut.
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", truncate_chars(s, max))
    } else {
        s.to_string()
    }
}

/// Convert a source name to an identifier-friendly slug.
///
/// Lowercases, drops punctuation and collapses whitespace runs to a single
/// hyphen.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify("Estado de Minas"), "estado-de-minas");
/// assert_eq!(slugify("O'Reilly  Radar"), "oreilly-radar");
/// ```
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && !c.is_whitespace() && c != '-', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

const WRITE_CHECK_FILENAME: &str = ".newsreel-write-check";

/// Ensure the output directory exists and accepts writes.
///
/// Creates the directory if needed, then writes and removes a marker file. A
/// marker that cannot be removed is logged, not treated as failure.
///
/// # Errors
///
/// [`NewsError::Io`](crate::error::NewsError::Io) if the directory cannot be
/// created or written to.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<()> {
    fs::create_dir_all(path).await?;
    let marker = Path::new(path).join(WRITE_CHECK_FILENAME);
    fs::write(&marker, b"").await?;
    if let Err(e) = fs::remove_file(&marker).await {
        warn!(marker = %marker.display(), error = %e, "Could not remove write-check file");
    }
    info!("Output directory is writable");
    Ok(())
}
