//! Data models shared by every stage of the acquisition pipeline.
//!
//! - [`RawEntry`]: what an extractor pulls out of one feed node or page container
//! - [`NewsItem`]: the normalized, display-ready unit handed to consumers
//! - [`Category`]: the canonical category labels
//! - [`Rotation`]: one acquisition run's output, as written to JSON
//!
//! `NewsItem` serializes camelCase because the display layer consumes it as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical category labels assigned by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Transport,
    Sports,
    Politics,
    Economy,
    Culture,
    Health,
    Technology,
    Environment,
    General,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Transport => "Transport",
            Category::Sports => "Sports",
            Category::Politics => "Politics",
            Category::Economy => "Economy",
            Category::Culture => "Culture",
            Category::Health => "Health",
            Category::Technology => "Technology",
            Category::Environment => "Environment",
            Category::General => "General",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An unnormalized article record, straight out of an extractor.
///
/// Lives only for the duration of one source's extraction pass. Every field is
/// raw text; nothing here has been validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub title: String,
    /// Already resolved to an absolute URL when the extractor could do so.
    pub link: String,
    /// Date candidates in the order they should be tried.
    pub dates: Vec<String>,
    pub summary: String,
    pub content: String,
    pub author: String,
    /// Category hints declared by the source (feed `<category>` tags).
    pub categories: Vec<String>,
    pub image: Option<String>,
}

/// A normalized news item, ready for validation, deduplication and display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    /// Unique within one run: `{kind}-{source-slug}-{sequence}`.
    pub id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    /// Display name of the source.
    pub source: String,
    /// Home URL of the source; an item linking here is not an article.
    pub source_url: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub image_url: Option<String>,
    pub category: Category,
    pub location: Option<String>,
}

/// The result of one acquisition run.
///
/// Each execution produces one `Rotation`, which the binary writes to JSON for
/// the display surface to pick up.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rotation {
    pub generated_at: DateTime<Utc>,
    pub max_days_back: u32,
    pub max_count: usize,
    pub items: Vec<NewsItem>,
}
