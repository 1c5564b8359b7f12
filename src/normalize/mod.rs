//! Field normalization: raw extractor output to [`NewsItem`].
//!
//! Each submodule owns one field family:
//!
//! - [`dates`]: heuristic timestamp recovery under a recency window
//! - [`category`]: hint and keyword based category inference
//! - [`images`]: URL resolution, placeholder filtering, stock substitutes
//! - [`text`]: whitespace, markup and summary cleanup
//!
//! The two entry points differ in how much they trust the source. Feeds declare
//! dates and categories; scraped pages declare nothing, so their dates go
//! through the full heuristic cascade and may end up synthesized.

pub mod category;
pub mod dates;
pub mod images;
pub mod text;

use crate::config::SourceConfig;
use crate::models::{NewsItem, RawEntry};
use crate::utils::slugify;
use chrono::{DateTime, Utc};
use tracing::debug;

use self::category::infer_category;
use self::dates::{parse_feed_date, resolve_published};
use self::images::{is_placeholder, resolve_image_url, stock_image};
use self::text::{clean_text, extract_summary, strip_tags};

fn first_non_empty<'a>(candidates: &[&'a str]) -> &'a str {
    candidates
        .iter()
        .copied()
        .find(|s| !s.trim().is_empty())
        .unwrap_or("")
}

fn item_url(raw: &RawEntry, source: &SourceConfig) -> String {
    let link = raw.link.trim();
    if link.is_empty() {
        source.base_url.clone()
    } else {
        link.to_string()
    }
}

/// Normalize one feed entry.
///
/// `index` is the entry's position within its feed and becomes part of the id.
/// A missing or unparseable date becomes `now`.
pub fn normalize_feed_entry(
    raw: RawEntry,
    source: &SourceConfig,
    index: usize,
    now: DateTime<Utc>,
) -> NewsItem {
    let title = strip_tags(&raw.title);
    let body = first_non_empty(&[&raw.content, &raw.summary]);
    let content = strip_tags(body);
    let summary = extract_summary(first_non_empty(&[&raw.summary, &raw.content]), &title);
    let category = infer_category(&title, &summary, &raw.categories);

    let image_url = raw
        .image
        .as_deref()
        .and_then(|src| resolve_image_url(src, &source.base_url, Default::default()))
        .filter(|url| !is_placeholder(url))
        .unwrap_or_else(|| stock_image(&title, &summary, category));

    let published_at = raw
        .dates
        .iter()
        .find_map(|d| parse_feed_date(d, now))
        .unwrap_or(now);

    NewsItem {
        id: format!("rss-{}-{}", slugify(&source.name), index),
        url: item_url(&raw, source),
        title,
        summary,
        content,
        source: source.name.clone(),
        source_url: source.base_url.clone(),
        published_at,
        image_url: Some(image_url),
        category,
        location: source.location.clone(),
    }
}

/// Normalize one scraped page entry.
///
/// The extractor has already resolved the link and image against the source.
pub fn normalize_page_entry(
    raw: RawEntry,
    source: &SourceConfig,
    index: usize,
    now: DateTime<Utc>,
) -> NewsItem {
    let title = clean_text(&raw.title);
    let summary = clean_text(&raw.summary);
    let content = first_non_empty(&[&raw.content, &summary]).to_string();
    let category = infer_category(&title, &summary, &raw.categories);

    let (published_at, synthesized) = resolve_published(&raw.dates, now);
    if synthesized {
        debug!(
            source = %source.name,
            title = %title,
            candidates = raw.dates.len(),
            "No usable date, synthesized a recent one"
        );
    }

    let image_url = raw
        .image
        .clone()
        .unwrap_or_else(|| stock_image(&title, &summary, category));

    NewsItem {
        id: format!("scrape-{}-{}", slugify(&source.name), index),
        url: item_url(&raw, source),
        title,
        summary,
        content,
        source: source.name.clone(),
        source_url: source.base_url.clone(),
        published_at,
        image_url: Some(image_url),
        category,
        location: source.location.clone(),
    }
}
