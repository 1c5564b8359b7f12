//! Final selection: recency window, fallback top-up and source diversity.
//!
//! The display must never go blank and should not fill every slot from one
//! outlet, so selection runs in fixed steps:
//!
//! 1. keep items inside the `max_days_back` window
//! 2. if that starves the display, widen the window one day at a time up to
//!    [`MAX_WINDOW_DAYS`], keeping a wider window only when it adds items
//! 3. top up with curated [`fallback_items`] when nothing survived, or when
//!    too few items survived from fewer than [`MIN_DISTINCT_SOURCES`] sources
//! 4. take one item per source in encounter order, then fill the remaining
//!    slots with whatever is left
//! 5. truncate to `max_count` and order newest first

use crate::fallback::fallback_items;
use crate::models::NewsItem;
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use std::collections::HashSet;
use tracing::{info, instrument};

pub const MAX_WINDOW_DAYS: u32 = 7;
pub const MIN_DISTINCT_SOURCES: usize = 2;

/// Items published no earlier than `days` days before `now`.
pub fn filter_by_days(items: &[NewsItem], days: u32, now: DateTime<Utc>) -> Vec<NewsItem> {
    let cutoff = now - Duration::days(i64::from(days));
    items
        .iter()
        .filter(|item| item.published_at >= cutoff)
        .cloned()
        .collect()
}

fn widen_window(items: &[NewsItem], max_count: usize, max_days_back: u32, now: DateTime<Utc>) -> Vec<NewsItem> {
    let mut best = filter_by_days(items, max_days_back, now);
    let mut days = max_days_back;
    while best.len() < max_count && days < MAX_WINDOW_DAYS {
        days += 1;
        let wider = filter_by_days(items, days, now);
        if wider.len() > best.len() {
            info!(days, before = best.len(), after = wider.len(), "Widened recency window");
            best = wider;
        }
    }
    best
}

fn distinct_sources(items: &[NewsItem]) -> usize {
    items.iter().map(|item| item.source.as_str()).unique().count()
}

fn top_up_with_fallback(mut items: Vec<NewsItem>, max_count: usize, now: DateTime<Utc>) -> Vec<NewsItem> {
    let starved = items.is_empty()
        || (items.len() < max_count && distinct_sources(&items) < MIN_DISTINCT_SOURCES);
    if !starved {
        return items;
    }
    let needed = max_count.saturating_sub(items.len());
    info!(live = items.len(), needed, "Topping up with fallback items");
    items.extend(fallback_items(now).into_iter().take(needed));
    items
}

fn diversify(items: Vec<NewsItem>, max_count: usize) -> Vec<NewsItem> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut picked = Vec::with_capacity(max_count);
    let mut rest = Vec::new();

    for item in items {
        if picked.len() < max_count && !seen.contains(&item.source) {
            seen.insert(item.source.clone());
            picked.push(item);
        } else {
            rest.push(item);
        }
    }

    let remaining = max_count.saturating_sub(picked.len());
    picked.extend(rest.into_iter().take(remaining));
    picked
}

/// Pick the items to display.
///
/// Always returns at most `max_count` items, newest first. With `max_count > 0`
/// the result is never empty.
#[instrument(level = "info", skip(items, now), fields(candidates = items.len()))]
pub fn select(items: Vec<NewsItem>, max_count: usize, max_days_back: u32, now: DateTime<Utc>) -> Vec<NewsItem> {
    if max_count == 0 {
        return Vec::new();
    }

    let recent = widen_window(&items, max_count, max_days_back, now);
    let pool = top_up_with_fallback(recent, max_count, now);
    let mut chosen = diversify(pool, max_count);
    chosen.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    info!(
        selected = chosen.len(),
        sources = distinct_sources(&chosen),
        "Selected items for rotation"
    );
    chosen
}
