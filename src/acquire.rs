//! Acquisition orchestration.
//!
//! One future per configured source runs fetch, extract and normalize. All of
//! them are awaited to settlement; a failed source contributes nothing and
//! never cancels the others. The combined list is then sorted newest first,
//! validated, deduplicated and handed to [`select`].
//!
//! ```text
//! sources ──► [fetch ─► extract ─► normalize] × N ──► sort ─► validate ─► dedupe ─► select
//! ```

use crate::config::{EngineConfig, SourceConfig, SourceKind};
use crate::dedup::dedupe;
use crate::error::Result;
use crate::extract::{extract_feed_entries, extract_page_entries};
use crate::models::NewsItem;
use crate::normalize::{normalize_feed_entry, normalize_page_entry};
use crate::select::{MAX_WINDOW_DAYS, select};
use crate::transport::{AttemptOutcome, Fetcher, PayloadKind, TransportResolver};
use crate::validate::{is_valid_article, rejection_reason};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

fn payload_kind(source: &SourceConfig) -> PayloadKind {
    if source.is_feed() {
        PayloadKind::Feed
    } else {
        PayloadKind::Page
    }
}

/// Extract and normalize one fetched document.
fn items_from_payload(payload: &str, source: &SourceConfig, now: DateTime<Utc>) -> Result<Vec<NewsItem>> {
    let items = match &source.kind {
        SourceKind::Feed { .. } => extract_feed_entries(payload)
            .into_iter()
            .enumerate()
            .map(|(i, raw)| normalize_feed_entry(raw, source, i, now))
            .collect(),
        SourceKind::Page { profile, .. } => extract_page_entries(payload, source, profile)?
            .into_iter()
            .enumerate()
            .map(|(i, raw)| normalize_page_entry(raw, source, i, now))
            .collect(),
    };
    Ok(items)
}

/// Fetch, extract and normalize a single source.
///
/// # Errors
///
/// Whatever the fetcher reports (usually [`NewsError::SourceExhausted`]) and
/// [`NewsError::Selector`] for a broken page profile.
///
/// [`NewsError::SourceExhausted`]: crate::error::NewsError::SourceExhausted
/// [`NewsError::Selector`]: crate::error::NewsError::Selector
#[instrument(level = "info", skip_all, fields(source = %source.name))]
pub async fn acquire_source<F: Fetcher>(
    fetcher: &F,
    source: &SourceConfig,
    now: DateTime<Utc>,
) -> Result<Vec<NewsItem>> {
    let payload = fetcher.fetch(source.fetch_url(), payload_kind(source)).await?;
    let items = items_from_payload(&payload, source, now)?;
    info!(items = items.len(), "Source acquired");
    Ok(items)
}

/// Run a full acquisition over `sources`.
///
/// Never fails: sources that error contribute zero items and an empty result
/// is replaced by fallback content during selection.
#[instrument(level = "info", skip_all, fields(sources = sources.len(), max_count = max_count, max_days_back = max_days_back))]
pub async fn acquire<F: Fetcher>(
    fetcher: &F,
    sources: &[SourceConfig],
    max_count: usize,
    max_days_back: u32,
) -> Vec<NewsItem> {
    let now = Utc::now();
    let results = join_all(sources.iter().map(|s| acquire_source(fetcher, s, now))).await;

    let mut items = Vec::new();
    for (source, result) in sources.iter().zip(results) {
        match result {
            Ok(found) => items.extend(found),
            Err(e) => warn!(source = %source.name, error = %e, "Source failed, contributing no items"),
        }
    }
    let fetched = items.len();

    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    let valid: Vec<NewsItem> = items
        .into_iter()
        .filter(|item| match rejection_reason(item) {
            None => true,
            Some(reason) => {
                debug!(source = %item.source, title = %item.title, %reason, "Rejected item");
                false
            }
        })
        .collect();
    let valid_count = valid.len();

    let unique = dedupe(valid);
    info!(fetched, valid = valid_count, unique = unique.len(), "Acquisition settled");
    select(unique, max_count, max_days_back, now)
}

/// Acquire with a loaded configuration, building the real transport chain.
pub async fn acquire_with_config(config: &EngineConfig, max_days_back: u32, max_count: usize) -> Vec<NewsItem> {
    let days = max_days_back.clamp(1, MAX_WINDOW_DAYS);
    match TransportResolver::new(config.relays.clone()) {
        Ok(resolver) => acquire(&resolver, &config.sources, max_count, days).await,
        Err(e) => {
            error!(error = %e, "Could not build the HTTP transport, serving fallback content");
            select(Vec::new(), max_count, days, Utc::now())
        }
    }
}

/// Default-configured entry point: built-in sources and relays.
///
/// `max_days_back` is clamped to 1..=7. Always returns; total failure yields
/// fallback content.
pub async fn acquire_news(max_days_back: u32, max_count: usize) -> Vec<NewsItem> {
    acquire_with_config(&EngineConfig::default(), max_days_back, max_count).await
}

/// Outcome of probing one source.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub name: String,
    pub url: String,
    pub success: bool,
    /// Transport that delivered the payload (`direct` or `relay:<name>`).
    pub transport: Option<String>,
    pub attempts: usize,
    pub items: usize,
    pub valid_items: usize,
    #[serde(with = "millis")]
    pub elapsed: Duration,
    pub error: Option<String>,
}

mod millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// Probe every source in turn and report what each one yields.
///
/// A source only counts as successful when it yields at least one item.
/// Sources are probed sequentially so the per-source timings are meaningful.
#[instrument(level = "info", skip_all, fields(sources = sources.len()))]
pub async fn probe_sources(resolver: &TransportResolver, sources: &[SourceConfig]) -> Vec<SourceReport> {
    let mut reports = Vec::with_capacity(sources.len());
    for source in sources {
        let t0 = Instant::now();
        let now = Utc::now();
        let (payload, attempts) = resolver.resolve(source.fetch_url(), payload_kind(source)).await;
        let transport = attempts
            .iter()
            .find(|a| matches!(a.outcome, AttemptOutcome::Payload { .. }))
            .map(|a| a.transport.to_string());

        let extracted = payload.and_then(|p| items_from_payload(&p, source, now));
        let report = match extracted {
            Ok(items) => SourceReport {
                name: source.name.clone(),
                url: source.fetch_url().to_string(),
                success: !items.is_empty(),
                transport,
                attempts: attempts.len(),
                items: items.len(),
                valid_items: items.iter().filter(|i| is_valid_article(i)).count(),
                elapsed: t0.elapsed(),
                error: items.is_empty().then(|| "no items found".to_string()),
            },
            Err(e) => SourceReport {
                name: source.name.clone(),
                url: source.fetch_url().to_string(),
                success: false,
                transport,
                attempts: attempts.len(),
                items: 0,
                valid_items: 0,
                elapsed: t0.elapsed(),
                error: Some(e.to_string()),
            },
        };
        info!(
            source = %report.name,
            success = report.success,
            items = report.items,
            valid = report.valid_items,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Probed source"
        );
        reports.push(report);
    }
    reports
}
