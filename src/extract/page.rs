//! Portal page extraction driven by a [`SelectorProfile`].
//!
//! Every element matching the profile's container selector is treated as one
//! candidate article. Titles, links, images and dates are each looked up
//! through a chain of progressively more generic strategies, since portal
//! markup changes without notice and the profile selectors go stale.
//!
//! A container that cannot produce a usable title is skipped; nothing a single
//! container does can abort the rest of the page.

use crate::config::{SelectorProfile, SourceConfig};
use crate::error::{NewsError, Result};
use crate::models::RawEntry;
use crate::normalize::images::{is_placeholder, resolve_image_url, resolve_link, strip_query};
use crate::normalize::text::clean_text;
use crate::utils::{truncate_chars, truncate_with_ellipsis};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

const MIN_TITLE_CHARS: usize = 10;
const CONTAINER_TITLE_CHARS: usize = 100;
const SUMMARY_CHARS: usize = 200;
const TITLE_SUMMARY_CHARS: usize = 100;

const IMAGE_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src", "data-original"];
const DATE_ATTRS: &[&str] = &["datetime", "data-date", "data-time"];

static ANY_IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

static COMMON_IMAGES: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        ".image img",
        ".foto img",
        ".picture img",
        ".thumb img",
        ".featured-image img",
        ".post-image img",
        ".article-image img",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

static BACKGROUND_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[style*="background-image"]"#).unwrap());
static BACKGROUND_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"background-image:\s*url\(['"]?([^'")]+)['"]?\)"#).unwrap());

static COMMON_DATES: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        ".date",
        ".published",
        ".publish-date",
        ".entry-date",
        ".post-date",
        ".news-date",
        ".article-date",
        ".timestamp",
        "[pubdate]",
        "time[datetime]",
        ".datetime",
        ".data",
        ".when",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

/// Date-looking fragments searched for in a container's raw markup.
static DATE_FRAGMENTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\d{1,2}/\d{1,2}/\d{4}(?:\s+\d{1,2}[:h]\d{2})?",
        r"\d{1,2}-\d{1,2}-\d{4}",
        r"\d{4}-\d{2}-\d{2}(?:T\d{2}:\d{2}(?::\d{2})?(?:Z|[+-]\d{2}:?\d{2})?)?",
        r"(?i)\d{1,2}\s+de\s+\w+\s+de\s+\d{4}",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// What one container produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerOutcome {
    Entry(RawEntry),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No title, or one shorter than the minimum.
    TitleTooShort(String),
}

/// A [`SelectorProfile`] with every selector parsed.
struct CompiledProfile {
    container: Selector,
    title: Selector,
    link: Selector,
    image: Selector,
    date: Option<Selector>,
    summary: Option<Selector>,
    profile: SelectorProfile,
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| NewsError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

impl CompiledProfile {
    fn new(profile: &SelectorProfile) -> Result<Self> {
        Ok(Self {
            container: compile(&profile.container)?,
            title: compile(&profile.title)?,
            link: compile(&profile.link)?,
            image: compile(&profile.image)?,
            date: profile.date.as_deref().map(compile).transpose()?,
            summary: profile.summary.as_deref().map(compile).transpose()?,
            profile: profile.clone(),
        })
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

fn first_attr(element: ElementRef<'_>, attrs: &[&str]) -> Option<String> {
    attrs
        .iter()
        .filter_map(|a| element.value().attr(a))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn extract_title(container: ElementRef<'_>, profile: &CompiledProfile) -> String {
    container
        .select(&profile.title)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| truncate_chars(&element_text(container), CONTAINER_TITLE_CHARS))
}

fn extract_link(container: ElementRef<'_>, profile: &CompiledProfile, base_url: &str) -> String {
    container
        .select(&profile.link)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(|href| resolve_link(href, base_url))
        .unwrap_or_default()
}

/// Raw image sources in the order they should be tried.
fn image_candidates(container: ElementRef<'_>, profile: &CompiledProfile) -> Vec<String> {
    let mut candidates: Vec<String> = std::iter::once(&profile.image)
        .chain(std::iter::once(&*ANY_IMG))
        .chain(COMMON_IMAGES.iter())
        .filter_map(|selector| container.select(selector).next())
        .filter_map(|img| first_attr(img, IMAGE_ATTRS))
        .collect();

    if let Some(style) = container
        .select(&BACKGROUND_IMAGE)
        .next()
        .and_then(|el| el.value().attr("style"))
    {
        if let Some(caps) = BACKGROUND_URL.captures(style) {
            candidates.push(caps[1].to_string());
        }
    }
    candidates
}

fn extract_image(container: ElementRef<'_>, profile: &CompiledProfile, base_url: &str) -> Option<String> {
    image_candidates(container, profile)
        .iter()
        .filter(|src| !src.starts_with("data:"))
        .filter_map(|src| resolve_image_url(src, base_url, profile.profile.image_rule))
        .map(|url| strip_query(&url).to_string())
        .find(|url| {
            let placeholder = is_placeholder(url);
            if placeholder {
                debug!(url = %url, "Discarding placeholder image");
            }
            !placeholder
        })
}

fn date_text(element: ElementRef<'_>) -> Option<String> {
    first_attr(element, DATE_ATTRS).or_else(|| Some(element_text(element)).filter(|t| !t.is_empty()))
}

/// Date candidates: profile selector, common date selectors, then markup regexes.
fn extract_dates(container: ElementRef<'_>, profile: &CompiledProfile) -> Vec<String> {
    let from_selectors = profile
        .date
        .iter()
        .chain(COMMON_DATES.iter())
        .filter_map(|selector| container.select(selector).next())
        .filter_map(date_text);

    let html = container.inner_html();
    let from_markup = DATE_FRAGMENTS
        .iter()
        .flat_map(|re| re.find_iter(&html).map(|m| m.as_str().to_string()).collect::<Vec<_>>());

    from_selectors.chain(from_markup).unique().collect()
}

fn extract_summary(container: ElementRef<'_>, profile: &CompiledProfile, title: &str) -> String {
    profile
        .summary
        .as_ref()
        .and_then(|selector| container.select(selector).next())
        .map(element_text)
        .filter(|s| !s.is_empty())
        .map(|s| truncate_chars(&s, SUMMARY_CHARS))
        .unwrap_or_else(|| truncate_with_ellipsis(title, TITLE_SUMMARY_CHARS))
}

fn extract_container(
    container: ElementRef<'_>,
    source: &SourceConfig,
    profile: &CompiledProfile,
) -> ContainerOutcome {
    let title = extract_title(container, profile);
    if title.chars().count() < MIN_TITLE_CHARS {
        return ContainerOutcome::Skipped(SkipReason::TitleTooShort(title));
    }

    let summary = extract_summary(container, profile, &title);
    ContainerOutcome::Entry(RawEntry {
        link: extract_link(container, profile, &source.base_url),
        image: extract_image(container, profile, &source.base_url),
        dates: extract_dates(container, profile),
        content: summary.clone(),
        summary,
        title,
        ..Default::default()
    })
}

/// Extract every candidate article from a portal page.
///
/// # Errors
///
/// Only [`NewsError::Selector`], when the profile holds a selector that does
/// not parse. Markup problems never fail extraction.
pub fn extract_page_entries(
    html: &str,
    source: &SourceConfig,
    profile: &SelectorProfile,
) -> Result<Vec<RawEntry>> {
    let compiled = CompiledProfile::new(profile)?;
    let document = Html::parse_document(html);

    let mut entries = Vec::new();
    let mut skipped = 0usize;
    for (index, container) in document.select(&compiled.container).enumerate() {
        match extract_container(container, source, &compiled) {
            ContainerOutcome::Entry(entry) => entries.push(entry),
            ContainerOutcome::Skipped(reason) => {
                skipped += 1;
                debug!(source = %source.name, index, ?reason, "Skipped container");
            }
        }
    }

    info!(
        source = %source.name,
        entries = entries.len(),
        skipped,
        "Extracted page entries"
    );
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImageUrlRule, SourceKind};

    fn profile() -> SelectorProfile {
        SelectorProfile {
            container: "article".to_string(),
            title: "h2 a".to_string(),
            link: "h2 a".to_string(),
            image: ".thumb img".to_string(),
            date: Some("time".to_string()),
            summary: Some(".excerpt".to_string()),
            image_rule: ImageUrlRule::Resolve,
        }
    }

    fn source() -> SourceConfig {
        SourceConfig {
            name: "Estado de Minas".to_string(),
            base_url: "https://www.em.com.br".to_string(),
            location: Some("Belo Horizonte".to_string()),
            kind: SourceKind::Page {
                url: "https://www.em.com.br/".to_string(),
                profile: profile(),
            },
        }
    }

    #[test]
    fn test_extracts_full_container() {
        let html = r#"<html><body>
<article>
  <div class="thumb"><img data-src="/foto/metro.jpg?w=300" src=""></div>
  <h2><a href="/gerais/2025/05/metro.html">Nova linha do metrô de Belo Horizonte é inaugurada</a></h2>
  <time datetime="2025-05-06T10:00:00-03:00">06/05/2025</time>
  <p class="excerpt">  Linha Verde conecta   a Pampulha ao centro. </p>
</article>
</body></html>"#;

        let entries = extract_page_entries(html, &source(), &profile()).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.title, "Nova linha do metrô de Belo Horizonte é inaugurada");
        assert_eq!(entry.link, "https://www.em.com.br/gerais/2025/05/metro.html");
        assert_eq!(entry.image.as_deref(), Some("https://www.em.com.br/foto/metro.jpg"));
        assert_eq!(entry.dates[0], "2025-05-06T10:00:00-03:00");
        assert_eq!(entry.summary, "Linha Verde conecta a Pampulha ao centro.");
    }

    #[test]
    fn test_short_titles_are_skipped() {
        let html = r#"<article><h2><a href="/a">Curto</a></h2></article>
<article><h2><a href="//cdn.em.com.br/b">Segunda matéria com título longo</a></h2></article>"#;

        let entries = extract_page_entries(html, &source(), &profile()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link, "https://cdn.em.com.br/b");
    }

    #[test]
    fn test_container_text_fallback_and_summary() {
        let long = "Texto solto ".repeat(15);
        let html = format!("<article><span>{}</span></article>", long);

        let entries = extract_page_entries(&html, &source(), &profile()).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.title.chars().count(), CONTAINER_TITLE_CHARS);
        assert!(entry.link.is_empty());
        assert_eq!(entry.summary, entry.title);
    }

    #[test]
    fn test_placeholder_images_fall_through() {
        let html = r#"<article>
  <h2><a href="noticia.html">Manchete com imagem de carregamento</a></h2>
  <div class="thumb"><img src="/img/loading.gif"></div>
  <div class="hero" style="background-image: url('https://cdn.em.com.br/foto/hero.jpg')"></div>
</article>"#;

        let entries = extract_page_entries(html, &source(), &profile()).unwrap();
        assert_eq!(entries[0].link, "https://www.em.com.br/noticia.html");
        assert_eq!(entries[0].image.as_deref(), Some("https://cdn.em.com.br/foto/hero.jpg"));
    }

    #[test]
    fn test_dates_from_markup() {
        let html = r#"<article>
  <h2><a href="/x">Chuva forte atinge a região metropolitana</a></h2>
  <span class="meta">Atualizado em 05/05/2025 14h30</span>
</article>"#;

        let entries = extract_page_entries(html, &source(), &profile()).unwrap();
        assert!(entries[0].dates.contains(&"05/05/2025 14h30".to_string()));
    }

    #[test]
    fn test_bad_selector_is_an_error() {
        let mut bad = profile();
        bad.container = "article[".to_string();
        let result = extract_page_entries("<article></article>", &source(), &bad);
        assert!(matches!(result, Err(NewsError::Selector { .. })));
    }
}
