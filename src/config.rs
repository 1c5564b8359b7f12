//! Source and relay configuration.
//!
//! The engine is driven by a static table of [`SourceConfig`] entries and an
//! ordered list of relay transports. Both come either from the built-in
//! defaults below or from a YAML file passed on the command line:
//!
//! ```yaml
//! sources:
//!   - name: G1 Minas
//!     base_url: https://g1.globo.com
//!     kind:
//!       type: page
//!       url: https://g1.globo.com/mg/minas-gerais/
//!       profile:
//!         container: ".feed-post"
//!         title: ".feed-post-link"
//!         link: ".feed-post-link"
//!         image: ".feed-post-figure img"
//!   - name: Hacker News
//!     base_url: https://news.ycombinator.com
//!     kind:
//!       type: feed
//!       url: https://hnrss.org/frontpage
//! relays:
//!   - name: allorigins
//!     prefix: "https://api.allorigins.win/get?url="
//!     encoding: percent
//!     envelope: json_contents
//! ```
//!
//! Configuration is loaded once at startup and never mutated afterwards.

use crate::error::{NewsError, Result};
use crate::transport::{Relay, default_relays};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, instrument};
use url::Url;

/// How image `src` values found on a page are turned into absolute URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageUrlRule {
    /// `//host/x` gets `https:`, `/x` gets the base URL, absolute URLs pass through.
    #[default]
    Resolve,
    /// Use the attribute value untouched.
    AsIs,
}

/// Structural rules for locating article parts inside one portal's markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorProfile {
    pub container: String,
    pub title: String,
    pub link: String,
    pub image: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub image_rule: ImageUrlRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceKind {
    Feed { url: String },
    Page { url: String, profile: SelectorProfile },
}

/// One acquirable origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub location: Option<String>,
    pub kind: SourceKind,
}

impl SourceConfig {
    /// The URL actually fetched for this source.
    pub fn fetch_url(&self) -> &str {
        match &self.kind {
            SourceKind::Feed { url } => url,
            SourceKind::Page { url, .. } => url,
        }
    }

    pub fn is_feed(&self) -> bool {
        matches!(self.kind, SourceKind::Feed { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub sources: Vec<SourceConfig>,
    #[serde(default = "default_relays")]
    pub relays: Vec<Relay>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            relays: default_relays(),
        }
    }
}

impl EngineConfig {
    /// Check the invariants the rest of the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns [`NewsError::Config`] when there are no sources, a name is
    /// repeated or blank, or a relay has no prefix, and [`NewsError::InvalidUrl`]
    /// when a base or fetch URL is not an absolute URL.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(NewsError::Config("no sources configured".into()));
        }
        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(NewsError::Config("source with empty name".into()));
            }
            if !names.insert(source.name.as_str()) {
                return Err(NewsError::Config(format!(
                    "duplicate source name: {}",
                    source.name
                )));
            }
            Url::parse(&source.base_url)?;
            Url::parse(source.fetch_url())?;
        }
        if let Some(relay) = self.relays.iter().find(|r| r.prefix.trim().is_empty()) {
            return Err(NewsError::Config(format!(
                "relay {} has an empty prefix",
                relay.name
            )));
        }
        Ok(())
    }

    /// Sources whose name contains `needle`, ignoring case. `None` keeps all.
    pub fn sources_matching(&self, needle: Option<&str>) -> Vec<SourceConfig> {
        match needle.map(str::to_lowercase) {
            Some(needle) => self
                .sources
                .iter()
                .filter(|s| s.name.to_lowercase().contains(&needle))
                .cloned()
                .collect(),
            None => self.sources.clone(),
        }
    }
}

/// Load and validate an [`EngineConfig`] from a YAML file.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    let config = parse_config(&raw)?;
    info!(
        sources = config.sources.len(),
        relays = config.relays.len(),
        "Loaded engine configuration"
    );
    Ok(config)
}

/// Parse and validate an [`EngineConfig`] from YAML text.
pub fn parse_config(raw: &str) -> Result<EngineConfig> {
    let config: EngineConfig = serde_yaml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

fn page(
    name: &str,
    base_url: &str,
    url: &str,
    selectors: [&str; 4],
    date: &str,
    summary: &str,
) -> SourceConfig {
    let [container, title, link, image] = selectors;
    SourceConfig {
        name: name.to_string(),
        base_url: base_url.to_string(),
        location: Some("Belo Horizonte".to_string()),
        kind: SourceKind::Page {
            url: url.to_string(),
            profile: SelectorProfile {
                container: container.to_string(),
                title: title.to_string(),
                link: link.to_string(),
                image: image.to_string(),
                date: Some(date.to_string()),
                summary: Some(summary.to_string()),
                image_rule: ImageUrlRule::Resolve,
            },
        },
    }
}

fn feed(name: &str, base_url: &str, url: &str) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        base_url: base_url.to_string(),
        location: None,
        kind: SourceKind::Feed {
            url: url.to_string(),
        },
    }
}

/// The built-in source table: Belo Horizonte portals plus a few general feeds.
pub fn default_sources() -> Vec<SourceConfig> {
    vec![
        page(
            "G1 Minas",
            "https://g1.globo.com",
            "https://g1.globo.com/mg/minas-gerais/",
            [
                ".feed-post, .feed-post-body, .bastian-feed-item, .widget-post, .item-lista",
                ".feed-post-link, .feed-post-title, h2 a, .title-link, .bastian-title",
                ".feed-post-link, h2 a, .title-link, .bastian-title",
                ".feed-post-figure img, .bstn-fd-picture img, .widget-post img, .feed-media img",
            ],
            ".feed-post-datetime, time, .widget-time, .timestamp, [datetime], .date-time, .post-date",
            ".feed-post-subtitle, .summary, .widget-subtitle, .excerpt",
        ),
        page(
            "Portal Uai",
            "https://www.uai.com.br",
            "https://www.uai.com.br/app/cidades/belo-horizonte/",
            [
                ".card-news, .news-card, .item-news, article, .postitem, .post-item, .content-item",
                "h2 a, h3 a, .title a, .news-title a, .card-title a, .post-title a",
                "h2 a, h3 a, .title a, .news-title a, .card-title a, .post-title a",
                ".card-image img, .news-image img, .thumb img, article img, .post-thumb img",
            ],
            "time, .date, .news-date, .published, .post-date, .timestamp, [datetime], .publication-date",
            ".summary, .excerpt, .news-excerpt, .description, .post-excerpt",
        ),
        page(
            "Estado de Minas",
            "https://www.em.com.br",
            "https://www.em.com.br/",
            [
                "article, .thumb-listing__item, .listing__item, .news-item, .post-item, .content-item",
                "h2 a, h3 a, .title a, .headline a, .news-title a, .post-title a",
                "h2 a, h3 a, .title a, .headline a, .news-title a, .post-title a",
                "img[src*=\"/foto/\"], img[src*=\"/imagem/\"], .thumb img, .image img, .post-image img",
            ],
            "time, .date, .publish-date, [datetime], .published-date, .article-date, .timestamp",
            ".summary, .excerpt, .description, .post-excerpt",
        ),
        page(
            "O Tempo",
            "https://www.otempo.com.br",
            "https://www.otempo.com.br/cidades/belo-horizonte",
            [
                ".news-item, .card-news, article, .story-item, .post, .content-item, .item",
                "h2 a, h3 a, .title a, .headline a, .story-title a, .post-title a",
                "h2 a, h3 a, .title a, .headline a, .story-title a, .post-title a",
                ".story-image img, .news-image img, .card-img img, article img, .post-image img",
            ],
            "time, .date, .publish-date, .story-date, .published, [datetime], .timestamp, .article-date",
            ".summary, .excerpt, .story-excerpt, .description, .post-excerpt",
        ),
        feed(
            "CNN Internacional",
            "https://edition.cnn.com",
            "https://rss.cnn.com/rss/edition.rss",
        ),
        feed(
            "Reuters Top News",
            "https://reuters.com",
            "https://feeds.reuters.com/reuters/topNews",
        ),
        feed(
            "Hacker News",
            "https://news.ycombinator.com",
            "https://hnrss.org/frontpage",
        ),
    ]
}
