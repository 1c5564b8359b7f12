//! # newsreel
//!
//! Acquires local news for an unattended rotation display. Scraped portals and
//! syndication feeds are fetched through a chain of transports, normalized into
//! one [`NewsItem`] shape, filtered for junk, deduplicated across sources and
//! cut down to a small, source-diverse selection that is never empty.
//!
//! ## Pipeline
//!
//! 1. **Transport**: [`transport::TransportResolver`] tries a direct fetch, then
//!    each public relay in order
//! 2. **Extraction**: [`extract`] turns feed XML or portal HTML into raw entries
//! 3. **Normalization**: [`normalize`] cleans text, resolves dates and images,
//!    and infers a category
//! 4. **Validation**: [`validate`] rejects navigation fragments, paywall
//!    prompts and error pages
//! 5. **Dedup and selection**: [`dedup`] and [`select`] pick what is shown,
//!    topped up from [`fallback`] when live sources come up short
//!
//! The entry point for callers is [`acquire_news`], which never fails.

pub mod acquire;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod models;
pub mod normalize;
pub mod outputs;
pub mod select;
pub mod transport;
pub mod utils;
pub mod validate;

pub use acquire::{acquire_news, acquire_with_config};
pub use error::{NewsError, Result};
pub use models::{Category, NewsItem, Rotation};
