//! Extractors turn fetched payloads into [`RawEntry`](crate::models::RawEntry) records.
//!
//! - [`feed`]: syndication documents (RSS 2.0, Atom, RDF, generic)
//! - [`page`]: portal HTML, located through a per-source selector profile

pub mod feed;
pub mod page;

pub use feed::extract_feed_entries;
pub use page::extract_page_entries;
