//! Syndication feed extraction (RSS 2.0, Atom, RDF and anything item-shaped).
//!
//! Feeds in the wild are frequently broken: unbalanced tags, stray HTML,
//! bare ampersands, entities XML does not know about. The document is
//! therefore read into a small tolerant tree first. Bare `&` is escaped before
//! parsing, end tags that match no open element are ignored, unclosed elements
//! are closed at end of input, and a hard parse error keeps whatever was built
//! up to that point.
//!
//! Fields are read through ordered [`FieldPath`] lists. The first path that
//! yields a non-empty value wins, except for dates and categories where every
//! value is kept in order.

use crate::models::RawEntry;
use html_escape::decode_html_entities;
use itertools::Itertools;
use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::{Captures, Regex};
use std::borrow::Cow;
use tracing::{debug, warn};

pub const TITLE_UNAVAILABLE: &str = "title unavailable";

static EMBEDDED_IMG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img[^>]+src\s*=\s*["']([^"']+)["']"#).unwrap());

static CDATA_SECTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[.*?\]\]>").unwrap());
static AMPERSAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+;|#[xX][0-9a-fA-F]+;|[A-Za-z][A-Za-z0-9._-]*;)?").unwrap());

fn escape_segment(segment: &str) -> Cow<'_, str> {
    AMPERSAND.replace_all(segment, |caps: &Captures<'_>| match caps.get(1) {
        Some(_) => caps[0].to_string(),
        None => "&amp;".to_string(),
    })
}

/// Rewrite every `&` that does not start a reference as `&amp;`. CDATA
/// sections are left alone.
fn escape_bare_ampersands(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut last = 0;
    for cdata in CDATA_SECTION.find_iter(xml) {
        out.push_str(&escape_segment(&xml[last..cdata.start()]));
        out.push_str(cdata.as_str());
        last = cdata.end();
    }
    out.push_str(&escape_segment(&xml[last..]));
    out
}

/// Element of the tolerant document tree.
///
/// `text` is the element's character data with the text of closed children
/// spliced in where they occurred, so mixed content reads in document order.
#[derive(Debug, Clone, Default)]
struct XmlNode {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn from_start(start: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let attrs = start
            .attributes()
            .flatten()
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let value = decode_html_entities(&String::from_utf8_lossy(&attr.value)).into_owned();
                (key, value)
            })
            .collect();
        Self {
            name,
            attrs,
            ..Default::default()
        }
    }

    fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.is(name))
    }

    fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.is(name))
    }

    /// Every descendant named in `names`, in document order, not descending
    /// into matches.
    fn find_all<'a>(&'a self, names: &[&str], out: &mut Vec<&'a XmlNode>) {
        for child in &self.children {
            if names.iter().any(|name| child.is(name)) {
                out.push(child);
            } else {
                child.find_all(names, out);
            }
        }
    }
}

fn attach(stack: &mut [XmlNode], node: XmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.text.push_str(&node.text);
        parent.children.push(node);
    }
}

fn push_text(stack: &mut [XmlNode], text: &str) {
    if let Some(top) = stack.last_mut() {
        top.text.push_str(text);
    }
}

/// Close the innermost open element called `name`, and everything opened inside it.
fn close(stack: &mut Vec<XmlNode>, name: &str) {
    let Some(position) = stack.iter().skip(1).rposition(|n| n.is(name)) else {
        debug!(tag = name, "Ignoring stray end tag");
        return;
    };
    let target = position + 1;
    while stack.len() > target {
        if let Some(node) = stack.pop() {
            attach(stack, node);
        }
    }
}

fn parse_tree(xml: &str) -> XmlNode {
    let escaped = escape_bare_ampersands(xml);
    let mut reader = Reader::from_str(&escaped);
    reader.config_mut().check_end_names = false;

    let mut stack = vec![XmlNode::named("#document")];
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(XmlNode::from_start(&start)),
            Ok(Event::Empty(start)) => {
                let node = XmlNode::from_start(&start);
                attach(&mut stack, node);
            }
            Ok(Event::End(end)) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                close(&mut stack, &name);
            }
            Ok(Event::Text(text)) => {
                let raw = String::from_utf8_lossy(&text);
                push_text(&mut stack, &decode_html_entities(&raw));
            }
            Ok(Event::CData(data)) => push_text(&mut stack, &String::from_utf8_lossy(&data)),
            Ok(Event::GeneralRef(entity)) => {
                let entity = format!("&{};", String::from_utf8_lossy(&entity));
                push_text(&mut stack, &decode_html_entities(&entity));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(
                    error = %e,
                    position = reader.buffer_position(),
                    "Malformed feed XML, keeping the partial document"
                );
                break;
            }
        }
    }

    while stack.len() > 1 {
        if let Some(node) = stack.pop() {
            attach(&mut stack, node);
        }
    }
    stack.pop().unwrap_or_default()
}

/// Feed layout recognized by the dialect probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedDialect {
    Rss2,
    Atom,
    Rdf,
    /// No known root; items found by searching the whole document.
    Unknown,
}

fn probe_dialect(document: &XmlNode) -> (FeedDialect, Vec<&XmlNode>) {
    let rss: Vec<&XmlNode> = document
        .children_named("rss")
        .flat_map(|rss| rss.children_named("channel"))
        .flat_map(|channel| channel.children_named("item"))
        .collect();
    if !rss.is_empty() {
        return (FeedDialect::Rss2, rss);
    }

    let atom: Vec<&XmlNode> = document
        .children_named("feed")
        .flat_map(|feed| feed.children_named("entry"))
        .collect();
    if !atom.is_empty() {
        return (FeedDialect::Atom, atom);
    }

    let rdf: Vec<&XmlNode> = document
        .children_named("rdf:RDF")
        .flat_map(|rdf| rdf.children_named("item"))
        .collect();
    if !rdf.is_empty() {
        return (FeedDialect::Rdf, rdf);
    }

    let mut generic = Vec::new();
    document.find_all(&["item", "entry"], &mut generic);
    (FeedDialect::Unknown, generic)
}

/// One way of reading a field value off an entry node.
#[derive(Debug, Clone, Copy)]
enum FieldPath {
    /// Text of each child element with this name.
    Text(&'static str),
    /// Attribute of each child element with this name.
    ChildAttr(&'static str, &'static str),
    /// Attribute of the entry element itself.
    OwnAttr(&'static str),
    /// Text of a grandchild, e.g. `author/name`.
    Nested(&'static str, &'static str),
}

use FieldPath::*;

const TITLE: &[FieldPath] = &[Text("title"), OwnAttr("title")];
const LINK: &[FieldPath] = &[
    Text("link"),
    ChildAttr("link", "href"),
    Text("guid"),
    Text("id"),
    OwnAttr("rdf:about"),
];
const DATE: &[FieldPath] = &[
    Text("pubDate"),
    Text("published"),
    Text("updated"),
    Text("dc:date"),
    Text("date"),
];
const DESCRIPTION: &[FieldPath] = &[Text("description"), Text("summary"), Text("content")];
const CONTENT: &[FieldPath] = &[Text("content:encoded"), Text("content"), Text("description")];
const AUTHOR: &[FieldPath] = &[Text("dc:creator"), Nested("author", "name"), Text("author")];
const CATEGORY: &[FieldPath] = &[
    Text("category"),
    ChildAttr("category", "term"),
    Text("dc:subject"),
];
const MEDIA: &[FieldPath] = &[
    ChildAttr("media:content", "url"),
    ChildAttr("media:thumbnail", "url"),
];

impl FieldPath {
    fn values(self, node: &XmlNode) -> Vec<String> {
        let raw: Vec<String> = match self {
            Text(name) => node.children_named(name).map(|c| c.text.clone()).collect(),
            ChildAttr(name, attr) => node
                .children_named(name)
                .filter_map(|c| c.attr(attr))
                .map(str::to_string)
                .collect(),
            OwnAttr(attr) => node.attr(attr).map(str::to_string).into_iter().collect(),
            Nested(outer, inner) => node
                .children_named(outer)
                .filter_map(|c| c.child(inner))
                .map(|c| c.text.clone())
                .collect(),
        };
        raw.into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    }
}

fn first_value(node: &XmlNode, paths: &[FieldPath]) -> Option<String> {
    paths.iter().find_map(|p| p.values(node).into_iter().next())
}

fn all_values(node: &XmlNode, paths: &[FieldPath]) -> Vec<String> {
    paths
        .iter()
        .flat_map(|p| p.values(node))
        .unique()
        .collect()
}

fn entry_image(node: &XmlNode, summary: &str, content: &str) -> Option<String> {
    if let Some(url) = first_value(node, MEDIA) {
        return Some(url);
    }
    let enclosure = node
        .children_named("enclosure")
        .filter(|e| e.attr("type").is_none_or(|t| t.starts_with("image")))
        .find_map(|e| e.attr("url"))
        .map(str::to_string);
    if enclosure.is_some() {
        return enclosure;
    }
    if let Some(url) = first_value(node, &[Nested("image", "url")]) {
        return Some(url);
    }
    [summary, content]
        .iter()
        .find_map(|html| EMBEDDED_IMG.captures(html))
        .map(|caps| caps[1].to_string())
}

fn to_raw_entry(node: &XmlNode) -> RawEntry {
    let summary = first_value(node, DESCRIPTION).unwrap_or_default();
    let content = first_value(node, CONTENT).unwrap_or_default();
    let image = entry_image(node, &summary, &content);
    RawEntry {
        title: first_value(node, TITLE).unwrap_or_else(|| TITLE_UNAVAILABLE.to_string()),
        link: first_value(node, LINK).unwrap_or_default(),
        dates: all_values(node, DATE),
        author: first_value(node, AUTHOR).unwrap_or_default(),
        categories: all_values(node, CATEGORY),
        summary,
        content,
        image,
    }
}

/// Extract every entry of a feed document.
///
/// Never fails: a document with no recognizable entries, or no document at
/// all, yields an empty vector.
pub fn extract_feed_entries(xml: &str) -> Vec<RawEntry> {
    let document = parse_tree(xml);
    let (dialect, nodes) = probe_dialect(&document);
    debug!(?dialect, entries = nodes.len(), "Probed feed dialect");
    nodes.into_iter().map(to_raw_entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rss2_item() {
        let xml = "<rss><channel><item><title>Metro line opens</title>\
                   <link>https://x/1</link>\
                   <pubDate>Tue, 06 May 2025 10:00:00 GMT</pubDate>\
                   <description>Line 2</description></item></channel></rss>";

        let entries = extract_feed_entries(xml);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.title, "Metro line opens");
        assert_eq!(entry.link, "https://x/1");
        assert_eq!(entry.dates, vec!["Tue, 06 May 2025 10:00:00 GMT".to_string()]);
        assert_eq!(entry.summary, "Line 2");
        assert_eq!(entry.content, "Line 2");
        assert_eq!(entry.image, None);
    }

    #[test]
    fn test_atom_entry() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Blog</title>
  <entry>
    <title>Startup mineira capta investimento</title>
    <link rel="alternate" href="https://blog.example.com/post/1"/>
    <id>urn:uuid:1</id>
    <published>2025-05-06T10:00:00Z</published>
    <updated>2025-05-06T11:00:00Z</updated>
    <summary>Resumo curto</summary>
    <author><name>Ana Souza</name></author>
    <category term="Tecnologia"/>
  </entry>
</feed>"#;

        let document = parse_tree(xml);
        let (dialect, _) = probe_dialect(&document);
        assert_eq!(dialect, FeedDialect::Atom);

        let entries = extract_feed_entries(xml);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.link, "https://blog.example.com/post/1");
        assert_eq!(
            entry.dates,
            vec!["2025-05-06T10:00:00Z".to_string(), "2025-05-06T11:00:00Z".to_string()]
        );
        assert_eq!(entry.author, "Ana Souza");
        assert_eq!(entry.categories, vec!["Tecnologia".to_string()]);
        assert_eq!(entry.summary, "Resumo curto");
    }

    #[test]
    fn test_rdf_items_use_about_link() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                              xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel rdf:about="https://r.example.com/"><title>R</title></channel>
  <item rdf:about="https://r.example.com/1">
    <title>Primeira notícia do canal</title>
    <dc:date>2025-05-06T10:00:00Z</dc:date>
    <dc:creator>Redação</dc:creator>
    <dc:subject>Cultura</dc:subject>
  </item>
</rdf:RDF>"#;

        let document = parse_tree(xml);
        let (dialect, _) = probe_dialect(&document);
        assert_eq!(dialect, FeedDialect::Rdf);

        let entries = extract_feed_entries(xml);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link, "https://r.example.com/1");
        assert_eq!(entries[0].author, "Redação");
        assert_eq!(entries[0].categories, vec!["Cultura".to_string()]);
    }

    #[test]
    fn test_generic_search() {
        let xml = "<root><list><entry><title>Perdido</title></entry></list></root>";
        let document = parse_tree(xml);
        let (dialect, nodes) = probe_dialect(&document);
        assert_eq!(dialect, FeedDialect::Unknown);
        assert_eq!(nodes.len(), 1);
        assert_eq!(extract_feed_entries(xml)[0].title, "Perdido");
    }

    #[test]
    fn test_no_entries_is_empty() {
        assert!(extract_feed_entries("").is_empty());
        assert!(extract_feed_entries("<html><body>not a feed").is_empty());
        assert!(extract_feed_entries("<rss><channel></channel></rss>").is_empty());
    }

    #[test]
    fn test_missing_title_defaults() {
        let xml = "<rss><channel><item><link>https://x/2</link></item></channel></rss>";
        assert_eq!(extract_feed_entries(xml)[0].title, TITLE_UNAVAILABLE);
    }

    #[test]
    fn test_entities_and_cdata_image() {
        let xml = r#"<rss><channel><item>
  <title>Caf&#233; &amp; cultura</title>
  <description><![CDATA[<p><img src="https://img.example.com/1.jpg" /> Texto</p>]]></description>
  <category>Cultura</category>
  <category>Cultura</category>
</item></channel></rss>"#;

        let entry = &extract_feed_entries(xml)[0];
        assert_eq!(entry.title, "Café & cultura");
        assert_eq!(entry.image.as_deref(), Some("https://img.example.com/1.jpg"));
        assert_eq!(entry.categories, vec!["Cultura".to_string()]);
    }

    #[test]
    fn test_media_image_preferred() {
        let xml = r#"<rss xmlns:media="http://search.yahoo.com/mrss/"><channel><item>
  <title>Com imagem</title>
  <enclosure url="https://cdn.example.com/audio.mp3" type="audio/mpeg"/>
  <media:thumbnail url="https://cdn.example.com/thumb.jpg"/>
</item></channel></rss>"#;

        let entry = &extract_feed_entries(xml)[0];
        assert_eq!(entry.image.as_deref(), Some("https://cdn.example.com/thumb.jpg"));
    }

    #[test]
    fn test_mismatched_and_truncated_markup() {
        let xml = "<rss><channel>\
                   <item><title>Primeira <b>parte</title><link>https://x/1</link></i></item>\
                   <item><title>Segunda</title>";

        let entries = extract_feed_entries(xml);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Primeira parte");
        assert_eq!(entries[0].link, "https://x/1");
        assert_eq!(entries[1].title, "Segunda");
    }

    #[test]
    fn test_bare_ampersand_keeps_following_entries() {
        let xml = "<rss><channel>\
                   <item><title>AT&T anuncia investimento em Belo Horizonte</title>\
                   <link>https://x/1?a=1&b=2</link></item>\
                   <item><title>Segunda notícia do feed aqui</title><link>https://x/2</link></item>\
                   </channel></rss>";

        let entries = extract_feed_entries(xml);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "AT&T anuncia investimento em Belo Horizonte");
        assert_eq!(entries[0].link, "https://x/1?a=1&b=2");
        assert_eq!(entries[1].title, "Segunda notícia do feed aqui");
    }

    #[test]
    fn test_escaping_leaves_references_and_cdata() {
        assert_eq!(
            escape_bare_ampersands("Vale & Cia &amp; &#233; &#xE9; &nbsp;"),
            "Vale &amp; Cia &amp; &#233; &#xE9; &nbsp;"
        );
        assert_eq!(
            escape_bare_ampersands("<d><![CDATA[a & b]]> & c</d>"),
            "<d><![CDATA[a & b]]> &amp; c</d>"
        );
    }

    #[test]
    fn test_mixed_content_reads_in_order() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
  <title>Metro <b>line</b> opens today</title>
  <content type="xhtml"><div>Prefeitura de <a href="https://pbh.example.com">Belo Horizonte</a> anuncia obras.</div></content>
</entry></feed>"#;

        let entry = &extract_feed_entries(xml)[0];
        assert_eq!(entry.title, "Metro line opens today");
        assert_eq!(entry.content, "Prefeitura de Belo Horizonte anuncia obras.");
    }

    #[test]
    fn test_generic_search_collects_items_and_entries() {
        let xml = "<root>\
                   <entry><title>Primeira entrada</title></entry>\
                   <list><item><title>Item solto</title></item></list>\
                   </root>";

        let entries = extract_feed_entries(xml);
        let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Primeira entrada", "Item solto"]);
    }
}
