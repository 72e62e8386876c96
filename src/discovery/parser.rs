//! Document parsers for site discovery
//!
//! This module extracts:
//! - Same-site relative links from HTML pages (`<a href="/...">`)
//! - `<loc>` entries from XML sitemaps and sitemap indexes (`quick-xml`)

use crate::url::is_same_origin;
use quick_xml::events::Event;
use quick_xml::Reader;
use scraper::{Html, Selector};
use url::Url;

/// Parsed contents of a sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// A `<urlset>` listing page URLs
    UrlSet(Vec<String>),

    /// A `<sitemapindex>` listing further sitemaps
    Index(Vec<String>),

    /// Neither shape was found
    Unrecognized,
}

/// Extracts same-site links from an HTML page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="/...">` where the href is a root-relative path
///
/// **Exclude:**
/// - Absolute links, even when they point at the same host
/// - Protocol-relative links (`//host/path`)
/// - Document-relative links (`page`, `../page`) and fragments
/// - Links resolving outside the origin
///
/// Links are resolved against `origin` and returned with their fragment
/// removed, in document order. Duplicates are left for the caller to filter.
///
/// # Example
///
/// ```
/// use a11y_scout::discovery::extract_site_links;
/// use url::Url;
///
/// let html = r#"<a href="/about">About</a><a href="https://other.com/">Other</a>"#;
/// let origin = Url::parse("https://example.com/").unwrap();
/// let links = extract_site_links(html, &origin);
/// assert_eq!(links, vec!["https://example.com/about".to_string()]);
/// ```
pub fn extract_site_links(html: &str, origin: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(resolved) = resolve_site_link(href, origin) {
                    links.push(resolved);
                }
            }
        }
    }

    links
}

/// Resolves a root-relative href against the site origin
///
/// Returns None if the link should be excluded.
fn resolve_site_link(href: &str, origin: &Url) -> Option<String> {
    let href = href.trim();

    if !href.starts_with('/') || href.starts_with("//") {
        return None;
    }

    let mut resolved = origin.join(href).ok()?;
    if !is_same_origin(&resolved, origin) {
        return None;
    }

    resolved.set_fragment(None);
    Some(resolved.to_string())
}

/// Parses a sitemap or sitemap index
///
/// Only direct `<loc>` children of `<url>` / `<sitemap>` entries are read, so
/// extension elements such as `<image:loc>` are ignored. Element names are
/// matched on their local part, and CDATA sections inside `<loc>` count as
/// text. Entries are returned in document order with surrounding whitespace
/// trimmed. A document that turns malformed part way keeps the entries read
/// before the error.
pub fn parse_sitemap(xml: &str) -> SitemapDocument {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut root: Option<Vec<u8>> = None;
    let mut entries = Vec::new();
    let mut current_loc: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if path.is_empty() && root.is_none() {
                    root = Some(name.clone());
                }
                path.push(name);
                if is_entry_loc(&path) {
                    current_loc = Some(String::new());
                }
            }
            Ok(Event::End(_)) => {
                if is_entry_loc(&path) {
                    if let Some(loc) = current_loc.take() {
                        let loc = loc.trim();
                        if !loc.is_empty() {
                            entries.push(loc.to_string());
                        }
                    }
                }
                path.pop();
            }
            Ok(Event::Empty(e)) => {
                if path.is_empty() && root.is_none() {
                    root = Some(e.local_name().as_ref().to_vec());
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(loc) = current_loc.as_mut() {
                    match e.unescape() {
                        Ok(text) => loc.push_str(&text),
                        Err(_) => loc.push_str(&String::from_utf8_lossy(&e)),
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(loc) = current_loc.as_mut() {
                    loc.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(
                    "Sitemap XML error at byte {}: {}",
                    reader.buffer_position(),
                    e
                );
                break;
            }
        }
    }

    match root.as_deref() {
        Some(b"urlset") => SitemapDocument::UrlSet(entries),
        Some(b"sitemapindex") => SitemapDocument::Index(entries),
        _ => SitemapDocument::Unrecognized,
    }
}

/// True when `path` ends in `urlset/url/loc` or `sitemapindex/sitemap/loc`
/// directly under the document root
fn is_entry_loc(path: &[Vec<u8>]) -> bool {
    match path {
        [root, entry, loc] => {
            loc.as_slice() == b"loc"
                && matches!(
                    (root.as_slice(), entry.as_slice()),
                    (b"urlset", b"url") | (b"sitemapindex", b"sitemap")
                )
        }
        _ => false,
    }
}
