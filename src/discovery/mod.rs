//! Site discovery: turning a start URL into the list of pages to check
//!
//! This module contains:
//! - HTTP fetching with outcome classification
//! - Sitemap and sitemap-index resolution
//! - Link-following crawl as the fallback strategy
//! - Progress sinks for discovery milestones

mod crawler;
mod fetcher;
mod parser;
mod progress;
mod sitemap;

pub use crawler::LinkCrawler;
pub use fetcher::{build_http_client, fetch_url, user_agent_string, FetchResult};
pub use parser::{extract_site_links, parse_sitemap, SitemapDocument};
pub use progress::{ProgressSink, TracingSink};
pub use sitemap::SitemapResolver;
