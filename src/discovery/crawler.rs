//! Link-following crawl used when a site has no usable sitemap
//!
//! The frontier is a FIFO queue, so pages are discovered breadth-first from
//! the start URL. A URL is marked as seen when it is queued, and queuing stops
//! once `max_pages` URLs have been seen: every queued URL ends up in the
//! result, so the frontier never holds more than `max_pages` entries.

use crate::discovery::fetcher::{fetch_url, FetchResult};
use crate::discovery::parser::extract_site_links;
use crate::discovery::progress::ProgressSink;
use crate::url::{is_same_origin, normalize_url, site_origin};
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Breadth-first crawler over same-origin root-relative links
#[derive(Debug, Clone)]
pub struct LinkCrawler {
    client: Client,
}

impl LinkCrawler {
    /// Creates a crawler that fetches through `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Crawls from `start_url`, returning at most `max_pages` distinct URLs
    ///
    /// The start URL is always first. A page that fails to load is still
    /// part of the result but contributes no links; the failure is reported
    /// through `sink` and the crawl continues. The same holds for a page that
    /// redirects to another origin.
    pub async fn crawl(
        &self,
        start_url: &Url,
        max_pages: usize,
        sink: &dyn ProgressSink,
    ) -> Vec<String> {
        self.crawl_bounded(start_url, max_pages, &CancellationToken::new(), sink)
            .await
    }

    /// Like [`crawl`](Self::crawl), but stops as soon as `cancel` fires
    ///
    /// Pages already discovered are returned. An in-flight fetch is dropped.
    pub async fn crawl_bounded(
        &self,
        start_url: &Url,
        max_pages: usize,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Vec<String> {
        let mut pages = Vec::new();
        if max_pages == 0 {
            return pages;
        }

        let origin = match site_origin(start_url) {
            Ok(origin) => origin,
            Err(e) => {
                sink.notify(&format!("Cannot crawl {}: {}", start_url, e));
                return pages;
            }
        };

        let mut seen = HashSet::new();
        let mut frontier = VecDeque::new();
        if let Ok(key) = normalize_url(start_url.as_str()) {
            seen.insert(key.to_string());
        }
        frontier.push_back(start_url.to_string());

        sink.notify(&format!("Crawling {} for up to {} pages", origin, max_pages));

        while let Some(url) = frontier.pop_front() {
            if cancel.is_cancelled() {
                sink.notify("Crawl cancelled");
                break;
            }

            pages.push(url.clone());
            if pages.len() >= max_pages {
                break;
            }

            // Nothing more can be queued once the bound is reached
            if seen.len() >= max_pages {
                continue;
            }

            tracing::debug!("Crawling page: {}", url);
            let fetched = tokio::select! {
                fetched = fetch_url(&self.client, &url) => fetched,
                _ = cancel.cancelled() => {
                    sink.notify("Crawl cancelled");
                    break;
                }
            };

            let (body, base) = match fetched {
                FetchResult::Success {
                    body,
                    content_type,
                    final_url,
                    ..
                } if is_html(&content_type) => (body, final_url),
                FetchResult::Success { content_type, .. } => {
                    tracing::debug!("Not following links in {} ({})", url, content_type);
                    continue;
                }
                failure => {
                    let reason = failure.failure_reason().unwrap_or_default();
                    sink.notify(&format!("Failed to crawl {}: {}", url, reason));
                    continue;
                }
            };

            // Links of a page that redirected off-site belong to the other site
            let landed_on_site = Url::parse(&base)
                .map(|landed| is_same_origin(&landed, &origin))
                .unwrap_or(false);
            if !landed_on_site {
                tracing::debug!("{} redirected to {}, not following its links", url, base);
                continue;
            }

            for link in extract_site_links(&body, &origin) {
                if seen.len() >= max_pages {
                    break;
                }
                let Ok(key) = normalize_url(&link) else {
                    continue;
                };
                if seen.insert(key.to_string()) {
                    frontier.push_back(link);
                }
            }
        }

        sink.notify(&format!("Crawl discovered {} pages", pages.len()));
        pages
    }
}

fn is_html(content_type: &str) -> bool {
    content_type.is_empty() || content_type.contains("html")
}
