//! Sitemap resolution
//!
//! Expands a sitemap URL into the flat, ordered list of page URLs it
//! describes, following sitemap indexes depth-first.

use crate::discovery::fetcher::{fetch_url, FetchResult};
use crate::discovery::parser::{parse_sitemap, SitemapDocument};
use crate::discovery::progress::ProgressSink;
use crate::url::normalize_url;
use reqwest::Client;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

/// Resolves sitemaps and sitemap indexes into page URLs
#[derive(Debug, Clone)]
pub struct SitemapResolver {
    client: Client,
}

impl SitemapResolver {
    /// Creates a resolver that fetches through `client`
    ///
    /// The client's timeout bounds every sitemap fetch.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolves a sitemap into its page URLs
    ///
    /// Index entries are expanded in index order, so the output is the
    /// concatenation of each sub-sitemap's pages. A sitemap that cannot be
    /// fetched or parsed contributes nothing; this method never fails.
    /// A sitemap already expanded during this call is not fetched again,
    /// which stops indexes that reference themselves or each other.
    pub async fn resolve(&self, sitemap_url: &str, sink: &dyn ProgressSink) -> Vec<String> {
        self.resolve_bounded(sitemap_url, usize::MAX, &CancellationToken::new(), sink)
            .await
    }

    /// Like [`resolve`](Self::resolve), but stops expanding further sitemaps
    /// once `limit` distinct pages are listed or `cancel` fires
    ///
    /// A cancelled fetch contributes nothing. The sitemap being read when the
    /// limit is reached is kept whole, so the result may exceed `limit`.
    pub async fn resolve_bounded(
        &self,
        sitemap_url: &str,
        limit: usize,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Vec<String> {
        let mut pages = Vec::new();
        let mut distinct = HashSet::new();
        let mut expanded = HashSet::new();
        let mut pending = vec![sitemap_url.to_string()];

        while let Some(url) = pending.pop() {
            if distinct.len() >= limit {
                tracing::debug!("Sitemap page limit of {} reached", limit);
                break;
            }
            if cancel.is_cancelled() {
                sink.notify("Sitemap resolution cancelled");
                break;
            }

            let key = normalize_url(&url)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| url.clone());
            if !expanded.insert(key) {
                tracing::debug!("Sitemap {} already expanded, skipping", url);
                continue;
            }

            let document = tokio::select! {
                document = self.fetch_sitemap(&url, sink) => document,
                _ = cancel.cancelled() => continue,
            };

            match document {
                Some(SitemapDocument::UrlSet(urls)) => {
                    sink.notify(&format!("Sitemap {} lists {} pages", url, urls.len()));
                    for page in &urls {
                        if let Ok(key) = normalize_url(page) {
                            distinct.insert(key.to_string());
                        }
                    }
                    pages.extend(urls);
                }
                Some(SitemapDocument::Index(children)) => {
                    sink.notify(&format!(
                        "Sitemap index {} references {} sitemaps",
                        url,
                        children.len()
                    ));
                    // Reverse so the first child is expanded first
                    pending.extend(children.into_iter().rev());
                }
                Some(SitemapDocument::Unrecognized) => {
                    sink.notify(&format!("{} is not a sitemap, ignoring", url));
                }
                None => {}
            }
        }

        pages
    }

    async fn fetch_sitemap(&self, url: &str, sink: &dyn ProgressSink) -> Option<SitemapDocument> {
        tracing::debug!("Fetching sitemap: {}", url);

        match fetch_url(&self.client, url).await {
            FetchResult::Success { body, .. } => Some(parse_sitemap(&body)),
            failure => {
                let reason = failure.failure_reason().unwrap_or_default();
                sink.notify(&format!("Could not fetch sitemap {}: {}", url, reason));
                None
            }
        }
    }
}
