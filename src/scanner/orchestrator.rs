//! Scan orchestrator - end-to-end scan driver
//!
//! One scan runs as follows:
//! - Register a job and hand its id back to the caller
//! - Discover pages (single page, sitemap, or crawl fallback)
//! - Check pages one at a time, polling for cancellation between checks
//! - Persist the aggregate result, then retire the job

use crate::checker::{PageChecker, PageCheckerAdapter};
use crate::config::{Config, ScannerConfig};
use crate::discovery::{build_http_client, LinkCrawler, ProgressSink, SitemapResolver, TracingSink};
use crate::state::{JobHandle, JobRegistry, ScanId};
use crate::storage::{ResultStore, ScanResult, ScanStatus};
use crate::url::{normalize_url, site_origin};
use crate::ScoutError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

/// Parameters of one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// Start URL; the only page checked in single-page mode
    pub url: String,

    /// Accessibility standard to check against
    pub ruleset: String,

    /// Discover and check the whole site instead of one page
    pub full_scan: bool,

    /// Override of the configured discovery cap
    pub max_pages: Option<usize>,
}

impl ScanRequest {
    /// A single-page scan of `url`
    pub fn single_page(url: impl Into<String>, ruleset: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ruleset: ruleset.into(),
            full_scan: false,
            max_pages: None,
        }
    }

    /// A full-site scan starting at `url`
    pub fn full_site(url: impl Into<String>, ruleset: impl Into<String>) -> Self {
        Self {
            full_scan: true,
            ..Self::single_page(url, ruleset)
        }
    }
}

/// Drives scans from request to persisted result
pub struct ScanOrchestrator {
    registry: Arc<JobRegistry>,
    sitemaps: SitemapResolver,
    crawler: LinkCrawler,
    checker: PageCheckerAdapter,
    store: Arc<dyn ResultStore>,
    scanner: ScannerConfig,
    sink: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for ScanOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOrchestrator")
            .field("live_jobs", &self.registry.len())
            .field("checker", &self.checker)
            .field("scanner", &self.scanner)
            .finish()
    }
}

impl ScanOrchestrator {
    /// Creates an orchestrator with its own job registry
    ///
    /// Discovery fetches share one HTTP client bounded by the configured
    /// fetch timeout.
    pub fn new(
        config: &Config,
        checker: Arc<dyn PageChecker>,
        store: Arc<dyn ResultStore>,
    ) -> Result<Self, ScoutError> {
        let timeout = Duration::from_secs(config.scanner.fetch_timeout_secs);
        let client = build_http_client(&config.user_agent, timeout)?;

        Ok(Self {
            registry: Arc::new(JobRegistry::new()),
            sitemaps: SitemapResolver::new(client.clone()),
            crawler: LinkCrawler::new(client),
            checker: PageCheckerAdapter::new(checker, &config.checker),
            store,
            scanner: config.scanner.clone(),
            sink: Arc::new(TracingSink),
        })
    }

    /// Replaces the sink that receives discovery milestones
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Shares an existing job registry
    pub fn with_registry(mut self, registry: Arc<JobRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Registry of live jobs
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Store receiving finished scans
    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    /// Starts a scan in the background and returns its id immediately
    pub fn start_scan(self: &Arc<Self>, request: ScanRequest) -> ScanId {
        self.spawn_scan(request).0
    }

    /// Starts a scan in the background
    ///
    /// The join handle resolves after the result has been persisted and the
    /// job retired. Dropping it does not stop the scan.
    pub fn spawn_scan(self: &Arc<Self>, request: ScanRequest) -> (ScanId, JoinHandle<()>) {
        let job = self.registry.create();
        let id = job.id();

        tracing::info!(
            "Scan {} accepted: {} (ruleset {}, full scan: {})",
            id,
            request.url,
            request.ruleset,
            request.full_scan
        );

        let orchestrator = Arc::clone(self);
        let handle = tokio::spawn(async move { orchestrator.drive(job, request).await });

        (id, handle)
    }

    /// Runs a scan to its end, persists the outcome, and retires the job
    ///
    /// The scan itself runs in an inner task so that a panic anywhere in the
    /// pipeline still ends with a persisted `Failed` result.
    async fn drive(self: Arc<Self>, job: JobHandle, request: ScanRequest) {
        let id = job.id();
        let started = Utc::now();

        let worker = {
            let orchestrator = Arc::clone(&self);
            let job = job.clone();
            let request = request.clone();
            tokio::spawn(async move { orchestrator.run_scan(&job, &request, started).await })
        };

        let result = match worker.await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::error!("Scan {} failed: {}", id, e);
                self.failed_result(id, &request, started, e.to_string())
            }
            Err(e) => {
                tracing::error!("Scan {} aborted: {}", id, e);
                self.failed_result(id, &request, started, format!("scan task aborted: {}", e))
            }
        };

        tracing::info!(
            "Scan {} {}: {}/{} pages, {} errors, {} warnings, {} notices",
            id,
            result.status.to_db_string(),
            result.pages_scanned,
            result.total_pages,
            result.error_count,
            result.warning_count,
            result.notice_count
        );

        if let Err(e) = self.store.insert(&result) {
            tracing::error!("Failed to persist result of scan {}: {}", id, e);
        }

        self.registry.retire(&id);
    }

    fn failed_result(
        &self,
        id: ScanId,
        request: &ScanRequest,
        started: DateTime<Utc>,
        error: String,
    ) -> ScanResult {
        ScanResult::failed(
            id,
            request.url.clone(),
            request.ruleset.clone(),
            started,
            request.full_scan,
            error,
        )
    }

    async fn run_scan(
        &self,
        job: &JobHandle,
        request: &ScanRequest,
        started: DateTime<Utc>,
    ) -> Result<ScanResult, ScoutError> {
        let start_url = Url::parse(&request.url)?;

        let pages = self.discover_pages(job, &start_url, request).await?;
        job.set_total_pages(pages.len());
        self.sink.notify(&format!(
            "Scan {}: checking {} pages against {}",
            job.id(),
            pages.len(),
            request.ruleset
        ));

        let mut results = Vec::with_capacity(pages.len());
        // A cancel during discovery can leave nothing to check
        let mut stopped_early = pages.is_empty() && job.is_cancelled();

        for page in &pages {
            if job.is_cancelled() {
                stopped_early = true;
                break;
            }

            job.begin_page(page);
            tracing::debug!("Scan {}: checking {}", job.id(), page);

            match self.checker.check_page(page, &request.ruleset).await {
                Some(result) => results.push(result),
                None => tracing::debug!("Scan {}: no result for {}", job.id(), page),
            }

            job.finish_page();
        }

        let status = if stopped_early {
            tracing::info!(
                "Scan {} cancelled after {} of {} pages",
                job.id(),
                job.snapshot().scanned_count,
                pages.len()
            );
            ScanStatus::Cancelled
        } else {
            ScanStatus::Completed
        };

        Ok(ScanResult::aggregate(
            job.id(),
            request.url.clone(),
            request.ruleset.clone(),
            started,
            request.full_scan,
            status,
            pages.len(),
            results,
        ))
    }

    /// Produces the ordered, duplicate-free page set of a scan
    async fn discover_pages(
        &self,
        job: &JobHandle,
        start_url: &Url,
        request: &ScanRequest,
    ) -> Result<Vec<String>, ScoutError> {
        if !request.full_scan {
            return Ok(vec![start_url.to_string()]);
        }

        let max_pages = request.max_pages.unwrap_or(self.scanner.max_pages);
        let origin = site_origin(start_url)?;
        let sitemap_url = origin.join(&self.scanner.sitemap_path)?;

        self.sink
            .notify(&format!("Looking for a sitemap at {}", sitemap_url));
        let cancel = job.cancellation_token();
        let listed = self
            .sitemaps
            .resolve_bounded(sitemap_url.as_str(), max_pages, cancel, &*self.sink)
            .await;
        let pages = dedupe_pages(listed, max_pages);

        if !pages.is_empty() {
            self.sink
                .notify(&format!("Sitemap yielded {} pages", pages.len()));
            return Ok(pages);
        }

        if cancel.is_cancelled() {
            return Ok(pages);
        }

        self.sink.notify(&format!(
            "No pages found in sitemap, crawling from {}",
            start_url
        ));
        let crawled = self
            .crawler
            .crawl_bounded(start_url, max_pages, cancel, &*self.sink)
            .await;
        self.sink
            .notify(&format!("Crawl discovered {} pages", crawled.len()));

        Ok(crawled)
    }
}

/// Drops repeated and unparseable URLs, keeping first occurrences in order,
/// and caps the result at `max_pages`
///
/// URLs are compared by normalized form but returned as given.
pub fn dedupe_pages(urls: Vec<String>, max_pages: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut pages = Vec::new();

    for url in urls {
        if pages.len() >= max_pages {
            break;
        }
        match normalize_url(&url) {
            Ok(key) => {
                if seen.insert(key.to_string()) {
                    pages.push(url);
                }
            }
            Err(e) => tracing::debug!("Skipping listed URL {}: {}", url, e),
        }
    }

    pages
}
