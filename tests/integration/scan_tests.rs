//! End-to-end scans: discovery, page checks, cancellation and persistence

use crate::common::{
    clean_checker, create_orchestrator, create_test_config, fn_checker, issue, mount_page,
    mount_xml, urlset,
};
use a11y_scout::api::{ProgressStatus, ScanIdRequest, ScanService, StartScanRequest};
use a11y_scout::checker::{CheckError, CheckOptions, Issue, IssueType, PageChecker};
use a11y_scout::storage::SqliteResultStore;
use a11y_scout::{JobRegistry, JobSnapshot, ScanId, ScanOrchestrator, ScanRequest, ScanStatus};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use wiremock::MockServer;

fn path_of(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_default()
}

/// Checker that cancels its own scan during the first check
struct CancellingChecker {
    registry: Arc<JobRegistry>,
    target: Mutex<Option<ScanId>>,
}

#[async_trait]
impl PageChecker for CancellingChecker {
    async fn check(&self, _url: &str, _options: &CheckOptions) -> Result<Vec<Issue>, CheckError> {
        if let Some(id) = self.target.lock().unwrap().take() {
            assert!(self.registry.cancel(&id));
        }
        Ok(vec![issue(IssueType::Error, "E")])
    }
}

/// Checker that records the live progress of its scan at every check
struct ObservingChecker {
    registry: Arc<JobRegistry>,
    target: Mutex<Option<ScanId>>,
    observed: Mutex<Vec<(String, JobSnapshot)>>,
}

#[async_trait]
impl PageChecker for ObservingChecker {
    async fn check(&self, url: &str, _options: &CheckOptions) -> Result<Vec<Issue>, CheckError> {
        let target = *self.target.lock().unwrap();
        if let Some(snapshot) = target.and_then(|id| self.registry.progress(&id)) {
            self.observed
                .lock()
                .unwrap()
                .push((url.to_string(), snapshot));
        }
        if url.ends_with("/fails") {
            return Err(CheckError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "net::ERR_CONNECTION_REFUSED".to_string(),
            });
        }
        Ok(Vec::new())
    }
}

/// Checker that blocks on pages named "slow" until released
struct GatedChecker {
    gate: Notify,
}

#[async_trait]
impl PageChecker for GatedChecker {
    async fn check(&self, url: &str, _options: &CheckOptions) -> Result<Vec<Issue>, CheckError> {
        if url.contains("slow") {
            self.gate.notified().await;
        }
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_full_scan_from_sitemap() {
    let server = MockServer::start().await;
    let base = server.uri();
    let pages: Vec<String> = ["/a", "/b", "/c"]
        .iter()
        .map(|p| format!("{}{}", base, p))
        .collect();
    mount_xml(&server, "/sitemap.xml", urlset(&pages)).await;

    let checker = fn_checker(|url| {
        Ok(match path_of(url).as_str() {
            "/a" => vec![issue(IssueType::Error, "E1")],
            "/b" => vec![
                issue(IssueType::Warning, "W1"),
                issue(IssueType::Warning, "W2"),
            ],
            _ => vec![issue(IssueType::Error, "E2"), issue(IssueType::Notice, "N1")],
        })
    });
    let orchestrator = create_orchestrator(checker);

    let (id, handle) = orchestrator.spawn_scan(ScanRequest::full_site(
        format!("{}/", base),
        "WCAG2AA",
    ));
    handle.await.unwrap();

    let result = orchestrator.store().find_by_id(&id).unwrap().unwrap();
    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.total_pages, 3);
    assert_eq!(result.pages_scanned, 3);
    assert_eq!(result.error_count, 2);
    assert_eq!(result.warning_count, 2);
    assert_eq!(result.notice_count, 1);
    assert!(result.full_scan);

    let scanned: Vec<&str> = result.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(scanned, pages.iter().map(String::as_str).collect::<Vec<_>>());

    let summed: usize = result.pages.iter().map(|p| p.error_count).sum();
    assert_eq!(summed, result.error_count);
}

#[tokio::test]
async fn test_full_scan_falls_back_to_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    // No sitemap is mounted, so /sitemap.xml is a 404
    mount_page(&server, "/", &["/page1", "/page2"]).await;
    mount_page(&server, "/page1", &[]).await;
    mount_page(&server, "/page2", &[]).await;

    let orchestrator = create_orchestrator(clean_checker());
    let mut request = ScanRequest::full_site(format!("{}/", base), "WCAG2AA");
    request.max_pages = Some(10);

    let (id, handle) = orchestrator.spawn_scan(request);
    handle.await.unwrap();

    let result = orchestrator.store().find_by_id(&id).unwrap().unwrap();
    assert_eq!(result.total_pages, 3);
    assert_eq!(result.pages_scanned, 3);
    assert_eq!(
        result.pages.iter().map(|p| p.url.clone()).collect::<Vec<_>>(),
        vec![
            format!("{}/", base),
            format!("{}/page1", base),
            format!("{}/page2", base),
        ]
    );
}

#[tokio::test]
async fn test_sitemap_pages_deduplicated_and_capped() {
    let server = MockServer::start().await;
    let base = server.uri();
    let mut listed: Vec<String> = (0..8).map(|i| format!("{}/p{}", base, i)).collect();
    listed.insert(1, format!("{}/p0/", base));
    listed.insert(2, format!("{}/p0#top", base));
    mount_xml(&server, "/sitemap.xml", urlset(&listed)).await;

    let orchestrator = create_orchestrator(clean_checker());
    let mut request = ScanRequest::full_site(format!("{}/", base), "WCAG2AA");
    request.max_pages = Some(4);

    let (id, handle) = orchestrator.spawn_scan(request);
    handle.await.unwrap();

    let result = orchestrator.store().find_by_id(&id).unwrap().unwrap();
    assert_eq!(result.total_pages, 4);
    assert_eq!(
        result.pages.iter().map(|p| p.url.clone()).collect::<Vec<_>>(),
        (0..4).map(|i| format!("{}/p{}", base, i)).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_single_page_scan_with_failing_checker() {
    let checker = fn_checker(|_| {
        Err(CheckError::Failed {
            status: "exit status: 1".to_string(),
            stderr: "net::ERR_NAME_NOT_RESOLVED".to_string(),
        })
    });
    let orchestrator = create_orchestrator(checker);

    let (id, handle) = orchestrator.spawn_scan(ScanRequest::single_page(
        "https://unreachable.invalid/",
        "WCAG2AA",
    ));
    handle.await.unwrap();

    let result = orchestrator.store().find_by_id(&id).unwrap().unwrap();
    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.total_pages, 1);
    assert_eq!(result.pages_scanned, 0);
    assert!(result.pages.is_empty());
    assert_eq!(result.error_count, 0);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_cancel_after_first_page() {
    let server = MockServer::start().await;
    let base = server.uri();
    let pages: Vec<String> = (1..=5).map(|i| format!("{}/page-{}", base, i)).collect();
    mount_xml(&server, "/sitemap.xml", urlset(&pages)).await;

    let registry = Arc::new(JobRegistry::new());
    let checker = Arc::new(CancellingChecker {
        registry: Arc::clone(&registry),
        target: Mutex::new(None),
    });
    let store = Arc::new(SqliteResultStore::new_in_memory().unwrap());
    let orchestrator = Arc::new(
        ScanOrchestrator::new(&create_test_config(), checker.clone(), store)
            .unwrap()
            .with_registry(Arc::clone(&registry)),
    );

    let (id, handle) = orchestrator.spawn_scan(ScanRequest::full_site(
        format!("{}/", base),
        "WCAG2AA",
    ));
    *checker.target.lock().unwrap() = Some(id);
    handle.await.unwrap();

    let result = orchestrator.store().find_by_id(&id).unwrap().unwrap();
    assert_eq!(result.status, ScanStatus::Cancelled);
    assert_eq!(result.total_pages, 5);
    assert_eq!(result.pages_scanned, 1);
    assert!(result.pages_scanned <= result.total_pages);
    assert_eq!(result.pages[0].url, pages[0]);

    assert!(registry.progress(&id).is_none());
    assert!(!registry.cancel(&id));
}

#[tokio::test]
async fn test_progress_is_monotonic_and_bounded() {
    let server = MockServer::start().await;
    let base = server.uri();
    let pages: Vec<String> = ["/one", "/fails", "/three", "/four"]
        .iter()
        .map(|p| format!("{}{}", base, p))
        .collect();
    mount_xml(&server, "/sitemap.xml", urlset(&pages)).await;

    let registry = Arc::new(JobRegistry::new());
    let checker = Arc::new(ObservingChecker {
        registry: Arc::clone(&registry),
        target: Mutex::new(None),
        observed: Mutex::new(Vec::new()),
    });
    let store = Arc::new(SqliteResultStore::new_in_memory().unwrap());
    let orchestrator = Arc::new(
        ScanOrchestrator::new(&create_test_config(), checker.clone(), store)
            .unwrap()
            .with_registry(Arc::clone(&registry)),
    );

    let (id, handle) = orchestrator.spawn_scan(ScanRequest::full_site(
        format!("{}/", base),
        "WCAG2AA",
    ));
    *checker.target.lock().unwrap() = Some(id);
    handle.await.unwrap();

    let observed = checker.observed.lock().unwrap();
    assert_eq!(observed.len(), 4);
    for (i, (url, snapshot)) in observed.iter().enumerate() {
        assert_eq!(snapshot.total_pages, 4);
        assert_eq!(snapshot.scanned_count, i);
        assert!(snapshot.scanned_count <= snapshot.total_pages);
        assert_eq!(snapshot.current_page.as_deref(), Some(url.as_str()));
    }

    // The failed page advanced progress but left no result
    let result = orchestrator.store().find_by_id(&id).unwrap().unwrap();
    assert_eq!(result.pages_scanned, 3);
    assert!(result.pages.iter().all(|p| !p.url.ends_with("/fails")));
}

#[tokio::test]
async fn test_scans_run_independently() {
    let checker = Arc::new(GatedChecker {
        gate: Notify::new(),
    });
    let store = Arc::new(SqliteResultStore::new_in_memory().unwrap());
    let orchestrator = Arc::new(
        ScanOrchestrator::new(&create_test_config(), checker.clone(), store).unwrap(),
    );

    let (slow_id, slow) =
        orchestrator.spawn_scan(ScanRequest::single_page("https://example.com/slow", "WCAG2AA"));
    let (fast_id, fast) =
        orchestrator.spawn_scan(ScanRequest::single_page("https://example.com/fast", "WCAG2AA"));

    fast.await.unwrap();
    assert!(orchestrator.store().find_by_id(&fast_id).unwrap().is_some());

    let live = orchestrator.registry().progress(&slow_id).unwrap();
    assert_eq!(live.total_pages, 1);
    assert_eq!(live.current_page.as_deref(), Some("https://example.com/slow"));

    checker.gate.notify_one();
    slow.await.unwrap();
    assert!(orchestrator.registry().is_empty());
    assert_eq!(orchestrator.store().count().unwrap(), 2);
}

#[tokio::test]
async fn test_service_reports_completed_scan() {
    let orchestrator = create_orchestrator(clean_checker());
    let service = ScanService::new(orchestrator, "WCAG2AA");

    let started = service.start_scan(StartScanRequest {
        url: Some("https://example.com/".to_string()),
        ruleset: Some("WCAG2A".to_string()),
        ..Default::default()
    });
    assert!(started.success);
    let scan_id = started.scan_id.unwrap();

    let mut progress = service.scan_progress(ScanIdRequest::new(scan_id.clone()));
    for _ in 0..200 {
        if !progress.is_live() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        progress = service.scan_progress(ScanIdRequest::new(scan_id.clone()));
    }

    assert!(progress.success);
    match progress.progress {
        ProgressStatus::Completed { results } => {
            assert_eq!(results.id.to_string(), scan_id);
            assert_eq!(results.ruleset, "WCAG2A");
            assert_eq!(results.pages_scanned, 1);
        }
        other => panic!("unexpected progress: {:?}", other),
    }

    // Finished scans can no longer be cancelled
    assert!(!service.cancel_scan(ScanIdRequest::new(scan_id.clone())).success);

    assert_eq!(service.history().data.len(), 1);
    assert_eq!(service.clear_history().deleted_count, 1);
    assert_eq!(service.clear_history().deleted_count, 0);
    assert_eq!(
        service.scan_progress(ScanIdRequest::new(scan_id)).status(),
        "not-found"
    );
}

#[tokio::test]
async fn test_cancel_during_discovery_stops_without_waiting_for_fetch() {
    let server = MockServer::start().await;
    let base = server.uri();
    wiremock::Mock::given(wiremock::matchers::path("/sitemap.xml"))
        .respond_with(
            wiremock::ResponseTemplate::new(200)
                .set_body_string(urlset(&[format!("{}/a", base)]))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let checks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&checks);
    let checker = fn_checker(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    });
    let orchestrator = create_orchestrator(checker);

    let started = Instant::now();
    let (id, handle) = orchestrator.spawn_scan(ScanRequest::full_site(
        format!("{}/", base),
        "WCAG2AA",
    ));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(orchestrator.registry().cancel(&id));
    handle.await.unwrap();

    // The sitemap fetch would only give up after the 5s client timeout
    assert!(started.elapsed() < Duration::from_secs(4));

    let result = orchestrator.store().find_by_id(&id).unwrap().unwrap();
    assert_eq!(result.status, ScanStatus::Cancelled);
    assert_eq!(result.pages_scanned, 0);
    assert_eq!(checks.load(Ordering::SeqCst), 0);
    assert!(orchestrator.registry().progress(&id).is_none());
}
