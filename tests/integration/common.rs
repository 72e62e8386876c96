//! Shared fixtures for the integration tests

use a11y_scout::checker::{CheckError, CheckOptions, Issue, IssueType, PageChecker};
use a11y_scout::config::{Config, UserAgentConfig};
use a11y_scout::storage::SqliteResultStore;
use a11y_scout::ScanOrchestrator;
use async_trait::async_trait;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with short timeouts
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.scanner.fetch_timeout_secs = 5;
    config.checker.timeout_secs = 5;
    config.user_agent = UserAgentConfig {
        crawler_name: "TestScanner".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    };
    config
}

/// Builds an orchestrator over an in-memory store
pub fn create_orchestrator(checker: Arc<dyn PageChecker>) -> Arc<ScanOrchestrator> {
    let store = Arc::new(SqliteResultStore::new_in_memory().expect("in-memory store"));
    Arc::new(
        ScanOrchestrator::new(&create_test_config(), checker, store).expect("orchestrator"),
    )
}

pub fn issue(kind: IssueType, code: &str) -> Issue {
    Issue {
        code: code.to_string(),
        issue_type: kind,
        message: format!("{} found", code),
        context: None,
        selector: None,
    }
}

/// Checker whose answer is computed from the page URL
pub struct FnChecker<F>(pub F);

#[async_trait]
impl<F> PageChecker for FnChecker<F>
where
    F: Fn(&str) -> Result<Vec<Issue>, CheckError> + Send + Sync,
{
    async fn check(&self, url: &str, _options: &CheckOptions) -> Result<Vec<Issue>, CheckError> {
        (self.0)(url)
    }
}

/// Wraps a closure as a checker
pub fn fn_checker<F>(f: F) -> Arc<dyn PageChecker>
where
    F: Fn(&str) -> Result<Vec<Issue>, CheckError> + Send + Sync + 'static,
{
    Arc::new(FnChecker(f))
}

/// Checker that finds nothing on any page
pub fn clean_checker() -> Arc<dyn PageChecker> {
    fn_checker(|_| Ok(Vec::new()))
}

/// Renders a `<urlset>` sitemap
pub fn urlset(urls: &[String]) -> String {
    let entries: String = urls
        .iter()
        .map(|u| format!("  <url><loc>{}</loc></url>\n", u))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</urlset>",
        entries
    )
}

/// Renders a `<sitemapindex>` document
pub fn sitemap_index(sitemaps: &[String]) -> String {
    let entries: String = sitemaps
        .iter()
        .map(|u| format!("  <sitemap><loc>{}</loc></sitemap>\n", u))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</sitemapindex>",
        entries
    )
}

/// Serves an XML document at `route`
pub async fn mount_xml(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "application/xml"),
        )
        .mount(server)
        .await;
}

/// Serves an HTML page at `route` linking to each of `links`
pub async fn mount_page(server: &MockServer, route: &str, links: &[&str]) {
    let anchors: String = links
        .iter()
        .map(|l| format!("<a href=\"{}\">link</a>\n", l))
        .collect();
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    "<html><head><title>{}</title></head><body>\n{}</body></html>",
                    route, anchors
                ))
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}
