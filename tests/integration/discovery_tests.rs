//! Sitemap resolution and link crawling against a mock site

use crate::common::{create_test_config, mount_page, mount_xml, sitemap_index, urlset};
use a11y_scout::discovery::{build_http_client, LinkCrawler, SitemapResolver};
use a11y_scout::normalize_url;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client() -> Client {
    build_http_client(&create_test_config().user_agent, Duration::from_secs(5))
        .expect("Failed to build client")
}

fn ignore(_: &str) {}

#[tokio::test]
async fn test_sitemap_urlset_in_document_order() {
    let server = MockServer::start().await;
    let base = server.uri();
    let pages: Vec<String> = ["/c", "/a", "/b"]
        .iter()
        .map(|p| format!("{}{}", base, p))
        .collect();
    mount_xml(&server, "/sitemap.xml", urlset(&pages)).await;

    let resolver = SitemapResolver::new(test_client());
    let resolved = resolver
        .resolve(&format!("{}/sitemap.xml", base), &ignore)
        .await;

    assert_eq!(resolved, pages);
}

#[tokio::test]
async fn test_sitemap_index_concatenates_in_index_order() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&[
            format!("{}/sitemap-posts.xml", base),
            format!("{}/sitemap-empty.xml", base),
            format!("{}/sitemap-pages.xml", base),
        ]),
    )
    .await;
    mount_xml(
        &server,
        "/sitemap-posts.xml",
        urlset(&[format!("{}/post-1", base), format!("{}/post-2", base)]),
    )
    .await;
    mount_xml(&server, "/sitemap-empty.xml", urlset(&[])).await;
    mount_xml(
        &server,
        "/sitemap-pages.xml",
        urlset(&[format!("{}/about", base)]),
    )
    .await;

    let resolver = SitemapResolver::new(test_client());
    let resolved = resolver
        .resolve(&format!("{}/sitemap.xml", base), &ignore)
        .await;

    assert_eq!(
        resolved,
        vec![
            format!("{}/post-1", base),
            format!("{}/post-2", base),
            format!("{}/about", base),
        ]
    );
}

#[tokio::test]
async fn test_nested_sitemap_indexes() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&[
            format!("{}/nested-index.xml", base),
            format!("{}/sitemap-last.xml", base),
        ]),
    )
    .await;
    mount_xml(
        &server,
        "/nested-index.xml",
        sitemap_index(&[format!("{}/sitemap-first.xml", base)]),
    )
    .await;
    mount_xml(
        &server,
        "/sitemap-first.xml",
        urlset(&[format!("{}/first", base)]),
    )
    .await;
    mount_xml(
        &server,
        "/sitemap-last.xml",
        urlset(&[format!("{}/last", base)]),
    )
    .await;

    let resolver = SitemapResolver::new(test_client());
    let resolved = resolver
        .resolve(&format!("{}/sitemap.xml", base), &ignore)
        .await;

    assert_eq!(
        resolved,
        vec![format!("{}/first", base), format!("{}/last", base)]
    );
}

#[tokio::test]
async fn test_cyclic_sitemap_index_terminates() {
    let server = MockServer::start().await;
    let base = server.uri();

    // The index lists itself and a second index that points back at it
    mount_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&[
            format!("{}/sitemap.xml", base),
            format!("{}/other-index.xml", base),
            format!("{}/sitemap-pages.xml", base),
        ]),
    )
    .await;
    mount_xml(
        &server,
        "/other-index.xml",
        sitemap_index(&[format!("{}/sitemap.xml", base)]),
    )
    .await;
    mount_xml(
        &server,
        "/sitemap-pages.xml",
        urlset(&[format!("{}/only-page", base)]),
    )
    .await;

    let resolver = SitemapResolver::new(test_client());
    let resolved = resolver
        .resolve(&format!("{}/sitemap.xml", base), &ignore)
        .await;

    assert_eq!(resolved, vec![format!("{}/only-page", base)]);
}

#[tokio::test]
async fn test_missing_and_malformed_sitemaps_yield_nothing() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("this is not xml at all"))
        .mount(&server)
        .await;

    let messages = Mutex::new(Vec::new());
    let sink = |m: &str| messages.lock().unwrap().push(m.to_string());

    let resolver = SitemapResolver::new(test_client());
    assert!(resolver
        .resolve(&format!("{}/missing.xml", base), &sink)
        .await
        .is_empty());
    assert!(resolver
        .resolve(&format!("{}/broken.xml", base), &sink)
        .await
        .is_empty());

    let messages = messages.lock().unwrap();
    assert!(messages.iter().any(|m| m.contains("HTTP 404")));
    assert!(messages.iter().any(|m| m.contains("not a sitemap")));
}

#[tokio::test]
async fn test_crawl_discovers_start_and_linked_pages() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", &["/page1", "/page2", "https://external.example/"]).await;
    mount_page(&server, "/page1", &[]).await;
    mount_page(&server, "/page2", &[]).await;

    let start = Url::parse(&base).unwrap();
    let crawled = LinkCrawler::new(test_client())
        .crawl(&start, 10, &ignore)
        .await;

    assert_eq!(
        crawled,
        vec![
            format!("{}/", base),
            format!("{}/page1", base),
            format!("{}/page2", base),
        ]
    );
}

#[tokio::test]
async fn test_crawl_is_breadth_first() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", &["/a", "/b"]).await;
    mount_page(&server, "/a", &["/a/deep"]).await;
    mount_page(&server, "/b", &[]).await;
    mount_page(&server, "/a/deep", &[]).await;

    let start = Url::parse(&base).unwrap();
    let crawled = LinkCrawler::new(test_client())
        .crawl(&start, 10, &ignore)
        .await;

    assert_eq!(
        crawled,
        vec![
            format!("{}/", base),
            format!("{}/a", base),
            format!("{}/b", base),
            format!("{}/a/deep", base),
        ]
    );
}

#[tokio::test]
async fn test_crawl_respects_bound_without_duplicates() {
    let server = MockServer::start().await;
    let base = server.uri();

    let links: Vec<String> = (0..20).map(|i| format!("/page-{}", i)).collect();
    let mut with_repeats: Vec<&str> = links.iter().map(String::as_str).collect();
    with_repeats.extend(["/page-0", "/page-0#section", "/page-1/", "/"]);
    mount_page(&server, "/", &with_repeats).await;
    for link in &links {
        mount_page(&server, link, &["/", "/page-0"]).await;
    }

    let start = Url::parse(&base).unwrap();
    let crawler = LinkCrawler::new(test_client());

    for max_pages in [1, 3, 5, 30] {
        let crawled = crawler.crawl(&start, max_pages, &ignore).await;
        assert!(crawled.len() <= max_pages);

        let keys: HashSet<String> = crawled
            .iter()
            .map(|u| normalize_url(u).unwrap().to_string())
            .collect();
        assert_eq!(keys.len(), crawled.len(), "duplicates in {:?}", crawled);
    }

    assert_eq!(crawler.crawl(&start, 30, &ignore).await.len(), 21);
    assert!(crawler.crawl(&start, 0, &ignore).await.is_empty());
}

#[tokio::test]
async fn test_crawl_continues_past_failed_pages() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", &["/broken", "/ok"]).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_page(&server, "/ok", &["/found-later"]).await;
    mount_page(&server, "/found-later", &[]).await;

    let messages = Mutex::new(Vec::new());
    let sink = |m: &str| messages.lock().unwrap().push(m.to_string());

    let start = Url::parse(&base).unwrap();
    let crawled = LinkCrawler::new(test_client())
        .crawl(&start, 10, &sink)
        .await;

    assert_eq!(crawled.len(), 4);
    assert!(crawled.contains(&format!("{}/broken", base)));
    assert!(crawled.contains(&format!("{}/found-later", base)));
    assert!(messages
        .lock()
        .unwrap()
        .iter()
        .any(|m| m.contains("/broken") && m.contains("HTTP 500")));
}

fn short_timeout_client() -> Client {
    build_http_client(&create_test_config().user_agent, Duration::from_secs(1))
        .expect("Failed to build client")
}

#[tokio::test]
async fn test_cdata_sitemap_entries_are_resolved() {
    let server = MockServer::start().await;
    let base = server.uri();
    let body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n\
           <url><loc><![CDATA[{0}/a]]></loc></url>\n\
           <url><loc><![CDATA[{0}/b]]></loc></url>\n\
         </urlset>",
        base
    );
    mount_xml(&server, "/sitemap.xml", body).await;

    let resolved = SitemapResolver::new(test_client())
        .resolve(&format!("{}/sitemap.xml", base), &ignore)
        .await;

    assert_eq!(resolved, vec![format!("{}/a", base), format!("{}/b", base)]);
}

#[tokio::test]
async fn test_slow_sitemap_times_out_and_yields_nothing() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(urlset(&[format!("{}/a", base)]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let messages = Mutex::new(Vec::new());
    let sink = |m: &str| messages.lock().unwrap().push(m.to_string());

    let resolved = SitemapResolver::new(short_timeout_client())
        .resolve(&format!("{}/sitemap.xml", base), &sink)
        .await;

    assert!(resolved.is_empty());
    assert!(messages
        .lock()
        .unwrap()
        .iter()
        .any(|m| m.contains("/sitemap.xml") && m.contains("Request timeout")));
}

#[tokio::test]
async fn test_slow_crawl_page_is_kept_without_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", &["/slow", "/fast"]).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><a href="/hidden">hidden</a></body></html>"#)
                .insert_header("content-type", "text/html")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/fast", &[]).await;
    mount_page(&server, "/hidden", &[]).await;

    let messages = Mutex::new(Vec::new());
    let sink = |m: &str| messages.lock().unwrap().push(m.to_string());

    let start = Url::parse(&base).unwrap();
    let crawled = LinkCrawler::new(short_timeout_client())
        .crawl(&start, 10, &sink)
        .await;

    assert_eq!(
        crawled,
        vec![
            format!("{}/", base),
            format!("{}/slow", base),
            format!("{}/fast", base),
        ]
    );
    assert!(messages
        .lock()
        .unwrap()
        .iter()
        .any(|m| m.contains("/slow") && m.contains("Request timeout")));
}

#[tokio::test]
async fn test_crawl_does_not_follow_links_after_off_site_redirect() {
    let site = MockServer::start().await;
    let elsewhere = MockServer::start().await;
    let base = site.uri();

    mount_page(&site, "/", &["/away"]).await;
    Mock::given(method("GET"))
        .and(path("/away"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/landing", elsewhere.uri()).as_str()),
        )
        .mount(&site)
        .await;
    mount_page(&elsewhere, "/landing", &["/secret"]).await;
    mount_page(&site, "/secret", &[]).await;

    let start = Url::parse(&base).unwrap();
    let crawled = LinkCrawler::new(test_client())
        .crawl(&start, 10, &ignore)
        .await;

    assert_eq!(crawled, vec![format!("{}/", base), format!("{}/away", base)]);
}

#[tokio::test]
async fn test_sitemap_expansion_stops_at_limit() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&[
            format!("{}/sitemap-1.xml", base),
            format!("{}/sitemap-2.xml", base),
        ]),
    )
    .await;
    mount_xml(
        &server,
        "/sitemap-1.xml",
        urlset(&[format!("{}/one", base), format!("{}/two", base)]),
    )
    .await;
    mount_xml(
        &server,
        "/sitemap-2.xml",
        urlset(&[format!("{}/three", base)]),
    )
    .await;

    let resolver = SitemapResolver::new(test_client());
    let sitemap = format!("{}/sitemap.xml", base);

    let bounded = resolver
        .resolve_bounded(&sitemap, 2, &CancellationToken::new(), &ignore)
        .await;
    assert_eq!(bounded, vec![format!("{}/one", base), format!("{}/two", base)]);

    let unbounded = resolver
        .resolve_bounded(&sitemap, 3, &CancellationToken::new(), &ignore)
        .await;
    assert_eq!(unbounded.len(), 3);
}

#[tokio::test]
async fn test_cancelled_discovery_returns_immediately() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_xml(&server, "/sitemap.xml", urlset(&[format!("{}/a", base)])).await;
    mount_page(&server, "/", &["/a"]).await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let resolved = SitemapResolver::new(test_client())
        .resolve_bounded(&format!("{}/sitemap.xml", base), 10, &cancel, &ignore)
        .await;
    assert!(resolved.is_empty());

    let start = Url::parse(&base).unwrap();
    let crawled = LinkCrawler::new(test_client())
        .crawl_bounded(&start, 10, &cancel, &ignore)
        .await;
    assert!(crawled.is_empty());
}
