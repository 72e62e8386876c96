//! Canonical page URLs, used as the key for duplicate detection

use crate::UrlError;
use url::Url;

/// Click identifiers appended by ad and mail platforms
const CLICK_ID_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Canonical form of `raw`, used to decide whether two URLs name the same page
///
/// Parsing already lowercases the host, drops default ports and resolves dot
/// segments. On top of that, empty path segments and the trailing slash are
/// dropped, the fragment is removed, and the query loses `utm_*` and click-id
/// parameters and is sorted. The scheme is kept, so a site served over plain
/// HTTP is scanned over HTTP.
///
/// ```
/// use a11y_scout::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM/docs//intro/?utm_source=x&b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs/intro?a=1&b=2");
/// ```
pub fn normalize_url(raw: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(raw).map_err(|e| UrlError::Parse(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(UrlError::InvalidScheme(format!(
                "expected http or https, got {}",
                other
            )))
        }
    }

    let path = canonical_path(url.path());
    url.set_path(&path);
    url.set_fragment(None);

    if url.query().is_some() {
        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        pairs.sort();

        if pairs.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }
    }

    Ok(url)
}

fn canonical_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || CLICK_ID_PARAMS.contains(&key)
}
