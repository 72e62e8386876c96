use crate::UrlError;
use url::{Position, Url};

/// Extracts the lowercase host from a URL
///
/// The host is the correlation key for a site's scan history.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use a11y_scout::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the origin of a URL as a root URL (`scheme://host[:port]/`)
///
/// # Examples
///
/// ```
/// use url::Url;
/// use a11y_scout::url::site_origin;
///
/// let url = Url::parse("https://example.com:8443/blog/post?id=1").unwrap();
/// assert_eq!(site_origin(&url).unwrap().as_str(), "https://example.com:8443/");
/// ```
pub fn site_origin(url: &Url) -> Result<Url, UrlError> {
    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Url::parse(&url[..Position::BeforePath]).map_err(|e| UrlError::Malformed(e.to_string()))
}

/// Returns true if both URLs share scheme, host, and port
pub fn is_same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}
