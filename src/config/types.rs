use serde::Deserialize;

/// Main configuration structure for A11y-Scout
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scanner: ScannerConfig,
    pub checker: CheckerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Site discovery configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Maximum number of pages discovered for a full-site scan
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Timeout for every sitemap and crawl fetch (seconds)
    #[serde(rename = "fetch-timeout-secs")]
    pub fetch_timeout_secs: u64,

    /// Path of the sitemap relative to the site origin
    #[serde(rename = "sitemap-path")]
    pub sitemap_path: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            fetch_timeout_secs: 15,
            sitemap_path: "/sitemap.xml".to_string(),
        }
    }
}

/// Accessibility checker configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Executable invoked to check a single page
    pub command: String,

    /// Default ruleset when a scan request does not name one
    pub ruleset: String,

    /// Report warning-level issues
    #[serde(rename = "include-warnings")]
    pub include_warnings: bool,

    /// Report notice-level issues
    #[serde(rename = "include-notices")]
    pub include_notices: bool,

    /// Timeout for a single page check (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            command: "pa11y".to_string(),
            ruleset: "WCAG2AA".to_string(),
            include_warnings: true,
            include_notices: true,
            timeout_secs: 30,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the scanner
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the scanner
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the scanner
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for scanner-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "A11y-Scout".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/a11y-scout".to_string(),
            contact_email: "a11y@example.com".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file holding scan history
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./a11y-scout.db".to_string(),
        }
    }
}
