//! A11y-Scout: site-wide accessibility scan orchestration
//!
//! This crate discovers the pages of a website (sitemap first, link crawl as
//! fallback), runs an external accessibility checker against each page, tracks
//! live progress of every scan, honours cooperative cancellation, and persists
//! the aggregated result of each scan.

pub mod api;
pub mod checker;
pub mod config;
pub mod discovery;
pub mod output;
pub mod scanner;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for A11y-Scout operations
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

// Re-export commonly used types
pub use config::Config;
pub use scanner::{ScanOrchestrator, ScanRequest};
pub use state::{JobRegistry, JobSnapshot, ScanId};
pub use storage::{ScanResult, ScanStatus};
pub use url::{normalize_url, site_origin};
