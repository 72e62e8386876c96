//! Storage module for persisting scan results
//!
//! This module handles:
//! - The aggregate `ScanResult` document persisted once per scan
//! - The `ResultStore` trait describing the document store
//! - A SQLite implementation with indexes on date and task

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteResultStore;
pub use traits::{ResultStore, StorageError, StorageResult};

use crate::checker::PageScanResult;
use crate::state::ScanId;
use crate::ScoutError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Opens (or creates) the scan history database
pub fn open_storage(path: &Path) -> Result<SqliteResultStore, ScoutError> {
    Ok(SqliteResultStore::new(path)?)
}

/// How a scan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// Every discovered page was attempted
    Completed,
    /// Cancellation stopped the scan early; results are partial
    Cancelled,
    /// An internal fault aborted the scan
    Failed,
}

impl ScanStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Aggregate outcome of one scan, persisted as a single document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub id: ScanId,
    /// Start URL of the scan
    pub url: String,
    pub ruleset: String,
    /// When the scan started
    pub date: DateTime<Utc>,
    pub full_scan: bool,
    pub status: ScanStatus,
    /// Pages discovered for this scan
    pub total_pages: usize,
    /// Pages with a recorded result
    pub pages_scanned: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub notice_count: usize,
    /// Per-page results in discovery order
    pub pages: Vec<PageScanResult>,
    /// Failure description for `Failed` scans
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResult {
    /// Folds page results into an aggregate, summing issue counts
    #[allow(clippy::too_many_arguments)]
    pub fn aggregate(
        id: ScanId,
        url: impl Into<String>,
        ruleset: impl Into<String>,
        date: DateTime<Utc>,
        full_scan: bool,
        status: ScanStatus,
        total_pages: usize,
        pages: Vec<PageScanResult>,
    ) -> Self {
        Self {
            id,
            url: url.into(),
            ruleset: ruleset.into(),
            date,
            full_scan,
            status,
            total_pages,
            pages_scanned: pages.len(),
            error_count: pages.iter().map(|p| p.error_count).sum(),
            warning_count: pages.iter().map(|p| p.warning_count).sum(),
            notice_count: pages.iter().map(|p| p.notice_count).sum(),
            pages,
            error: None,
        }
    }

    /// Builds the record of a scan aborted by an internal fault
    pub fn failed(
        id: ScanId,
        url: impl Into<String>,
        ruleset: impl Into<String>,
        date: DateTime<Utc>,
        full_scan: bool,
        error: impl Into<String>,
    ) -> Self {
        let mut result = Self::aggregate(
            id,
            url,
            ruleset,
            date,
            full_scan,
            ScanStatus::Failed,
            0,
            Vec::new(),
        );
        result.error = Some(error.into());
        result
    }

    /// Host of the start URL, used to correlate scans of the same site
    pub fn task(&self) -> String {
        ::url::Url::parse(&self.url)
            .ok()
            .and_then(|u| crate::url::extract_domain(&u))
            .unwrap_or_else(|| self.url.clone())
    }

    /// Total issues across all pages
    pub fn issue_count(&self) -> usize {
        self.error_count + self.warning_count + self.notice_count
    }
}
