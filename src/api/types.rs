//! Request and response payloads of the scan service
//!
//! All payloads serialize to camelCase JSON. Request fields are optional so
//! that a missing field becomes a structured failure instead of a
//! deserialization error.

use crate::state::{JobSnapshot, JobStatus};
use crate::storage::ScanResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartScanRequest {
    pub url: Option<String>,
    /// Defaults to the configured ruleset (`WCAG2AA` unless overridden)
    pub ruleset: Option<String>,
    /// Defaults to false
    pub full_scan: Option<bool>,
    pub max_pages: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartScanResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StartScanResponse {
    pub fn started(scan_id: String) -> Self {
        Self {
            success: true,
            scan_id: Some(scan_id),
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            scan_id: None,
            message: Some(message.into()),
        }
    }
}

/// Names one scan by id; used by cancel, progress, show and delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanIdRequest {
    #[serde(alias = "id")]
    pub scan_id: Option<String>,
}

impl ScanIdRequest {
    pub fn new(scan_id: impl Into<String>) -> Self {
        Self {
            scan_id: Some(scan_id.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Progress of a live scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveProgress {
    pub scan_id: String,
    pub scanned_count: usize,
    pub total_pages: usize,
    pub current_page: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl From<&JobSnapshot> for LiveProgress {
    fn from(snapshot: &JobSnapshot) -> Self {
        Self {
            scan_id: snapshot.id.to_string(),
            scanned_count: snapshot.scanned_count,
            total_pages: snapshot.total_pages,
            current_page: snapshot.current_page.clone(),
            started_at: snapshot.started_at,
        }
    }
}

/// State of a scan as seen by a progress query, tagged by `status`
///
/// A live job reports `in-progress` or `cancelled`. Once retired, a scan is
/// answered from history: `completed` (which includes scans stopped by
/// cancellation, see `results.status`) or `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ProgressStatus {
    InProgress(LiveProgress),
    Cancelled(LiveProgress),
    Completed { results: Box<ScanResult> },
    Failed { results: Box<ScanResult> },
    NotFound { message: String },
    Error { message: String },
}

/// Answer to a progress query
///
/// `success` is false only when no scan could be reported on: an unknown or
/// garbled id, or a storage failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub success: bool,
    #[serde(flatten)]
    pub progress: ProgressStatus,
}

impl From<ProgressStatus> for ProgressResponse {
    fn from(progress: ProgressStatus) -> Self {
        let success = !matches!(
            progress,
            ProgressStatus::NotFound { .. } | ProgressStatus::Error { .. }
        );
        Self { success, progress }
    }
}

impl ProgressResponse {
    pub fn live(snapshot: &JobSnapshot) -> Self {
        match snapshot.status {
            JobStatus::InProgress => ProgressStatus::InProgress(snapshot.into()),
            JobStatus::Cancelled => ProgressStatus::Cancelled(snapshot.into()),
        }
        .into()
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ProgressStatus::NotFound {
            message: message.into(),
        }
        .into()
    }

    pub fn error(message: impl Into<String>) -> Self {
        ProgressStatus::Error {
            message: message.into(),
        }
        .into()
    }

    /// Whether the scan is still running
    pub fn is_live(&self) -> bool {
        matches!(
            self.progress,
            ProgressStatus::InProgress(_) | ProgressStatus::Cancelled(_)
        )
    }

    pub fn status(&self) -> &'static str {
        match self.progress {
            ProgressStatus::InProgress(_) => "in-progress",
            ProgressStatus::Cancelled(_) => "cancelled",
            ProgressStatus::Completed { .. } => "completed",
            ProgressStatus::Failed { .. } => "failed",
            ProgressStatus::NotFound { .. } => "not-found",
            ProgressStatus::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    /// Scan results, newest first
    pub data: Vec<ScanResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Box<ScanResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted_count: u64,
    pub message: String,
}

impl DeleteResponse {
    pub fn deleted(count: u64) -> Self {
        Self {
            success: true,
            deleted_count: count,
            message: format!("{} records deleted", count),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            deleted_count: 0,
            message: message.into(),
        }
    }
}
