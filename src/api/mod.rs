//! Scan service - the external boundary of the engine
//!
//! Every operation returns a structured payload. Invalid input, unknown ids
//! and storage failures become `success: false` responses; nothing returns
//! `Err` or panics across this boundary.

mod types;

pub use types::{
    DeleteResponse, HistoryResponse, LiveProgress, MessageResponse, ProgressResponse,
    ProgressStatus, ScanIdRequest, ShowResponse, StartScanRequest, StartScanResponse,
};

use crate::config::validate_ruleset;
use crate::scanner::{ScanOrchestrator, ScanRequest};
use crate::state::{JobSnapshot, ScanId};
use crate::storage::{ResultStore, ScanResult, ScanStatus, StorageResult};
use std::sync::Arc;
use url::Url;

/// Largest discovery cap a single request may ask for
pub const MAX_PAGES_LIMIT: usize = 10_000;

/// Request/response front end over a `ScanOrchestrator`
#[derive(Debug, Clone)]
pub struct ScanService {
    orchestrator: Arc<ScanOrchestrator>,
    default_ruleset: String,
}

impl ScanService {
    /// Creates a service; `default_ruleset` applies when a start request
    /// names none
    pub fn new(orchestrator: Arc<ScanOrchestrator>, default_ruleset: impl Into<String>) -> Self {
        Self {
            orchestrator,
            default_ruleset: default_ruleset.into(),
        }
    }

    pub fn orchestrator(&self) -> &Arc<ScanOrchestrator> {
        &self.orchestrator
    }

    fn store(&self) -> &dyn ResultStore {
        self.orchestrator.store().as_ref()
    }

    /// Validates a start request and launches the scan in the background
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_scan(&self, request: StartScanRequest) -> StartScanResponse {
        match self.build_request(request) {
            Ok(scan) => {
                let id = self.orchestrator.start_scan(scan);
                StartScanResponse::started(id.to_string())
            }
            Err(message) => {
                tracing::warn!("Rejected scan request: {}", message);
                StartScanResponse::rejected(message)
            }
        }
    }

    fn build_request(&self, request: StartScanRequest) -> Result<ScanRequest, String> {
        let raw_url = request
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| "A URL is required".to_string())?;

        let url = Url::parse(&raw_url).map_err(|e| format!("Invalid URL '{}': {}", raw_url, e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(format!("Unsupported URL scheme: {}", url.scheme()));
        }
        if url.host_str().is_none() {
            return Err(format!("URL has no host: {}", raw_url));
        }

        let ruleset = request
            .ruleset
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| self.default_ruleset.clone());
        validate_ruleset(&ruleset).map_err(|e| e.to_string())?;

        if let Some(max_pages) = request.max_pages {
            if max_pages == 0 || max_pages > MAX_PAGES_LIMIT {
                return Err(format!(
                    "maxPages must be between 1 and {}, got {}",
                    MAX_PAGES_LIMIT, max_pages
                ));
            }
        }

        Ok(ScanRequest {
            url: url.to_string(),
            ruleset,
            full_scan: request.full_scan.unwrap_or(false),
            max_pages: request.max_pages,
        })
    }

    /// Requests cooperative cancellation of a live scan
    pub fn cancel_scan(&self, request: ScanIdRequest) -> MessageResponse {
        let id = match parse_scan_id(request.scan_id.as_deref()) {
            Ok(id) => id,
            Err(message) => return MessageResponse::failure(message),
        };

        if self.orchestrator.registry().cancel(&id) {
            MessageResponse::ok(format!("Cancellation requested for scan {}", id))
        } else {
            MessageResponse::failure(format!("Scan {} not found or already finished", id))
        }
    }

    /// Reports live progress, or the stored result of a finished scan
    pub fn scan_progress(&self, request: ScanIdRequest) -> ProgressResponse {
        let id = match parse_scan_id(request.scan_id.as_deref()) {
            Ok(id) => id,
            Err(message) => return ProgressResponse::error(message),
        };

        if let Some(snapshot) = self.orchestrator.registry().progress(&id) {
            return ProgressResponse::live(&snapshot);
        }

        match self.store().find_by_id(&id) {
            Ok(Some(result)) => match result.status {
                ScanStatus::Failed => ProgressStatus::Failed {
                    results: Box::new(result),
                }
                .into(),
                ScanStatus::Completed | ScanStatus::Cancelled => ProgressStatus::Completed {
                    results: Box::new(result),
                }
                .into(),
            },
            Ok(None) => ProgressResponse::not_found(format!("Scan {} not found", id)),
            Err(e) => {
                tracing::error!("Failed to look up scan {}: {}", id, e);
                ProgressResponse::error(format!("Failed to look up scan {}: {}", id, e))
            }
        }
    }

    /// Progress of every live scan, oldest first
    pub fn live_scans(&self) -> Vec<JobSnapshot> {
        self.orchestrator.registry().live_jobs()
    }

    /// All stored scan results, newest first
    pub fn history(&self) -> HistoryResponse {
        history_response(self.store().find_all())
    }

    /// Stored scan results of one site (host name), newest first
    pub fn history_for_site(&self, site: &str) -> HistoryResponse {
        let host = Url::parse(site)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| site.trim().to_string());
        history_response(self.store().find_by_task(&host.to_lowercase()))
    }

    /// One stored scan result
    pub fn show(&self, request: ScanIdRequest) -> ShowResponse {
        let id = match parse_scan_id(request.scan_id.as_deref()) {
            Ok(id) => id,
            Err(message) => {
                return ShowResponse {
                    success: false,
                    data: None,
                    message: Some(message),
                }
            }
        };

        match self.store().find_by_id(&id) {
            Ok(Some(result)) => ShowResponse {
                success: true,
                data: Some(Box::new(result)),
                message: None,
            },
            Ok(None) => ShowResponse {
                success: false,
                data: None,
                message: Some(format!("Scan {} not found", id)),
            },
            Err(e) => {
                tracing::error!("Failed to load scan {}: {}", id, e);
                ShowResponse {
                    success: false,
                    data: None,
                    message: Some(e.to_string()),
                }
            }
        }
    }

    /// Deletes every stored scan result
    pub fn clear_history(&self) -> DeleteResponse {
        match self.store().delete_all() {
            Ok(count) => {
                tracing::info!("Cleared scan history ({} records)", count);
                DeleteResponse::deleted(count)
            }
            Err(e) => {
                tracing::error!("Error clearing history: {}", e);
                DeleteResponse::failure(e.to_string())
            }
        }
    }

    /// Deletes one stored scan result
    pub fn delete_history_item(&self, request: ScanIdRequest) -> DeleteResponse {
        let id = match parse_scan_id(request.scan_id.as_deref()) {
            Ok(id) => id,
            Err(message) => return DeleteResponse::failure(message),
        };

        match self.store().delete_by_id(&id) {
            Ok(count) => DeleteResponse::deleted(count),
            Err(e) => {
                tracing::error!("Error deleting scan {}: {}", id, e);
                DeleteResponse::failure(e.to_string())
            }
        }
    }
}

fn parse_scan_id(raw: Option<&str>) -> Result<ScanId, String> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "A scan id is required".to_string())?;
    raw.parse()
        .map_err(|_| format!("Invalid scan id: {}", raw))
}

fn history_response(results: StorageResult<Vec<ScanResult>>) -> HistoryResponse {
    match results {
        Ok(data) => HistoryResponse {
            success: true,
            data,
            message: None,
        },
        Err(e) => {
            tracing::error!("Failed to load scan history: {}", e);
            HistoryResponse {
                success: false,
                data: Vec::new(),
                message: Some(e.to_string()),
            }
        }
    }
}
