//! Live scan job records
//!
//! A job exists only while its scan is running. The orchestrator writes to it
//! through a `JobHandle`; everyone else reads `JobSnapshot`s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Opaque identifier of a scan, used as the external handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(Uuid);

impl ScanId {
    /// Generates a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ScanId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Externally visible status of a live job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    /// The scan is running normally
    InProgress,
    /// Cancellation was requested; the scan stops before its next page
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in-progress",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Mutable progress of a live job
#[derive(Debug)]
pub(crate) struct ScanJob {
    total_pages: Option<usize>,
    scanned_count: usize,
    current_page: Option<String>,
    started_at: DateTime<Utc>,
}

impl ScanJob {
    pub(crate) fn new() -> Self {
        Self {
            total_pages: None,
            scanned_count: 0,
            current_page: None,
            started_at: Utc::now(),
        }
    }
}

/// Read-only copy of a live job's progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: ScanId,
    pub status: JobStatus,
    pub scanned_count: usize,
    pub total_pages: usize,
    pub current_page: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Writer side of a live job, owned by the scan driving it
///
/// Cloning shares the same record and cancellation token.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: ScanId,
    record: Arc<Mutex<ScanJob>>,
    cancel: CancellationToken,
}

impl JobHandle {
    pub(crate) fn new(id: ScanId, record: Arc<Mutex<ScanJob>>, cancel: CancellationToken) -> Self {
        Self { id, record, cancel }
    }

    /// The scan's identifier
    pub fn id(&self) -> ScanId {
        self.id
    }

    /// Token that is cancelled when cancellation is requested
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fixes the number of discovered pages
    ///
    /// Only the first call has an effect; returns false if the total was
    /// already set.
    pub fn set_total_pages(&self, total: usize) -> bool {
        let mut job = lock(&self.record);
        if job.total_pages.is_some() {
            tracing::warn!("Scan {}: total pages already fixed, ignoring {}", self.id, total);
            return false;
        }
        job.total_pages = Some(total);
        true
    }

    /// Records that the check of `url` has been dispatched
    pub fn begin_page(&self, url: &str) {
        lock(&self.record).current_page = Some(url.to_string());
    }

    /// Records that one page check has finished, successfully or not
    ///
    /// The count never exceeds the discovered total.
    pub fn finish_page(&self) {
        let mut job = lock(&self.record);
        let total = job.total_pages.unwrap_or(0);
        if job.scanned_count < total {
            job.scanned_count += 1;
        }
    }

    /// Current progress of this job
    pub fn snapshot(&self) -> JobSnapshot {
        snapshot(self.id, &self.record, &self.cancel)
    }
}

pub(crate) fn snapshot(
    id: ScanId,
    record: &Mutex<ScanJob>,
    cancel: &CancellationToken,
) -> JobSnapshot {
    let job = lock(record);
    JobSnapshot {
        id,
        status: if cancel.is_cancelled() {
            JobStatus::Cancelled
        } else {
            JobStatus::InProgress
        },
        scanned_count: job.scanned_count,
        total_pages: job.total_pages.unwrap_or(0),
        current_page: job.current_page.clone(),
        started_at: job.started_at,
    }
}

fn lock(record: &Mutex<ScanJob>) -> MutexGuard<'_, ScanJob> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}
