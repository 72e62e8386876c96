//! Registry of live scan jobs
//!
//! Each entry has its own lock, so progress queries and cancellation for one
//! scan never wait on another scan's updates. The map lock is held only long
//! enough to find, insert, or remove an entry.

use crate::state::job::{snapshot, JobHandle, JobSnapshot, ScanId, ScanJob};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct JobEntry {
    record: Arc<Mutex<ScanJob>>,
    cancel: CancellationToken,
}

/// Tracks every scan that is currently running
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<ScanId, JobEntry>>,
}

impl JobRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new job with zeroed progress
    pub fn create(&self) -> JobHandle {
        let id = ScanId::new();
        let record = Arc::new(Mutex::new(ScanJob::new()));
        let cancel = CancellationToken::new();

        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                JobEntry {
                    record: Arc::clone(&record),
                    cancel: cancel.clone(),
                },
            );

        tracing::debug!("Registered scan job {}", id);
        JobHandle::new(id, record, cancel)
    }

    /// Requests cancellation of a live job
    ///
    /// Returns false if no live job has this id. Cancelling twice is allowed
    /// and has no further effect.
    pub fn cancel(&self, id: &ScanId) -> bool {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        match jobs.get(id) {
            Some(entry) => {
                entry.cancel.cancel();
                tracing::info!("Cancellation requested for scan {}", id);
                true
            }
            None => false,
        }
    }

    /// Returns a snapshot of a live job's progress
    pub fn progress(&self, id: &ScanId) -> Option<JobSnapshot> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        jobs.get(id)
            .map(|entry| snapshot(*id, &entry.record, &entry.cancel))
    }

    /// Removes a job from the registry
    ///
    /// Returns false if the job was not live.
    pub fn retire(&self, id: &ScanId) -> bool {
        let removed = self
            .jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some();
        if removed {
            tracing::debug!("Retired scan job {}", id);
        }
        removed
    }

    /// Snapshots of every live job, oldest first
    pub fn live_jobs(&self) -> Vec<JobSnapshot> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        let mut snapshots: Vec<JobSnapshot> = jobs
            .iter()
            .map(|(id, entry)| snapshot(*id, &entry.record, &entry.cancel))
            .collect();
        snapshots.sort_by_key(|s| s.started_at);
        snapshots
    }

    /// Number of live jobs
    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no job is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
