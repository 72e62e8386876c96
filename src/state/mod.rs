//! State module for tracking live scans
//!
//! # Components
//!
//! - `ScanId`: opaque handle of a scan
//! - `JobHandle`: writer side of a live job, held by the running scan
//! - `JobSnapshot`: read-only progress of a live job
//! - `JobRegistry`: id → job map shared by scans and progress/cancel queries

mod job;
mod registry;

pub use job::{JobHandle, JobSnapshot, JobStatus, ScanId};
pub use registry::JobRegistry;
