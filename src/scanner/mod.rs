//! Scan orchestration
//!
//! Composes discovery, page checking, and job tracking into one end-to-end
//! scan that runs as a detached task. The caller gets a `ScanId` back
//! immediately; completion is observable only through progress queries and
//! the persisted `ScanResult`.

mod orchestrator;

pub use orchestrator::{dedupe_pages, ScanOrchestrator, ScanRequest};
