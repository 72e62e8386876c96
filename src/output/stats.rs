//! Statistics over the scan history
//!
//! This module provides functionality for summarizing stored scan results
//! and printing the summary.

use crate::storage::{ResultStore, ScanResult, ScanStatus};
use crate::ScoutError;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Scan history statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStatistics {
    /// Number of stored scans
    pub total_scans: u64,

    /// Count of scans by final status
    pub scans_by_status: HashMap<ScanStatus, u64>,

    /// Number of distinct sites scanned
    pub unique_sites: u64,

    /// Pages with a recorded result, across all scans
    pub pages_scanned: u64,

    pub error_count: u64,
    pub warning_count: u64,
    pub notice_count: u64,

    /// Date of the most recent scan
    pub latest_scan: Option<DateTime<Utc>>,
}

impl HistoryStatistics {
    /// Average number of errors per scanned page
    pub fn errors_per_page(&self) -> f64 {
        if self.pages_scanned == 0 {
            0.0
        } else {
            self.error_count as f64 / self.pages_scanned as f64
        }
    }
}

/// Summarizes a set of scan results
pub fn compute_statistics(results: &[ScanResult]) -> HistoryStatistics {
    let mut stats = HistoryStatistics::default();
    let mut sites = HashSet::new();

    for result in results {
        stats.total_scans += 1;
        *stats.scans_by_status.entry(result.status).or_insert(0) += 1;
        sites.insert(result.task());
        stats.pages_scanned += result.pages_scanned as u64;
        stats.error_count += result.error_count as u64;
        stats.warning_count += result.warning_count as u64;
        stats.notice_count += result.notice_count as u64;
        stats.latest_scan = stats.latest_scan.max(Some(result.date));
    }

    stats.unique_sites = sites.len() as u64;
    stats
}

/// Loads statistics from storage
pub fn load_statistics(store: &dyn ResultStore) -> Result<HistoryStatistics, ScoutError> {
    let results = store.find_all()?;
    Ok(compute_statistics(&results))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HistoryStatistics) {
    println!("=== Scan History Statistics ===\n");

    println!("Overview:");
    println!("  Total scans: {}", stats.total_scans);
    println!("  Unique sites: {}", stats.unique_sites);
    println!("  Pages scanned: {}", stats.pages_scanned);
    if let Some(latest) = stats.latest_scan {
        println!("  Latest scan: {}", latest.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!();

    println!("Scans by Status:");
    for status in [ScanStatus::Completed, ScanStatus::Cancelled, ScanStatus::Failed] {
        let count = stats.scans_by_status.get(&status).copied().unwrap_or(0);
        let percentage = if stats.total_scans > 0 {
            (count as f64 / stats.total_scans as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status.to_db_string(), count, percentage);
    }
    println!();

    println!("Issues:");
    println!("  Errors: {}", stats.error_count);
    println!("  Warnings: {}", stats.warning_count);
    println!("  Notices: {}", stats.notice_count);
    println!();

    println!("Errors per page: {:.2}", stats.errors_per_page());
}
