//! Output module for scan reports and history summaries
//!
//! This module handles:
//! - Generating a markdown report of one scan result
//! - Computing and printing statistics over the scan history

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_report, generate_markdown_report};
pub use stats::{compute_statistics, load_statistics, print_statistics, HistoryStatistics};
