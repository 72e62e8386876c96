//! Markdown report generation
//!
//! This module renders one scan result as a human-readable markdown report:
//! scan metadata, a per-page summary table, and the issues found on each page.

use crate::checker::{IssueType, PageScanResult};
use crate::storage::ScanResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown report of `result` to `output_path`
///
/// # Arguments
///
/// * `result` - The scan result to report on
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_report(result: &ScanResult, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_markdown_report(result);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a scan result as markdown
pub fn format_markdown_report(result: &ScanResult) -> String {
    let mut md = String::new();

    // Title
    md.push_str(&format!("# Accessibility Report: {}\n\n", result.url));

    // Scan metadata
    md.push_str("## Scan Information\n\n");
    md.push_str(&format!("- **Scan ID**: {}\n", result.id));
    md.push_str(&format!(
        "- **Date**: {}\n",
        result.date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    md.push_str(&format!("- **Ruleset**: {}\n", result.ruleset));
    md.push_str(&format!(
        "- **Mode**: {}\n",
        if result.full_scan {
            "full site"
        } else {
            "single page"
        }
    ));
    md.push_str(&format!("- **Status**: {}\n", result.status.to_db_string()));
    if let Some(error) = &result.error {
        md.push_str(&format!("- **Error**: {}\n", error));
    }
    md.push('\n');

    // Totals
    md.push_str("## Totals\n\n");
    md.push_str(&format!(
        "- **Pages Scanned**: {} of {}\n",
        result.pages_scanned, result.total_pages
    ));
    md.push_str(&format!("- **Errors**: {}\n", result.error_count));
    md.push_str(&format!("- **Warnings**: {}\n", result.warning_count));
    md.push_str(&format!("- **Notices**: {}\n\n", result.notice_count));

    if result.pages.is_empty() {
        md.push_str("No page results were recorded for this scan.\n");
        return md;
    }

    // Per-page table
    md.push_str("## Pages\n\n");
    md.push_str("| Page | Errors | Warnings | Notices |\n");
    md.push_str("|------|--------|----------|---------|\n");
    for page in &result.pages {
        md.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            escape_cell(&page.url),
            page.error_count,
            page.warning_count,
            page.notice_count
        ));
    }
    md.push('\n');

    // Issue listing
    md.push_str("## Issues\n\n");
    for page in &result.pages {
        format_page_issues(&mut md, page);
    }

    md
}

fn format_page_issues(md: &mut String, page: &PageScanResult) {
    md.push_str(&format!("### {}\n\n", page.url));

    if page.issues.is_empty() {
        md.push_str("No issues found.\n\n");
        return;
    }

    for kind in [IssueType::Error, IssueType::Warning, IssueType::Notice] {
        for issue in page.issues.iter().filter(|i| i.issue_type == kind) {
            md.push_str(&format!(
                "- **{}** `{}`: {}\n",
                severity_label(kind),
                issue.code,
                issue.message
            ));
            if let Some(selector) = &issue.selector {
                md.push_str(&format!("  - Selector: `{}`\n", selector));
            }
            if let Some(context) = &issue.context {
                md.push_str(&format!("  - Context: `{}`\n", context.replace('`', "'")));
            }
        }
    }
    md.push('\n');
}

fn severity_label(kind: IssueType) -> &'static str {
    match kind {
        IssueType::Error => "Error",
        IssueType::Warning => "Warning",
        IssueType::Notice => "Notice",
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
