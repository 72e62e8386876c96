//! Page checker module
//!
//! The accessibility rules themselves live in an external tool. This module
//! defines the contract for that tool (`PageChecker`), a process-backed
//! implementation (`Pa11yChecker`), and the adapter the scanner talks to
//! (`PageCheckerAdapter`), which normalizes issues into per-page counts and
//! turns every failure into a "no result" outcome.

mod pa11y;

pub use pa11y::{parse_pa11y_output, Pa11yChecker};

use crate::config::CheckerConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Extra time allowed on top of the checker's own timeout before the
/// adapter gives up on it
const TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// Severity class of an accessibility issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Error,
    Warning,
    Notice,
}

/// A single issue reported by the checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Rule identifier, e.g. `WCAG2AA.Principle1.Guideline1_1.1_1_1.H37`
    #[serde(default)]
    pub code: String,

    /// Severity class
    #[serde(rename = "type")]
    pub issue_type: IssueType,

    /// Human-readable description
    #[serde(default)]
    pub message: String,

    /// HTML snippet of the offending element
    #[serde(default)]
    pub context: Option<String>,

    /// CSS selector of the offending element
    #[serde(default)]
    pub selector: Option<String>,
}

/// Options passed to the checker for one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    pub ruleset: String,
    pub include_warnings: bool,
    pub include_notices: bool,
    pub timeout: Duration,
}

/// Errors raised by a checker implementation
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Failed to launch checker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Checker exited with status {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Failed to parse checker output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Checker timed out after {0:?}")]
    Timeout(Duration),
}

/// External accessibility-checking capability
#[async_trait]
pub trait PageChecker: Send + Sync {
    /// Checks one URL and returns the raw issue list
    async fn check(&self, url: &str, options: &CheckOptions) -> Result<Vec<Issue>, CheckError>;
}

/// Outcome of checking a single page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageScanResult {
    pub url: String,
    pub error_count: usize,
    pub warning_count: usize,
    pub notice_count: usize,
    pub issues: Vec<Issue>,
}

impl PageScanResult {
    /// Builds a page result, counting issues per severity
    pub fn from_issues(url: impl Into<String>, issues: Vec<Issue>) -> Self {
        let count = |kind: IssueType| issues.iter().filter(|i| i.issue_type == kind).count();

        Self {
            url: url.into(),
            error_count: count(IssueType::Error),
            warning_count: count(IssueType::Warning),
            notice_count: count(IssueType::Notice),
            issues,
        }
    }

    /// Total number of issues on the page
    pub fn issue_count(&self) -> usize {
        self.error_count + self.warning_count + self.notice_count
    }
}

/// Wraps a `PageChecker` with timeout enforcement and failure containment
#[derive(Clone)]
pub struct PageCheckerAdapter {
    checker: Arc<dyn PageChecker>,
    include_warnings: bool,
    include_notices: bool,
    timeout: Duration,
}

impl std::fmt::Debug for PageCheckerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCheckerAdapter")
            .field("include_warnings", &self.include_warnings)
            .field("include_notices", &self.include_notices)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PageCheckerAdapter {
    /// Creates an adapter using the inclusion flags and timeout from `config`
    pub fn new(checker: Arc<dyn PageChecker>, config: &CheckerConfig) -> Self {
        Self {
            checker,
            include_warnings: config.include_warnings,
            include_notices: config.include_notices,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Builds the checker options for `ruleset`
    pub fn options(&self, ruleset: &str) -> CheckOptions {
        CheckOptions {
            ruleset: ruleset.to_string(),
            include_warnings: self.include_warnings,
            include_notices: self.include_notices,
            timeout: self.timeout,
        }
    }

    /// Checks a page, returning `None` if the checker fails or times out
    ///
    /// Warning- and notice-level issues are dropped here when excluded, even
    /// if the underlying checker reports them anyway.
    pub async fn check_page(&self, url: &str, ruleset: &str) -> Option<PageScanResult> {
        let options = self.options(ruleset);
        let deadline = self.timeout + TIMEOUT_GRACE;

        let outcome = match tokio::time::timeout(deadline, self.checker.check(url, &options)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(CheckError::Timeout(deadline)),
        };

        match outcome {
            Ok(issues) => {
                let issues = issues
                    .into_iter()
                    .filter(|issue| match issue.issue_type {
                        IssueType::Error => true,
                        IssueType::Warning => self.include_warnings,
                        IssueType::Notice => self.include_notices,
                    })
                    .collect();
                Some(PageScanResult::from_issues(url, issues))
            }
            Err(e) => {
                tracing::warn!("Accessibility check failed for {}: {}", url, e);
                None
            }
        }
    }
}
