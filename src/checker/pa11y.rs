//! Checker backed by the pa11y command-line tool
//!
//! Runs `pa11y --reporter json` once per page. pa11y exits with 0 when a page
//! has no issues and 2 when it has some; anything else is a failed run.

use crate::checker::{CheckError, CheckOptions, Issue, PageChecker};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Runs the pa11y CLI for each page
#[derive(Debug, Clone)]
pub struct Pa11yChecker {
    command: String,
}

impl Pa11yChecker {
    /// Creates a checker invoking `command` (usually `pa11y`)
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn build_command(&self, url: &str, options: &CheckOptions) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg("--reporter")
            .arg("json")
            .arg("--standard")
            .arg(&options.ruleset)
            .arg("--timeout")
            .arg(options.timeout.as_millis().to_string());

        if options.include_warnings {
            cmd.arg("--include-warnings");
        }
        if options.include_notices {
            cmd.arg("--include-notices");
        }

        cmd.arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl PageChecker for Pa11yChecker {
    async fn check(&self, url: &str, options: &CheckOptions) -> Result<Vec<Issue>, CheckError> {
        tracing::debug!("Running {} against {}", self.command, url);

        let output = self.build_command(url, options).output().await?;

        match output.status.code() {
            Some(0) | Some(2) => parse_pa11y_output(&String::from_utf8_lossy(&output.stdout)),
            code => Err(CheckError::Failed {
                status: code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }
}

/// Parses the JSON issue array printed by `pa11y --reporter json`
///
/// Empty output means no issues.
pub fn parse_pa11y_output(stdout: &str) -> Result<Vec<Issue>, CheckError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(trimmed)?)
}
