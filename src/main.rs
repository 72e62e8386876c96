//! A11y-Scout main entry point
//!
//! This is the command-line interface for the A11y-Scout accessibility scanner.

use a11y_scout::api::{ProgressStatus, ScanIdRequest, ScanService, StartScanRequest};
use a11y_scout::checker::Pa11yChecker;
use a11y_scout::config::{load_config_with_hash, Config};
use a11y_scout::output::{generate_markdown_report, load_statistics, print_statistics};
use a11y_scout::storage::{open_storage, ScanResult};
use a11y_scout::ScanOrchestrator;
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Interval between progress polls while a scan runs in the foreground
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A11y-Scout: site-wide accessibility scanning
///
/// A11y-Scout discovers the pages of a website from its sitemap (or by
/// following links), checks each page with an external accessibility
/// checker, and keeps a history of scan results.
#[derive(Parser, Debug)]
#[command(name = "a11y-scout")]
#[command(version)]
#[command(about = "Site-wide accessibility scanning", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a page or a whole site; Ctrl-C cancels the scan
    Scan {
        /// Start URL
        url: String,

        /// Discover and check every page of the site
        #[arg(long)]
        full: bool,

        /// Accessibility standard (WCAG2A, WCAG2AA, WCAG2AAA, Section508)
        #[arg(long)]
        ruleset: Option<String>,

        /// Cap on discovered pages for a full scan
        #[arg(long)]
        max_pages: Option<usize>,
    },

    /// List stored scan results, newest first
    History {
        /// Only scans of this site (host name or URL)
        #[arg(long)]
        site: Option<String>,
    },

    /// Print one stored scan result as JSON
    Show {
        /// Scan id
        id: String,
    },

    /// Delete one stored scan result
    Delete {
        /// Scan id
        id: String,
    },

    /// Delete every stored scan result
    ClearHistory,

    /// Show statistics over the scan history
    Stats,

    /// Write a markdown report of one scan
    Report {
        /// Scan id
        id: String,

        /// Output file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e).context(format!("loading {}", path.display()));
                }
            }
        }
        None => Config::default(),
    };

    let service = build_service(&config)?;

    match cli.command {
        Command::Scan {
            url,
            full,
            ruleset,
            max_pages,
        } => {
            handle_scan(
                &service,
                StartScanRequest {
                    url: Some(url),
                    ruleset,
                    full_scan: Some(full),
                    max_pages,
                },
            )
            .await
        }
        Command::History { site } => handle_history(&service, site.as_deref()),
        Command::Show { id } => handle_show(&service, id),
        Command::Delete { id } => {
            let response = service.delete_history_item(ScanIdRequest::new(id));
            finish(response.success, &response.message)
        }
        Command::ClearHistory => {
            let response = service.clear_history();
            finish(response.success, &response.message)
        }
        Command::Stats => handle_stats(&service),
        Command::Report { id, output } => handle_report(&service, id, output),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("a11y_scout=info,warn"),
            1 => EnvFilter::new("a11y_scout=debug,info"),
            2 => EnvFilter::new("a11y_scout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_service(config: &Config) -> Result<ScanService> {
    let store = open_storage(std::path::Path::new(&config.output.database_path))
        .with_context(|| format!("opening database {}", config.output.database_path))?;
    let checker = Arc::new(Pa11yChecker::new(config.checker.command.clone()));
    let orchestrator = ScanOrchestrator::new(config, checker, Arc::new(store))?;

    Ok(ScanService::new(
        Arc::new(orchestrator),
        config.checker.ruleset.clone(),
    ))
}

fn finish(success: bool, message: &str) -> Result<()> {
    if !success {
        bail!("{}", message);
    }
    println!("{}", message);
    Ok(())
}

/// Starts a scan and follows it until it leaves the live registry
async fn handle_scan(service: &ScanService, request: StartScanRequest) -> Result<()> {
    let started = service.start_scan(request);
    let scan_id = match (started.success, started.scan_id) {
        (true, Some(id)) => id,
        _ => {
            let message = started
                .message
                .unwrap_or_else(|| "Scan was not started".to_string());
            bail!(message);
        }
    };
    tracing::info!("Scan {} started (Ctrl-C to cancel)", scan_id);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancel_requested = false;
    let mut last_reported = None;

    loop {
        tokio::select! {
            signal = &mut ctrl_c, if !cancel_requested => {
                cancel_requested = true;
                if let Err(e) = signal {
                    tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                    continue;
                }
                let response = service.cancel_scan(ScanIdRequest::new(scan_id.clone()));
                tracing::info!("{}", response.message);
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }

        match service.scan_progress(ScanIdRequest::new(scan_id.clone())).progress {
            ProgressStatus::InProgress(progress) | ProgressStatus::Cancelled(progress) => {
                let position = (progress.scanned_count, progress.total_pages);
                if last_reported != Some(position) && progress.total_pages > 0 {
                    tracing::info!(
                        "Progress: {}/{} pages{}",
                        progress.scanned_count,
                        progress.total_pages,
                        progress
                            .current_page
                            .map(|p| format!(" (checking {})", p))
                            .unwrap_or_default()
                    );
                    last_reported = Some(position);
                }
            }
            ProgressStatus::Completed { results } | ProgressStatus::Failed { results } => {
                println!("{}", serde_json::to_string_pretty(&results)?);
                return Ok(());
            }
            ProgressStatus::NotFound { message } | ProgressStatus::Error { message } => {
                bail!(message);
            }
        }
    }
}

fn handle_history(service: &ScanService, site: Option<&str>) -> Result<()> {
    let response = match site {
        Some(site) => service.history_for_site(site),
        None => service.history(),
    };

    if !response.success {
        bail!(response
            .message
            .unwrap_or_else(|| "Failed to load history".to_string()));
    }

    if response.data.is_empty() {
        println!("No scans recorded");
        return Ok(());
    }

    for result in &response.data {
        print_history_line(result);
    }

    Ok(())
}

fn print_history_line(result: &ScanResult) {
    println!(
        "{}  {}  {:<9}  {:>3}/{:<3} pages  {:>4} errors  {:>4} warnings  {:>4} notices  {}",
        result.id,
        result.date.format("%Y-%m-%d %H:%M"),
        result.status.to_db_string(),
        result.pages_scanned,
        result.total_pages,
        result.error_count,
        result.warning_count,
        result.notice_count,
        result.url
    );
}

fn handle_show(service: &ScanService, id: String) -> Result<()> {
    let response = service.show(ScanIdRequest::new(id));
    match response.data {
        Some(result) if response.success => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        _ => Err(anyhow!(response
            .message
            .unwrap_or_else(|| "Scan not found".to_string()))),
    }
}

/// Handles the stats command: shows statistics from the database
fn handle_stats(service: &ScanService) -> Result<()> {
    let stats = load_statistics(service.orchestrator().store().as_ref())?;
    print_statistics(&stats);
    Ok(())
}

/// Handles the report command: writes a markdown report of one scan
fn handle_report(service: &ScanService, id: String, output: PathBuf) -> Result<()> {
    let response = service.show(ScanIdRequest::new(id));
    let result = match response.data {
        Some(result) if response.success => result,
        _ => {
            bail!(response
                .message
                .unwrap_or_else(|| "Scan not found".to_string()))
        }
    };

    tracing::info!("Generating markdown report...");
    generate_markdown_report(&result, &output)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("✓ Report written to: {}", output.display());

    Ok(())
}
