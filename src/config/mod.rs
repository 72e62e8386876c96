//! Configuration module for A11y-Scout
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use a11y_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("a11y-scout.toml")).unwrap();
//! println!("Full scans stop after {} pages", config.scanner.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CheckerConfig, Config, OutputConfig, ScannerConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate_ruleset, KNOWN_RULESETS};
