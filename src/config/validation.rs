use crate::config::types::{CheckerConfig, Config, OutputConfig, ScannerConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Rulesets understood by the accessibility checker
pub const KNOWN_RULESETS: &[&str] = &["WCAG2A", "WCAG2AA", "WCAG2AAA", "Section508"];

/// Upper bound for `max-pages`
const MAX_PAGES_LIMIT: usize = 10_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scanner_config(&config.scanner)?;
    validate_checker_config(&config.checker)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates site discovery configuration
fn validate_scanner_config(config: &ScannerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 || config.max_pages > MAX_PAGES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_pages must be between 1 and {}, got {}",
            MAX_PAGES_LIMIT, config.max_pages
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "fetch_timeout_secs must be >= 1".to_string(),
        ));
    }

    if !config.sitemap_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "sitemap_path must start with '/', got '{}'",
            config.sitemap_path
        )));
    }

    Ok(())
}

/// Validates checker configuration
fn validate_checker_config(config: &CheckerConfig) -> Result<(), ConfigError> {
    if config.command.trim().is_empty() {
        return Err(ConfigError::Validation(
            "checker command cannot be empty".to_string(),
        ));
    }

    validate_ruleset(&config.ruleset)?;

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "checker timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates a ruleset name against the known standards
pub fn validate_ruleset(ruleset: &str) -> Result<(), ConfigError> {
    if KNOWN_RULESETS.contains(&ruleset) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "unknown ruleset '{}', expected one of {}",
            ruleset,
            KNOWN_RULESETS.join(", ")
        )))
    }
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
