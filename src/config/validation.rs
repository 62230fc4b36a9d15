use crate::config::types::{Config, LogConfig, RetryConfig, ScheduleConfig, TargetConfig};
use crate::ConfigError;
use chrono::NaiveTime;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_target_config(&config.target)?;
    validate_retry_config(&config.retry)?;
    validate_schedule_config(&config.schedule)?;
    validate_storage_config(&config.storage)?;
    validate_log_config(&config.log)?;
    Ok(())
}

/// Parses a trigger time in `HH:MM` form
pub fn parse_trigger_time(value: &str) -> Result<NaiveTime, ConfigError> {
    let value = value.trim();
    let well_formed = value.len() == 5
        && value.as_bytes()[2] == b':'
        && value
            .chars()
            .enumerate()
            .all(|(i, c)| i == 2 || c.is_ascii_digit());

    if !well_formed {
        return Err(ConfigError::InvalidTime(format!(
            "'{}' is not in HH:MM form",
            value
        )));
    }

    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|e| ConfigError::InvalidTime(format!("'{}': {}", value, e)))
}

/// Validates the crawl target
fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid target url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Target url '{}' must use http or https",
            config.url
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    for name in config.headers.keys() {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "header names cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates the retry policy
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if !config.backoff_multiplier.is_finite() || config.backoff_multiplier < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_multiplier must be a finite value >= 1.0, got {}",
            config.backoff_multiplier
        )));
    }

    Ok(())
}

/// Validates the trigger schedule
fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    if config.times.is_empty() {
        return Err(ConfigError::Validation(
            "schedule must contain at least one trigger time".to_string(),
        ));
    }

    for time in &config.times {
        parse_trigger_time(time)?;
    }

    if config.poll_interval_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "poll_interval_secs must be >= 1, got {}",
            config.poll_interval_secs
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &crate::config::types::StorageConfig) -> Result<(), ConfigError> {
    if config.data_dir.is_empty() {
        return Err(ConfigError::Validation(
            "data_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates log configuration
fn validate_log_config(config: &LogConfig) -> Result<(), ConfigError> {
    if config.file.is_empty() {
        return Err(ConfigError::Validation("log file cannot be empty".to_string()));
    }

    if config.recent_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "recent_capacity must be >= 1, got {}",
            config.recent_capacity
        )));
    }

    Ok(())
}
