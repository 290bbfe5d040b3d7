//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port, pool sizing, timeouts)
//! - Reject unknown log levels before the subscriber is installed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::ServerConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `pool.max_workers`.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a configuration for out-of-range values.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::new("listener.host", "must not be empty"));
    }
    if config.listener.port == 0 {
        errors.push(ValidationError::new("listener.port", "must be between 1 and 65535"));
    }
    if config.pool.max_workers == 0 {
        errors.push(ValidationError::new("pool.max_workers", "must be at least 1"));
    }
    if config.pool.max_pending == Some(0) {
        errors.push(ValidationError::new(
            "pool.max_pending",
            "must be at least 1 (omit it for an unbounded queue)",
        ));
    }
    if config.timeouts.read_secs == Some(0) {
        errors.push(ValidationError::new(
            "timeouts.read_secs",
            "must be at least 1 (omit it to disable the read timeout)",
        ));
    }
    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level {:?}", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_violation() {
        let mut config = ServerConfig::default();
        config.listener.port = 0;
        config.pool.max_workers = 0;
        config.pool.max_pending = Some(0);
        config.timeouts.read_secs = Some(0);
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.port",
                "pool.max_workers",
                "pool.max_pending",
                "timeouts.read_secs",
                "observability.log_level",
            ]
        );
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let mut config = ServerConfig::default();
        config.observability.log_level = "DEBUG".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_keep_alive_is_allowed() {
        let mut config = ServerConfig::default();
        config.pool.keep_alive_secs = 0;
        assert!(validate_config(&config).is_ok());
    }
}
