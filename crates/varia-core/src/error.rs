//! Core error types for the Varia workspace.
//!
//! This module defines the error type for configuration and domain value
//! validation, the configuration error type, and the [`ErrorClass`] taxonomy
//! the orchestrator uses to decide between retrying, prompting and aborting.
//! Each downstream crate keeps its own error enum and wraps this one.

use thiserror::Error;

/// Errors raised while setting a run up.
#[derive(Error, Debug)]
pub enum VariaError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors (invalid input, constraints)
    #[error("validation error: {0}")]
    Validation(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// I/O error reading config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// How a failure should be treated by whoever observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retry the unit of work (a job) up to the configured limit.
    Transient,
    /// Abort the whole run with a user-facing message.
    Fatal,
    /// Ask the user whether to retry with new input or abort.
    RecoverableInteractive,
}

/// Result type alias using `VariaError`.
pub type Result<T> = std::result::Result<T, VariaError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VariaError::Validation("invalid locator".to_string());
        assert_eq!(err.to_string(), "validation error: invalid locator");

        let err = ConfigError::InvalidValue {
            field: "pool.workers".to_string(),
            reason: "must be at least 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for pool.workers: must be at least 1"
        );
    }

    #[test]
    fn test_error_from_config() {
        let config_err = ConfigError::NoConfigDir;
        let err: VariaError = config_err.into();
        assert!(matches!(err, VariaError::Config(_)));
    }

    #[test]
    fn test_config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: VariaError = ConfigError::from(io_err).into();
        assert!(matches!(err, VariaError::Config(ConfigError::Io(_))));
        assert_eq!(err.to_string(), "configuration error: I/O error: test");
    }
}
