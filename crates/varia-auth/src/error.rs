use std::time::Duration;
use thiserror::Error;
use varia_browser::BrowserError;
use varia_core::ErrorClass;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// The login flow produced no outcome within its total budget
    #[error("login did not complete within {0:?}")]
    LoginTimeout(Duration),

    /// No credentials configured and prompting is not allowed
    #[error("no credentials available (set VARIA_EMAIL and VARIA_PASSWORD, a credentials file, or run interactively)")]
    NoCredentials,

    /// The source rejected the credentials
    #[error("the source rejected the supplied credentials")]
    BadCredentials {
        /// Whether the user could have been asked for new ones
        interactive: bool,
    },

    /// The user chose not to retry after a rejection
    #[error("login aborted by user")]
    Aborted,

    /// The credentials file could not be used
    #[error("credentials file {path}: {reason}")]
    CredentialsFile {
        /// File location
        path: String,
        /// What was wrong with it
        reason: String,
    },

    /// Browser failure outside of the outcome race
    #[error("browser error during login: {0}")]
    Browser(#[from] BrowserError),

    /// Terminal prompt failure
    #[error("prompt failed: {0}")]
    Prompt(#[from] std::io::Error),
}

impl AuthError {
    /// How the orchestrator treats this error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::BadCredentials { interactive: true } => ErrorClass::RecoverableInteractive,
            _ => ErrorClass::Fatal,
        }
    }
}

/// Result type for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_credentials_class_depends_on_mode() {
        assert_eq!(
            AuthError::BadCredentials { interactive: true }.class(),
            ErrorClass::RecoverableInteractive
        );
        assert_eq!(
            AuthError::BadCredentials { interactive: false }.class(),
            ErrorClass::Fatal
        );
        assert_eq!(
            AuthError::LoginTimeout(Duration::from_secs(60)).class(),
            ErrorClass::Fatal
        );
    }

    #[test]
    fn test_error_display() {
        let err = AuthError::LoginTimeout(Duration::from_secs(2));
        assert_eq!(err.to_string(), "login did not complete within 2s");
    }
}
