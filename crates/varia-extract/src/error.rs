use thiserror::Error;
use varia_auth::AuthError;
use varia_browser::BrowserError;
use varia_core::{ErrorClass, VariaError};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Target discovery failed after {attempts} attempts: {source}")]
    Discovery {
        attempts: u32,
        #[source]
        source: BrowserError,
    },

    #[error("Discovery found no targets for {0}")]
    NoTargets(String),

    #[error("Could not switch account to {format}: {source}")]
    FormatSwitch {
        format: String,
        #[source]
        source: BrowserError,
    },

    #[error("No worker context could be created: {0}")]
    NoWorkers(#[source] BrowserError),

    #[error("Invalid run setup: {0}")]
    Setup(#[from] VariaError),
}

impl ExtractError {
    /// How the run treats this error.
    ///
    /// Everything that reaches the orchestrator's caller aborts the run;
    /// only an interactive credential rejection may be recovered from.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Auth(e) => e.class(),
            _ => ErrorClass::Fatal,
        }
    }
}

/// Classify an extraction attempt failure for the worker's log line.
///
/// Ingestion does not consult the class: every failed attempt spends the
/// job's retry budget, so a lost browser shows up as dropped jobs.
#[must_use]
pub fn classify_attempt(error: &BrowserError) -> ErrorClass {
    match error {
        BrowserError::ChromiumError(_) => ErrorClass::Fatal,
        _ => ErrorClass::Transient,
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
