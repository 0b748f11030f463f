use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// The page navigated while a script or lookup was in flight.
    #[error("execution context destroyed: {0}")]
    ContextDestroyed(String),

    #[error("page shows format {observed}, expected {expected}")]
    FormatMismatch { expected: String, observed: String },

    #[error("script result invalid: {0}")]
    Script(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        let message = err.to_string();
        if message.contains("Execution context was destroyed")
            || message.contains("Cannot find context with specified id")
        {
            Self::ContextDestroyed(message)
        } else {
            Self::ChromiumError(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrowserError::NavigationError("page not found".to_string());
        assert_eq!(err.to_string(), "navigation failed: page not found");
    }

    #[test]
    fn test_format_mismatch_display() {
        let err = BrowserError::FormatMismatch {
            expected: "react-v4-dark".to_string(),
            observed: "html-v4-dark".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "page shows format html-v4-dark, expected react-v4-dark"
        );
    }
}
