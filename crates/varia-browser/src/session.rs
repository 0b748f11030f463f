//! Authenticated session blob shared between the login page and workers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cookie as captured from the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Expiry in seconds since the epoch; `None` for session cookies
    pub expires: Option<f64>,
    pub secure: bool,
    pub http_only: bool,
}

/// Opaque authentication state that can be cloned into fresh contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub cookies: Vec<StoredCookie>,
    pub saved_at: DateTime<Utc>,
}

impl Session {
    /// Wrap freshly captured cookies.
    #[must_use]
    pub fn new(cookies: Vec<StoredCookie>) -> Self {
        Self {
            cookies,
            saved_at: Utc::now(),
        }
    }

    /// Whether the session carries no cookies at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Drop cookies that expired before `now`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn without_expired(mut self, now: DateTime<Utc>) -> Self {
        let now = now.timestamp() as f64;
        self.cookies
            .retain(|c| c.expires.map_or(true, |expires| expires > now));
        self
    }

    /// Keep only cookies that apply to `domain` (exact or parent domain).
    #[must_use]
    pub fn scoped_to(mut self, domain: &str) -> Self {
        self.cookies.retain(|c| {
            let cookie_domain = c.domain.trim_start_matches('.');
            domain == cookie_domain || domain.ends_with(&format!(".{cookie_domain}"))
        });
        self
    }
}
