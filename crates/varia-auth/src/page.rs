//! The login surface as seen by the handshake.

use crate::credentials::Credentials;
use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use varia_browser::actions::{js_string, BrowserActions};
use varia_browser::{extract_domain, BrowserContext, BrowserError, Result, Session};
use varia_core::AuthConfig;

/// Polling interval of the outcome detectors.
const DETECTOR_POLL: Duration = Duration::from_millis(250);

/// Page operations the handshake drives.
///
/// The three detectors never return on their own until their condition is
/// met; callers bound them with a timeout.
#[async_trait]
pub trait AuthPage: Send + Sync {
    /// Load a stored session into the page.
    async fn restore_session(&self, session: &Session) -> Result<()>;

    /// Visit a protected page and report whether it shows a signed-in account.
    async fn is_authenticated(&self) -> Result<bool>;

    /// Open the login surface.
    async fn open_login(&self) -> Result<()>;

    /// Fill the login form and submit it.
    async fn submit_login(&self, credentials: &Credentials) -> Result<()>;

    /// Resolves once the page has left the login surface.
    async fn navigated_away(&self) -> Result<()>;

    /// Resolves once the rejection message is shown.
    async fn bad_credentials_shown(&self) -> Result<()>;

    /// Resolves once client-side validation has blocked the submit.
    async fn validation_fired(&self) -> Result<()>;

    /// Export the authenticated session.
    async fn capture_session(&self) -> Result<Session>;

    /// Release the page once the handshake is over.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// [`AuthPage`] over a dedicated browser context.
pub struct ChromiumAuthPage {
    context: BrowserContext,
    config: AuthConfig,
    bad_pattern: Regex,
}

impl ChromiumAuthPage {
    /// Fails when the configured rejection pattern is not a valid regex.
    pub fn new(context: BrowserContext, config: AuthConfig) -> Result<Self> {
        let bad_pattern = Regex::new(&config.bad_credentials_pattern)
            .map_err(|e| BrowserError::Script(format!("bad_credentials_pattern: {e}")))?;
        Ok(Self {
            context,
            config,
            bad_pattern,
        })
    }

    /// The underlying context.
    pub fn context(&self) -> &BrowserContext {
        &self.context
    }

    fn on_login_surface(&self, url: &str) -> bool {
        url.starts_with(&self.config.login_url)
    }

    async fn rejection_visible(&self) -> Result<bool> {
        if !self
            .context
            .is_visible(&self.config.bad_credentials_selector)
            .await?
        {
            return Ok(false);
        }
        match self
            .context
            .extract_text(&self.config.bad_credentials_selector)
            .await
        {
            Ok(text) => Ok(self.bad_pattern.is_match(&text)),
            Err(BrowserError::SelectorNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn empty_invalid_fields_script(selector: &str) -> String {
    format!(
        "(() => Array.from(document.querySelectorAll({sel})).some(el => !el.value))()",
        sel = js_string(selector)
    )
}

#[async_trait]
impl AuthPage for ChromiumAuthPage {
    async fn restore_session(&self, session: &Session) -> Result<()> {
        self.context.restore(session).await
    }

    async fn is_authenticated(&self) -> Result<bool> {
        if let Err(e) = self.context.navigate(&self.config.account_url).await {
            tracing::debug!("Session check navigation failed: {}", e);
            return Ok(false);
        }
        let signed_out = self.context.is_visible(&self.config.sign_in_marker).await?;
        let signed_in = self.context.is_visible(&self.config.account_marker).await?;
        Ok(!signed_out && signed_in)
    }

    async fn open_login(&self) -> Result<()> {
        self.context.navigate(&self.config.login_url).await
    }

    async fn submit_login(&self, credentials: &Credentials) -> Result<()> {
        self.context
            .fill_field(&self.config.identity_input, &credentials.identity)
            .await?;
        self.context
            .fill_field(&self.config.secret_input, credentials.secret())
            .await?;
        self.context.click(&self.config.submit_button).await
    }

    async fn navigated_away(&self) -> Result<()> {
        loop {
            let url = self.context.current_url().await?;
            if !self.on_login_surface(&url) {
                tracing::debug!("Left login surface for {}", url);
                return Ok(());
            }
            tokio::time::sleep(DETECTOR_POLL).await;
        }
    }

    async fn bad_credentials_shown(&self) -> Result<()> {
        loop {
            if self.rejection_visible().await? {
                return Ok(());
            }
            tokio::time::sleep(DETECTOR_POLL).await;
        }
    }

    async fn validation_fired(&self) -> Result<()> {
        let script = empty_invalid_fields_script(&self.config.invalid_field_selector);
        loop {
            if self.context.evaluate(&script).await?.as_bool() == Some(true) {
                return Ok(());
            }
            tokio::time::sleep(DETECTOR_POLL).await;
        }
    }

    async fn capture_session(&self) -> Result<Session> {
        let domain = extract_domain(&self.config.login_url)?;
        Ok(self.context.session().await?.scoped_to(&domain))
    }

    async fn close(&self) -> Result<()> {
        self.context.close().await
    }
}
