//! Login/session handshake.
//!
//! A stored session is tried first. Otherwise credentials are resolved and
//! submitted, and the handshake races three page outcomes (navigation away,
//! rejection message, client-side validation) inside a total time budget.

use crate::credentials::{CredentialProvider, Credentials};
use crate::error::{AuthError, Result};
use crate::page::AuthPage;
use crate::store::SessionStore;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use varia_browser::{BrowserError, Session};
use varia_core::AuthConfig;

/// Pause after a detector error before resubmitting.
const ERROR_PAUSE: Duration = Duration::from_millis(500);

/// Bound on the navigation re-check made before a resubmit.
const NAVIGATION_CHECK: Duration = Duration::from_millis(500);

/// Produces an authenticated session for the run.
#[async_trait]
pub trait Authenticate: Send {
    /// Establish a session, logging in if needed.
    async fn authenticate(&mut self) -> Result<Session>;
}

/// Timing of a login attempt.
#[derive(Debug, Clone, Copy)]
pub struct HandshakeConfig {
    /// Total budget for one login attempt
    pub login_budget: Duration,
    /// Bound on each detector race
    pub attempt_timeout: Duration,
}

impl From<&AuthConfig> for HandshakeConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            login_budget: Duration::from_secs(config.login_timeout_secs),
            attempt_timeout: Duration::from_millis(config.attempt_timeout_ms),
        }
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

/// Where the handshake currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    LoadedSessionCheck,
    CredentialResolution,
    LoginAttempt,
    Reprompt,
    Authenticated,
    Aborted,
}

/// Result of one login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    BadCredentials,
    Timeout,
}

/// What the detector race observed.
enum Detected {
    NavigatedAway,
    Rejected,
    ValidationFired,
}

/// Drives an [`AuthPage`] to an authenticated session.
pub struct AuthHandshake<P, C> {
    page: P,
    credentials: C,
    store: SessionStore,
    config: HandshakeConfig,
    state: HandshakeState,
    submissions: usize,
}

impl<P: AuthPage, C: CredentialProvider> AuthHandshake<P, C> {
    pub fn new(page: P, credentials: C, store: SessionStore, config: HandshakeConfig) -> Self {
        Self {
            page,
            credentials,
            store,
            config,
            state: HandshakeState::LoadedSessionCheck,
            submissions: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Form submissions made so far, across all attempts.
    pub fn submissions(&self) -> usize {
        self.submissions
    }

    /// The driven page.
    pub fn page(&self) -> &P {
        &self.page
    }

    /// Run the state machine to completion.
    #[tracing::instrument(skip(self), fields(store = %self.store.path().display()))]
    pub async fn run(&mut self) -> Result<Session> {
        self.state = HandshakeState::LoadedSessionCheck;
        if let Some(session) = self.store.load() {
            if self.session_is_valid(&session).await {
                tracing::info!("Stored session is still valid");
                self.state = HandshakeState::Authenticated;
                return Ok(session);
            }
            tracing::info!("Stored session is no longer valid, logging in");
        }

        self.state = HandshakeState::CredentialResolution;
        let mut credentials = self.credentials.resolve().await?;

        loop {
            self.state = HandshakeState::LoginAttempt;
            match self.attempt_login(&credentials).await? {
                LoginOutcome::Success => break,
                LoginOutcome::Timeout => {
                    self.state = HandshakeState::Aborted;
                    return Err(AuthError::LoginTimeout(self.config.login_budget));
                }
                LoginOutcome::BadCredentials => {
                    let interactive = self.credentials.is_interactive();
                    tracing::warn!("Credentials for {} were rejected", credentials.identity);
                    if !interactive {
                        self.state = HandshakeState::Aborted;
                        return Err(AuthError::BadCredentials { interactive });
                    }
                    self.state = HandshakeState::Reprompt;
                    match self.credentials.retry_after_rejection().await? {
                        Some(next) => credentials = next,
                        None => {
                            self.state = HandshakeState::Aborted;
                            return Err(AuthError::Aborted);
                        }
                    }
                }
            }
        }

        let session = self.page.capture_session().await?;
        self.store.save(&session);
        self.state = HandshakeState::Authenticated;
        tracing::info!("Logged in with {} cookies", session.cookies.len());
        Ok(session)
    }

    async fn session_is_valid(&self, session: &Session) -> bool {
        if let Err(e) = self.page.restore_session(session).await {
            tracing::warn!("Could not restore stored session: {}", e);
            return false;
        }
        match self.page.is_authenticated().await {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!("Session check failed: {}", e);
                false
            }
        }
    }

    async fn race_outcomes(&self) -> varia_browser::Result<Detected> {
        tokio::select! {
            r = self.page.navigated_away() => r.map(|()| Detected::NavigatedAway),
            r = self.page.bad_credentials_shown() => r.map(|()| Detected::Rejected),
            r = self.page.validation_fired() => r.map(|()| Detected::ValidationFired),
        }
    }

    /// Whether the page has left the login surface, waiting at most
    /// [`NAVIGATION_CHECK`].
    async fn left_login(&self, remaining: Duration) -> bool {
        let window = NAVIGATION_CHECK.min(remaining);
        matches!(
            tokio::time::timeout(window, self.page.navigated_away()).await,
            Ok(Ok(()) | Err(BrowserError::ContextDestroyed(_)))
        )
    }

    /// Submit `credentials` until an outcome is detected or the budget runs out.
    pub async fn attempt_login(&mut self, credentials: &Credentials) -> Result<LoginOutcome> {
        let deadline = Instant::now() + self.config.login_budget;
        self.page.open_login().await?;
        let mut recheck = false;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!("Login budget of {:?} exhausted", self.config.login_budget);
                return Ok(LoginOutcome::Timeout);
            }

            // A redirect can land after the detector window closed.
            if recheck && self.left_login(remaining).await {
                tracing::debug!("Login page left after the detector window");
                return Ok(LoginOutcome::Success);
            }
            recheck = false;

            self.submissions += 1;
            match self.page.submit_login(credentials).await {
                Ok(()) => {}
                Err(BrowserError::ContextDestroyed(_)) => return Ok(LoginOutcome::Success),
                Err(e) => {
                    tracing::debug!("Submit failed: {}", e);
                    if self.left_login(remaining).await {
                        return Ok(LoginOutcome::Success);
                    }
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    tokio::time::sleep(ERROR_PAUSE.min(remaining)).await;
                    continue;
                }
            }

            let window = self.config.attempt_timeout.min(remaining);
            match tokio::time::timeout(window, self.race_outcomes()).await {
                Ok(Ok(Detected::NavigatedAway)) | Ok(Err(BrowserError::ContextDestroyed(_))) => {
                    return Ok(LoginOutcome::Success);
                }
                Ok(Ok(Detected::Rejected)) => return Ok(LoginOutcome::BadCredentials),
                Ok(Ok(Detected::ValidationFired)) => {
                    tracing::debug!("Form validation blocked the submit, refilling");
                }
                Ok(Err(e)) => {
                    tracing::debug!("Outcome detection failed: {}", e);
                    tokio::time::sleep(ERROR_PAUSE.min(remaining)).await;
                    recheck = true;
                }
                Err(_) => {
                    tracing::debug!("No login outcome within {:?}, resubmitting", window);
                    recheck = true;
                }
            }
        }
    }
}

#[async_trait]
impl<P, C> Authenticate for AuthHandshake<P, C>
where
    P: AuthPage,
    C: CredentialProvider,
{
    async fn authenticate(&mut self) -> Result<Session> {
        let outcome = self.run().await;
        if let Err(e) = self.page.close().await {
            tracing::warn!("Failed to close login page: {}", e);
        }
        outcome
    }
}
