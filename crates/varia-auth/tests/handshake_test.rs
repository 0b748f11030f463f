use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use varia_auth::{
    AuthError, AuthHandshake, AuthPage, Authenticate, CredentialProvider, CredentialSource,
    Credentials, HandshakeConfig, HandshakeState, SessionStore,
};
use varia_browser::{BrowserError, Session, StoredCookie};
use varia_core::ErrorClass;

/// What the page does after a submit.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Outcome {
    Navigate,
    Reject,
    Validation,
    Silent,
    Destroyed,
}

struct ScriptedAuthPage {
    outcomes: Mutex<VecDeque<Outcome>>,
    current: Mutex<Outcome>,
    submitted: Mutex<Vec<String>>,
    restored: Mutex<Option<Session>>,
    authenticated: bool,
    closed: Mutex<usize>,
}

impl ScriptedAuthPage {
    fn new(outcomes: &[Outcome]) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.iter().copied().collect()),
            current: Mutex::new(Outcome::Silent),
            submitted: Mutex::new(Vec::new()),
            restored: Mutex::new(None),
            authenticated: false,
            closed: Mutex::new(0),
        }
    }

    fn signed_in(mut self) -> Self {
        self.authenticated = true;
        self
    }

    fn current(&self) -> Outcome {
        *self.current.lock().unwrap()
    }

    fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    fn closed(&self) -> usize {
        *self.closed.lock().unwrap()
    }
}

fn cookie(name: &str) -> StoredCookie {
    StoredCookie {
        name: name.to_string(),
        value: "token".to_string(),
        domain: "example.com".to_string(),
        path: "/".to_string(),
        expires: None,
        secure: true,
        http_only: true,
    }
}

#[async_trait]
impl AuthPage for ScriptedAuthPage {
    async fn restore_session(&self, session: &Session) -> varia_browser::Result<()> {
        *self.restored.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    async fn is_authenticated(&self) -> varia_browser::Result<bool> {
        Ok(self.authenticated)
    }

    async fn open_login(&self) -> varia_browser::Result<()> {
        Ok(())
    }

    async fn submit_login(&self, credentials: &Credentials) -> varia_browser::Result<()> {
        self.submitted
            .lock()
            .unwrap()
            .push(credentials.identity.clone());
        let next = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Silent);
        *self.current.lock().unwrap() = next;
        Ok(())
    }

    async fn navigated_away(&self) -> varia_browser::Result<()> {
        match self.current() {
            Outcome::Navigate => Ok(()),
            Outcome::Destroyed => Err(BrowserError::ContextDestroyed(
                "Execution context was destroyed".to_string(),
            )),
            _ => std::future::pending().await,
        }
    }

    async fn bad_credentials_shown(&self) -> varia_browser::Result<()> {
        match self.current() {
            Outcome::Reject => Ok(()),
            _ => std::future::pending().await,
        }
    }

    async fn validation_fired(&self) -> varia_browser::Result<()> {
        match self.current() {
            Outcome::Validation => Ok(()),
            _ => std::future::pending().await,
        }
    }

    async fn capture_session(&self) -> varia_browser::Result<Session> {
        Ok(Session::new(vec![cookie("fresh")]))
    }

    async fn close(&self) -> varia_browser::Result<()> {
        *self.closed.lock().unwrap() += 1;
        Ok(())
    }
}

struct ScriptedCredentials {
    interactive: bool,
    available: bool,
    retries: Mutex<VecDeque<Option<&'static str>>>,
}

impl ScriptedCredentials {
    fn batch() -> Self {
        Self {
            interactive: false,
            available: true,
            retries: Mutex::new(VecDeque::new()),
        }
    }

    fn interactive(retries: &[Option<&'static str>]) -> Self {
        Self {
            interactive: true,
            available: true,
            retries: Mutex::new(retries.iter().copied().collect()),
        }
    }
}

#[async_trait]
impl CredentialProvider for ScriptedCredentials {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    async fn resolve(&self) -> varia_auth::Result<Credentials> {
        if !self.available {
            return Err(AuthError::NoCredentials);
        }
        Ok(Credentials::new(
            "first@example.com",
            "pw",
            CredentialSource::File,
        ))
    }

    async fn retry_after_rejection(&self) -> varia_auth::Result<Option<Credentials>> {
        let next = self.retries.lock().unwrap().pop_front().flatten();
        Ok(next.map(|identity| Credentials::new(identity, "pw2", CredentialSource::Prompt)))
    }
}

fn fast_config() -> HandshakeConfig {
    HandshakeConfig {
        login_budget: Duration::from_secs(2),
        attempt_timeout: Duration::from_millis(500),
    }
}

fn store(tmp: &TempDir) -> SessionStore {
    SessionStore::new(tmp.path().join("session.json"))
}

#[tokio::test]
async fn test_non_interactive_bad_credentials_aborts_without_looping() {
    let tmp = TempDir::new().expect("create temp dir");
    let mut handshake = AuthHandshake::new(
        ScriptedAuthPage::new(&[Outcome::Reject]),
        ScriptedCredentials::batch(),
        store(&tmp),
        fast_config(),
    );

    let err = handshake.authenticate().await.expect_err("rejected");
    assert!(matches!(err, AuthError::BadCredentials { interactive: false }));
    assert_eq!(err.class(), ErrorClass::Fatal);
    assert_eq!(handshake.submissions(), 1);
    assert_eq!(handshake.state(), HandshakeState::Aborted);
    assert!(store(&tmp).load().is_none());
    assert_eq!(handshake.page().closed(), 1);
}

#[tokio::test]
async fn test_validation_resubmits_then_succeeds() {
    let tmp = TempDir::new().expect("create temp dir");
    let mut handshake = AuthHandshake::new(
        ScriptedAuthPage::new(&[Outcome::Validation, Outcome::Navigate]),
        ScriptedCredentials::batch(),
        store(&tmp),
        fast_config(),
    );

    let session = handshake.authenticate().await.expect("logged in");
    assert_eq!(session.cookies[0].name, "fresh");
    assert_eq!(handshake.submissions(), 2);
    assert_eq!(handshake.state(), HandshakeState::Authenticated);
    assert_eq!(store(&tmp).load(), Some(session));
    assert_eq!(handshake.page().closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_silent_page_times_out() {
    let tmp = TempDir::new().expect("create temp dir");
    let mut handshake = AuthHandshake::new(
        ScriptedAuthPage::new(&[]),
        ScriptedCredentials::batch(),
        store(&tmp),
        fast_config(),
    );

    let err = handshake.authenticate().await.expect_err("timed out");
    assert!(matches!(err, AuthError::LoginTimeout(budget) if budget == Duration::from_secs(2)));
    assert_eq!(err.class(), ErrorClass::Fatal);
    // Each silent iteration resubmits.
    assert!(handshake.submissions() > 1);
}

#[tokio::test]
async fn test_destroyed_context_counts_as_success() {
    let tmp = TempDir::new().expect("create temp dir");
    let mut handshake = AuthHandshake::new(
        ScriptedAuthPage::new(&[Outcome::Destroyed]),
        ScriptedCredentials::batch(),
        store(&tmp),
        fast_config(),
    );

    handshake.authenticate().await.expect("logged in");
    assert_eq!(handshake.submissions(), 1);
}

#[tokio::test]
async fn test_valid_stored_session_skips_login() {
    let tmp = TempDir::new().expect("create temp dir");
    let stored = Session::new(vec![cookie("stored")]);
    assert!(store(&tmp).save(&stored));

    let mut handshake = AuthHandshake::new(
        ScriptedAuthPage::new(&[]).signed_in(),
        ScriptedCredentials::batch(),
        store(&tmp),
        fast_config(),
    );

    let session = handshake.authenticate().await.expect("session reused");
    assert_eq!(session, stored);
    assert_eq!(handshake.submissions(), 0);
    assert_eq!(handshake.page().restored.lock().unwrap().clone(), Some(stored));
    assert_eq!(handshake.page().closed(), 1);
}

#[tokio::test]
async fn test_invalid_stored_session_logs_in_and_replaces_it() {
    let tmp = TempDir::new().expect("create temp dir");
    assert!(store(&tmp).save(&Session::new(vec![cookie("stale")])));

    let mut handshake = AuthHandshake::new(
        ScriptedAuthPage::new(&[Outcome::Navigate]),
        ScriptedCredentials::batch(),
        store(&tmp),
        fast_config(),
    );

    handshake.authenticate().await.expect("logged in");
    assert_eq!(handshake.submissions(), 1);
    let saved = store(&tmp).load().expect("session replaced");
    assert_eq!(saved.cookies[0].name, "fresh");
}

#[tokio::test]
async fn test_interactive_reprompt_uses_new_credentials() {
    let tmp = TempDir::new().expect("create temp dir");
    let mut handshake = AuthHandshake::new(
        ScriptedAuthPage::new(&[Outcome::Reject, Outcome::Navigate]),
        ScriptedCredentials::interactive(&[Some("second@example.com")]),
        store(&tmp),
        fast_config(),
    );

    handshake.authenticate().await.expect("logged in after reprompt");
    assert_eq!(
        handshake.page().submitted(),
        vec!["first@example.com".to_string(), "second@example.com".to_string()]
    );
}

#[tokio::test]
async fn test_interactive_decline_aborts() {
    let tmp = TempDir::new().expect("create temp dir");
    let mut handshake = AuthHandshake::new(
        ScriptedAuthPage::new(&[Outcome::Reject]),
        ScriptedCredentials::interactive(&[None]),
        store(&tmp),
        fast_config(),
    );

    let err = handshake.authenticate().await.expect_err("aborted");
    assert!(matches!(err, AuthError::Aborted));
    assert_eq!(handshake.state(), HandshakeState::Aborted);
    assert_eq!(handshake.submissions(), 1);
}

#[tokio::test]
async fn test_missing_credentials_is_fatal() {
    let tmp = TempDir::new().expect("create temp dir");
    let mut handshake = AuthHandshake::new(
        ScriptedAuthPage::new(&[]),
        ScriptedCredentials {
            available: false,
            ..ScriptedCredentials::batch()
        },
        store(&tmp),
        fast_config(),
    );

    let err = handshake.authenticate().await.expect_err("no credentials");
    assert!(matches!(err, AuthError::NoCredentials));
    assert_eq!(err.class(), ErrorClass::Fatal);
}

/// Accepts the first submit, then redirects at `lands_at`. The form is gone
/// for every later submit.
struct LateRedirectPage {
    lands_at: tokio::time::Instant,
    submits: Mutex<usize>,
}

impl LateRedirectPage {
    fn landing_after(delay: Duration) -> Self {
        Self {
            lands_at: tokio::time::Instant::now() + delay,
            submits: Mutex::new(0),
        }
    }
}

#[async_trait]
impl AuthPage for LateRedirectPage {
    async fn restore_session(&self, _session: &Session) -> varia_browser::Result<()> {
        Ok(())
    }

    async fn is_authenticated(&self) -> varia_browser::Result<bool> {
        Ok(false)
    }

    async fn open_login(&self) -> varia_browser::Result<()> {
        Ok(())
    }

    async fn submit_login(&self, _credentials: &Credentials) -> varia_browser::Result<()> {
        let mut submits = self.submits.lock().unwrap();
        *submits += 1;
        if *submits == 1 {
            Ok(())
        } else {
            Err(BrowserError::SelectorNotFound("input[name=email]".to_string()))
        }
    }

    async fn navigated_away(&self) -> varia_browser::Result<()> {
        tokio::time::sleep_until(self.lands_at).await;
        Ok(())
    }

    async fn bad_credentials_shown(&self) -> varia_browser::Result<()> {
        std::future::pending().await
    }

    async fn validation_fired(&self) -> varia_browser::Result<()> {
        std::future::pending().await
    }

    async fn capture_session(&self) -> varia_browser::Result<Session> {
        Ok(Session::new(vec![cookie("late")]))
    }
}

fn slow_redirect_config() -> HandshakeConfig {
    HandshakeConfig {
        login_budget: Duration::from_secs(60),
        attempt_timeout: Duration::from_secs(5),
    }
}

#[tokio::test(start_paused = true)]
async fn test_redirect_after_detector_window_is_success() {
    let tmp = TempDir::new().expect("create temp dir");
    let mut handshake = AuthHandshake::new(
        LateRedirectPage::landing_after(Duration::from_millis(5200)),
        ScriptedCredentials::batch(),
        store(&tmp),
        slow_redirect_config(),
    );

    let session = handshake.authenticate().await.expect("logged in");
    assert_eq!(session.cookies[0].name, "late");
    assert_eq!(handshake.submissions(), 1);
    assert_eq!(handshake.state(), HandshakeState::Authenticated);
}

#[tokio::test(start_paused = true)]
async fn test_failed_resubmit_on_left_page_is_success() {
    let tmp = TempDir::new().expect("create temp dir");
    let mut handshake = AuthHandshake::new(
        LateRedirectPage::landing_after(Duration::from_millis(5800)),
        ScriptedCredentials::batch(),
        store(&tmp),
        slow_redirect_config(),
    );

    handshake.authenticate().await.expect("logged in");
    // One accepted submit, one that found no form.
    assert_eq!(handshake.submissions(), 2);
    assert!(store(&tmp).load().is_some());
}
