//! Credential resolution.
//!
//! Credentials come from configuration (env or config file values), from a
//! dedicated TOML credentials file, or from a terminal prompt in interactive
//! runs. They are never persisted and the secret is zeroized on drop.

use crate::error::{AuthError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use zeroize::Zeroizing;

/// Where a set of credentials came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Configuration, environment or credentials file
    File,
    /// Typed in at the terminal
    Prompt,
}

/// Login identity and secret, held only for the duration of a handshake.
pub struct Credentials {
    /// Login identity (email)
    pub identity: String,
    secret: Zeroizing<String>,
    /// Where these came from
    pub source: CredentialSource,
}

impl Credentials {
    /// Create a new credential pair.
    #[must_use]
    pub fn new(identity: impl Into<String>, secret: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            identity: identity.into(),
            secret: Zeroizing::new(secret.into()),
            source,
        }
    }

    /// The secret, for filling the login form.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Supplies credentials to the handshake.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Whether the user can be asked for input.
    fn is_interactive(&self) -> bool;

    /// Initial credentials for a login attempt.
    async fn resolve(&self) -> Result<Credentials>;

    /// After a rejection: new credentials, or `None` to abort.
    async fn retry_after_rejection(&self) -> Result<Option<Credentials>>;
}

#[derive(Deserialize)]
struct CredentialsFile {
    identity: String,
    secret: String,
}

/// Resolves credentials from config values, a credentials file, then the
/// terminal when interactive.
pub struct CredentialResolver {
    identity: Option<String>,
    secret: Option<Zeroizing<String>>,
    file: Option<PathBuf>,
    interactive: bool,
}

impl CredentialResolver {
    pub fn new(
        identity: Option<String>,
        secret: Option<String>,
        file: Option<PathBuf>,
        interactive: bool,
    ) -> Self {
        Self {
            identity,
            secret: secret.map(Zeroizing::new),
            file,
            interactive,
        }
    }

    fn from_values(&self) -> Option<Credentials> {
        match (&self.identity, &self.secret) {
            (Some(identity), Some(secret)) => Some(Credentials::new(
                identity.clone(),
                secret.as_str(),
                CredentialSource::File,
            )),
            _ => None,
        }
    }

    fn from_file(&self) -> Result<Option<Credentials>> {
        let Some(path) = &self.file else {
            return Ok(None);
        };
        let file_error = |reason: String| AuthError::CredentialsFile {
            path: path.display().to_string(),
            reason,
        };

        let contents = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?);
        let parsed: CredentialsFile = toml::from_str(&contents).map_err(|e| file_error(e.to_string()))?;
        let secret = Zeroizing::new(parsed.secret);

        Ok(Some(Credentials::new(
            parsed.identity,
            secret.as_str(),
            CredentialSource::File,
        )))
    }

    async fn prompt() -> Result<Credentials> {
        tokio::task::spawn_blocking(|| {
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            read_credentials(&mut stdin.lock(), &mut stdout, |question| {
                rpassword::prompt_password(question)
            })
        })
        .await
        .map_err(|e| AuthError::Prompt(std::io::Error::other(e)))?
    }

    async fn confirm_retry() -> Result<bool> {
        tokio::task::spawn_blocking(|| {
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            let answer = ask(
                &mut stdin.lock(),
                &mut stdout,
                "Credentials were rejected. Try different ones? [y/N] ",
            )?;
            Ok(is_yes(&answer))
        })
        .await
        .map_err(|e| AuthError::Prompt(std::io::Error::other(e)))?
    }
}

/// Ask for the identity on `input`. The secret goes through `read_secret`,
/// which reads from the terminal without echo.
fn read_credentials(
    input: &mut impl BufRead,
    output: &mut impl Write,
    read_secret: impl FnOnce(&str) -> std::io::Result<String>,
) -> Result<Credentials> {
    let identity = ask(input, output, "Email: ")?;
    let secret = Zeroizing::new(read_secret("Password: ")?);
    Ok(Credentials::new(identity, secret.as_str(), CredentialSource::Prompt))
}

/// Print `question` and read one trimmed line.
fn ask(input: &mut impl BufRead, output: &mut impl Write, question: &str) -> Result<String> {
    write!(output, "{question}")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
}

#[async_trait]
impl CredentialProvider for CredentialResolver {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    async fn resolve(&self) -> Result<Credentials> {
        if let Some(credentials) = self.from_values() {
            tracing::debug!("Using configured credentials");
            return Ok(credentials);
        }
        if let Some(credentials) = self.from_file()? {
            tracing::debug!("Using credentials file");
            return Ok(credentials);
        }
        if self.interactive {
            return Self::prompt().await;
        }
        Err(AuthError::NoCredentials)
    }

    async fn retry_after_rejection(&self) -> Result<Option<Credentials>> {
        if !self.interactive {
            return Ok(None);
        }
        if Self::confirm_retry().await? {
            Ok(Some(Self::prompt().await?))
        } else {
            Ok(None)
        }
    }
}
