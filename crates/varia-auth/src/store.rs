//! Best-effort persistence of the authenticated session.
//!
//! Failures never abort a run: a missing or unreadable blob means a fresh
//! login, and a failed save only costs a login on the next run.

use chrono::Utc;
use std::path::{Path, PathBuf};
use varia_browser::Session;

/// Session blob on local disk.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the blob.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session, if there is a usable one. Expired cookies are
    /// dropped; a session left with none loads as nothing.
    pub fn load(&self) -> Option<Session> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No stored session at {}", self.path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("Could not read session {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<Session>(&contents).map(|s| s.without_expired(Utc::now())) {
            Ok(session) if session.is_empty() => {
                tracing::debug!("Stored session has no live cookies");
                None
            }
            Ok(session) => {
                tracing::debug!(
                    "Loaded session with {} cookies saved at {}",
                    session.cookies.len(),
                    session.saved_at
                );
                Some(session)
            }
            Err(e) => {
                tracing::warn!("Ignoring corrupt session {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Persist `session`. Returns whether the write succeeded.
    pub fn save(&self, session: &Session) -> bool {
        match self.try_save(session) {
            Ok(()) => {
                tracing::info!("Session saved to {}", self.path.display());
                true
            }
            Err(e) => {
                tracing::warn!("Could not save session to {}: {}", self.path.display(), e);
                false
            }
        }
    }

    fn try_save(&self, session: &Session) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session).map_err(std::io::Error::other)?;
        std::fs::write(&self.path, json)
    }
}
