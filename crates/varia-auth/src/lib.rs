//! Varia Authentication Layer
//!
//! Establishes the one authenticated session an extraction run shares
//! between all of its workers.
//!
//! # Handshake
//!
//! 1. **Stored session**: loaded from disk and checked against a protected page
//! 2. **Credentials**: config/env values, a credentials file, or a prompt
//! 3. **Login attempt**: submit and race the page outcomes within a budget
//! 4. **Reprompt**: interactive runs may retry after a rejection
//!
//! # Session Persistence
//!
//! - A successful login overwrites the stored session (best effort)
//! - Missing or corrupt session files mean a fresh login, never an error
//! - Secrets are zeroized on drop and never written to disk

pub mod credentials;
pub mod error;
pub mod handshake;
pub mod page;
pub mod store;

pub use credentials::{CredentialProvider, CredentialResolver, CredentialSource, Credentials};
pub use error::{AuthError, Result};
pub use handshake::{
    AuthHandshake, Authenticate, HandshakeConfig, HandshakeState, LoginOutcome,
};
pub use page::{AuthPage, ChromiumAuthPage};
pub use store::SessionStore;
