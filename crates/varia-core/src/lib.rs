//! Varia Core - Foundation crate for the Varia extraction workspace.
//!
//! This crate provides shared types, the result tree, error handling and
//! configuration management that all other Varia crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Format dimensions, `Category`, `Locator`, `Snippet`
//! - [`tree`] - The four-level result tree produced by extraction
//!
//! # Example
//!
//! ```rust
//! use varia_core::{AppConfig, Format};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let current: Format = config.format.current.parse()?;
//! println!("account format: {current}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod tree;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, AuthConfig, BrowserConfig, FormatConfig, GeneralConfig, PoolConfig,
    SelectorConfig, SourceConfig, MAX_WORKERS,
};
pub use error::{ConfigError, ConfigResult, ErrorClass, Result, VariaError};
pub use tree::{LeafEntry, ResultNode, ResultTree};
pub use types::{Category, Format, Framework, Locator, MajorVersion, Snippet, ThemeMode};
