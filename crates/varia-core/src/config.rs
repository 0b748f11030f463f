//! Configuration management for Varia.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Category, Format, Framework, Locator, MajorVersion, ThemeMode};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound on concurrent workers regardless of configuration.
pub const MAX_WORKERS: usize = 16;

/// Main application configuration.
///
/// This is loaded from `~/.config/varia/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General run settings
    pub general: GeneralConfig,
    /// What to extract and from where
    pub source: SourceConfig,
    /// Login and session settings
    pub auth: AuthConfig,
    /// Worker pool settings
    pub pool: PoolConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Currently active account format
    pub format: FormatConfig,
    /// Page selectors used by the extractors
    pub selectors: SelectorConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, falling back to defaults if
    /// the file does not exist.
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `VARIA_HEADLESS`: Override browser headless mode (true/false)
    /// - `VARIA_WORKERS`: Override the worker count
    /// - `VARIA_MAX_RETRIES`: Override the per-job retry limit
    /// - `VARIA_INTERACTIVE`: Override interactive prompting (true/false)
    /// - `VARIA_EMAIL` / `VARIA_PASSWORD`: Login credentials
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env();
        Ok(config)
    }

    /// Apply environment overrides to an already-loaded configuration.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("VARIA_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("VARIA_WORKERS") {
            if let Ok(workers) = val.parse() {
                self.pool.workers = workers;
                tracing::debug!("Override pool.workers from env: {}", workers);
            }
        }

        if let Ok(val) = std::env::var("VARIA_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.pool.max_retries = retries;
                tracing::debug!("Override pool.max_retries from env: {}", retries);
            }
        }

        if let Ok(val) = std::env::var("VARIA_INTERACTIVE") {
            if let Ok(interactive) = val.parse() {
                self.general.interactive = interactive;
                tracing::debug!("Override general.interactive from env: {}", interactive);
            }
        }

        if let Ok(email) = std::env::var("VARIA_EMAIL") {
            tracing::debug!("Using login identity from env");
            self.auth.email = Some(email);
        }

        if let Ok(password) = std::env::var("VARIA_PASSWORD") {
            tracing::debug!("Using login secret from env");
            self.auth.password = Some(password);
        }
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pool.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pool.workers".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.source.account_formats {
            self.format.current().map_err(|reason| ConfigError::InvalidValue {
                field: "format".to_string(),
                reason,
            })?;
        }

        for target in &self.source.targets {
            Locator::new(target.clone()).map_err(|e| ConfigError::InvalidValue {
                field: "source.targets".to_string(),
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/varia/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "varia", "varia").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/varia`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "varia", "varia").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Where the session blob lives: the configured path, or
    /// `<data_dir>/session.json`.
    pub fn session_path(&self) -> ConfigResult<PathBuf> {
        match &self.general.session_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("session.json")),
        }
    }
}

/// General run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory the merged output is written to
    pub output_dir: PathBuf,
    /// Session blob location (defaults under the data directory)
    pub session_path: Option<PathBuf>,
    /// Whether the run may prompt on the terminal
    pub interactive: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            session_path: None,
            interactive: false,
        }
    }
}

/// What to extract and from where.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Category being extracted
    pub category: Category,
    /// Whether the format is an account-level setting (requires login)
    pub account_formats: bool,
    /// Category index page used for target discovery
    pub index_url: String,
    /// Explicit target pages; when non-empty discovery is skipped
    pub targets: Vec<String>,
    /// Anchor selector on the index page pointing at target pages
    pub target_link_selector: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            category: Category::ApplicationUi,
            account_formats: true,
            index_url: "https://example.com/ui-blocks/application-ui".to_string(),
            targets: Vec::new(),
            target_link_selector: "a[data-target-link]".to_string(),
        }
    }
}

/// Login and session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Login page URL
    pub login_url: String,
    /// Protected page used to validate a stored session
    pub account_url: String,
    /// Login identity (usually overridden from env)
    pub email: Option<String>,
    /// Login secret (never written back to disk)
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// TOML file holding `identity` and `secret`
    pub credentials_file: Option<PathBuf>,
    /// Total time budget for one login attempt, in seconds
    pub login_timeout_secs: u64,
    /// Per-iteration outcome detection timeout, in milliseconds
    pub attempt_timeout_ms: u64,
    /// Identity input selector
    pub identity_input: String,
    /// Secret input selector
    pub secret_input: String,
    /// Submit button selector
    pub submit_button: String,
    /// Element shown when credentials are rejected
    pub bad_credentials_selector: String,
    /// Pattern the rejection message must match
    pub bad_credentials_pattern: String,
    /// Selector matching inputs flagged by client-side validation
    pub invalid_field_selector: String,
    /// Affordance only shown to anonymous visitors
    pub sign_in_marker: String,
    /// Affordance only shown to signed-in accounts
    pub account_marker: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_url: "https://example.com/login".to_string(),
            account_url: "https://example.com/account".to_string(),
            email: None,
            password: None,
            credentials_file: None,
            login_timeout_secs: 60,
            attempt_timeout_ms: 5000,
            identity_input: "input[name=email]".to_string(),
            secret_input: "input[name=password]".to_string(),
            submit_button: "button[type=submit]".to_string(),
            bad_credentials_selector: "[role=alert]".to_string(),
            bad_credentials_pattern: "(?i)credentials do not match".to_string(),
            invalid_field_selector: "input:invalid".to_string(),
            sign_in_marker: "a[href$='/login']".to_string(),
            account_marker: "a[href$='/account']".to_string(),
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of concurrent workers (capped at [`MAX_WORKERS`])
    pub workers: usize,
    /// Retries per job before it is dropped
    pub max_retries: u32,
    /// Per-attempt extraction timeout in seconds
    pub extraction_timeout_secs: u64,
    /// Bounded wait for a page to show the expected format, in milliseconds
    pub format_wait_ms: u64,
    /// Attempts at discovering targets before the run aborts
    pub discovery_attempts: u32,
    /// Base delay between discovery attempts, in milliseconds
    pub discovery_backoff_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_retries: 3,
            extraction_timeout_secs: 90,
            format_wait_ms: 15_000,
            discovery_attempts: 3,
            discovery_backoff_ms: 2000,
        }
    }
}

impl PoolConfig {
    /// Effective worker count for `pending` jobs.
    #[must_use]
    pub fn effective_workers(&self, pending: usize) -> usize {
        self.workers.clamp(1, MAX_WORKERS).min(pending)
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// User agent override
    pub user_agent: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 30,
            user_agent: None,
        }
    }
}

/// The account's currently active format, as last left by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Canonical format key, e.g. `react-v4-light`
    pub current: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            current: Format::new(Framework::React, MajorVersion::V4, Some(ThemeMode::Light)).key(),
        }
    }
}

impl FormatConfig {
    /// Parse the configured key.
    pub fn current(&self) -> Result<Format, String> {
        self.current.parse().map_err(|e: crate::VariaError| e.to_string())
    }
}

/// Page selectors used by the extractors and the format switcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// One element per item on a target page
    pub item: String,
    /// Attribute on the item holding its name
    pub item_name_attr: String,
    /// Element inside the item holding its code
    pub code: String,
    /// Attribute present when the item renders dark
    pub dark_mode_attr: String,
    /// Attribute present when the item's code can be downloaded
    pub downloadable_attr: String,
    /// Attribute present on preview-only items
    pub preview_attr: String,
    /// Element carrying the page's observed format
    pub format_marker: String,
    /// Attribute on the marker holding the format key
    pub format_marker_attr: String,
    /// In-page control for a format; `{key}` is replaced by the format key
    pub format_option: String,
    /// Account settings page for format changes
    pub settings_url: String,
    /// Settings control for a format; `{key}` is replaced by the format key
    pub settings_option: String,
    /// Settings save button
    pub settings_save: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            item: "[data-item]".to_string(),
            item_name_attr: "data-item-name".to_string(),
            code: "pre code".to_string(),
            dark_mode_attr: "data-dark".to_string(),
            downloadable_attr: "data-downloadable".to_string(),
            preview_attr: "data-preview".to_string(),
            format_marker: "[data-format]".to_string(),
            format_marker_attr: "data-format".to_string(),
            format_option: "[data-format-option='{key}']".to_string(),
            settings_url: "https://example.com/account/preferences".to_string(),
            settings_option: "[data-setting-option='{key}']".to_string(),
            settings_save: "button[data-settings-save]".to_string(),
        }
    }
}
