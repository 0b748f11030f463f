//! Control-plane format switching for account-level settings.

use crate::actions::BrowserActions;
use crate::error::Result;
use crate::extractor::await_format;
use crate::session::Session;
use async_trait::async_trait;
use std::time::Duration;
use varia_core::{Format, SelectorConfig};

/// Applies an account-wide format before a pass starts.
#[async_trait]
pub trait FormatSwitcher: Send {
    /// Make `format` the active account format and verify it took effect.
    async fn apply(&mut self, format: &Format) -> Result<()>;

    /// Release the control-plane page.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Opens the control-plane page once a session exists.
#[async_trait]
pub trait SwitcherFactory: Send + Sync {
    /// Open a switcher acting as the account behind `session`.
    async fn connect(&self, session: &Session) -> Result<Box<dyn FormatSwitcher>>;
}

/// Drives the account preferences page, changing only the dimensions that
/// differ from the active format.
pub struct AccountSettingsSwitcher<A> {
    page: A,
    selectors: SelectorConfig,
    format_wait: Duration,
    active: Option<Format>,
}

impl<A: BrowserActions> AccountSettingsSwitcher<A> {
    /// `active` is the format the account is known to be in, if any.
    pub fn new(page: A, selectors: SelectorConfig, format_wait: Duration, active: Option<Format>) -> Self {
        Self {
            page,
            selectors,
            format_wait,
            active,
        }
    }

    /// The format most recently applied.
    pub fn active(&self) -> Option<&Format> {
        self.active.as_ref()
    }

    /// The wrapped page.
    pub fn page(&self) -> &A {
        &self.page
    }

    fn option_selector(&self, value: &str) -> String {
        self.selectors.settings_option.replace("{key}", value)
    }
}

/// Per-dimension option keys that must be clicked to go from `from` to `to`.
fn changed_options(from: Option<&Format>, to: &Format) -> Vec<&'static str> {
    let mut options = Vec::new();
    if from.map(|f| f.framework) != Some(to.framework) {
        options.push(to.framework.as_str());
    }
    if from.map(|f| f.version) != Some(to.version) {
        options.push(to.version.as_str());
    }
    if let Some(mode) = to.mode {
        if from.and_then(|f| f.mode) != Some(mode) {
            options.push(mode.as_str());
        }
    }
    options
}

#[async_trait]
impl<A: BrowserActions + 'static> FormatSwitcher for AccountSettingsSwitcher<A> {
    async fn apply(&mut self, format: &Format) -> Result<()> {
        if self.active.as_ref() == Some(format) {
            tracing::debug!("Account already on {}", format);
            return Ok(());
        }

        tracing::info!(
            "Switching account format {} -> {}",
            self.active.map_or_else(|| "unknown".to_string(), |f| f.key()),
            format
        );

        self.page.navigate(&self.selectors.settings_url).await?;
        for option in changed_options(self.active.as_ref(), format) {
            self.page.click(&self.option_selector(option)).await?;
        }
        self.page.click(&self.selectors.settings_save).await?;
        await_format(&self.page, &self.selectors, format, self.format_wait).await?;

        self.active = Some(*format);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.page.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use varia_core::{Framework, MajorVersion, ThemeMode};

    #[test]
    fn test_changed_options_only_differences() {
        let from = Format::new(Framework::React, MajorVersion::V4, Some(ThemeMode::Dark));
        let to = Format::new(Framework::React, MajorVersion::V3, Some(ThemeMode::Dark));
        assert_eq!(changed_options(Some(&from), &to), vec!["v3"]);
    }

    #[test]
    fn test_changed_options_from_unknown() {
        let to = Format::new(Framework::Vue, MajorVersion::V4, None);
        assert_eq!(changed_options(None, &to), vec!["vue", "v4"]);
    }
}
