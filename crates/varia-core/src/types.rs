//! Shared types used across the Varia workspace.
//!
//! This module defines the format dimensions, the [`Format`] combination
//! value, source categories, validated target locators and snippets.

use crate::error::VariaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target framework a snippet is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framework {
    /// Plain HTML markup
    Html,
    /// React components
    React,
    /// Vue components
    Vue,
}

impl Framework {
    /// All frameworks in declaration order.
    pub const ALL: [Self; 3] = [Self::Html, Self::React, Self::Vue];

    /// Canonical lowercase key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::React => "react",
            Self::Vue => "vue",
        }
    }
}

/// Major version of the styling library a snippet targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MajorVersion {
    /// Version 3
    V3,
    /// Version 4
    V4,
}

impl MajorVersion {
    /// All versions in declaration order.
    pub const ALL: [Self; 2] = [Self::V3, Self::V4];

    /// Canonical lowercase key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V3 => "v3",
            Self::V4 => "v4",
        }
    }
}

/// Color scheme a snippet is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    /// Light color scheme
    Light,
    /// Dark color scheme
    Dark,
    /// Follows the system preference
    System,
}

impl ThemeMode {
    /// All modes in declaration order.
    pub const ALL: [Self; 3] = [Self::Light, Self::Dark, Self::System];

    /// Canonical lowercase key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

/// One combination of output-variant dimensions.
///
/// `mode` is `None` for categories whose items have no theme mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Format {
    /// Target framework
    pub framework: Framework,
    /// Major library version
    pub version: MajorVersion,
    /// Theme mode, absent for unthemed categories
    pub mode: Option<ThemeMode>,
}

impl Format {
    /// Create a new format.
    #[must_use]
    pub fn new(framework: Framework, version: MajorVersion, mode: Option<ThemeMode>) -> Self {
        Self {
            framework,
            version,
            mode,
        }
    }

    /// Canonical string key derived from every dimension, e.g. `react-v4-dark`.
    #[must_use]
    pub fn key(&self) -> String {
        match self.mode {
            Some(mode) => format!(
                "{}-{}-{}",
                self.framework.as_str(),
                self.version.as_str(),
                mode.as_str()
            ),
            None => format!("{}-{}", self.framework.as_str(), self.version.as_str()),
        }
    }

    /// Number of dimensions whose values differ between two formats.
    #[must_use]
    pub fn distance(&self, other: &Self) -> usize {
        usize::from(self.framework != other.framework)
            + usize::from(self.version != other.version)
            + usize::from(self.mode != other.mode)
    }

    /// Drop the mode dimension when the category has none.
    #[must_use]
    pub fn for_category(mut self, category: Category) -> Self {
        if !category.has_theme_modes() {
            self.mode = None;
        }
        self
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Format {
    type Err = VariaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VariaError::Validation(format!("invalid format key '{s}'"));
        let mut parts = s.split('-');

        let framework = match parts.next() {
            Some(part) => Framework::ALL
                .into_iter()
                .find(|f| f.as_str() == part)
                .ok_or_else(invalid)?,
            None => return Err(invalid()),
        };
        let version = match parts.next() {
            Some(part) => MajorVersion::ALL
                .into_iter()
                .find(|v| v.as_str() == part)
                .ok_or_else(invalid)?,
            None => return Err(invalid()),
        };
        let mode = match parts.next() {
            Some(part) => Some(
                ThemeMode::ALL
                    .into_iter()
                    .find(|m| m.as_str() == part)
                    .ok_or_else(invalid)?,
            ),
            None => None,
        };

        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self::new(framework, version, mode))
    }
}

/// Source category of the extracted items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Application UI components
    ApplicationUi,
    /// Marketing page sections
    Marketing,
    /// Ecommerce components (no theme modes)
    Ecommerce,
}

impl Category {
    /// Whether items of this category are served in several theme modes.
    #[must_use]
    pub fn has_theme_modes(self) -> bool {
        !matches!(self, Self::Ecommerce)
    }

    /// Canonical kebab-case key, also used as the output file stem.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApplicationUi => "application-ui",
            Self::Marketing => "marketing",
            Self::Ecommerce => "ecommerce",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Newtype for target page locators with validation.
///
/// Locators must be absolute `http`/`https` URLs with at least three path
/// segments; the last three name the group, subgroup and sub-subgroup the
/// page's items are filed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locator(String);

impl Locator {
    /// Create a new `Locator` from a string.
    ///
    /// # Errors
    /// Returns error if the string is not an http(s) URL with at least three
    /// path segments.
    pub fn new(url: impl Into<String>) -> Result<Self, VariaError> {
        let url = url.into();
        Self::validate(&url)?;
        Ok(Self(url))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The group, subgroup and sub-subgroup names for this page.
    #[must_use]
    pub fn tree_path(&self) -> [String; 3] {
        let segments = Self::segments(&self.0);
        let n = segments.len();
        [
            segments[n - 3].clone(),
            segments[n - 2].clone(),
            segments[n - 1].clone(),
        ]
    }

    fn segments(url: &str) -> Vec<String> {
        url::Url::parse(url)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .map(|segs| segs.filter(|s| !s.is_empty()).map(String::from).collect())
            })
            .unwrap_or_default()
    }

    fn validate(url: &str) -> Result<(), VariaError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| VariaError::Validation(format!("invalid locator '{url}': {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(VariaError::Validation(format!(
                "invalid locator '{url}': scheme must be http or https"
            )));
        }

        if Self::segments(url).len() < 3 {
            return Err(VariaError::Validation(format!(
                "invalid locator '{url}': needs at least three path segments"
            )));
        }

        Ok(())
    }
}

impl TryFrom<String> for Locator {
    type Error = VariaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One code variant of one item under one format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Source code of the variant
    pub code: String,
    /// Framework the code is written for
    pub framework: Framework,
    /// Library major version
    pub version: MajorVersion,
    /// Theme mode, absent for unthemed categories
    pub mode: Option<ThemeMode>,
    /// Whether the item renders in dark colors
    pub dark_mode: bool,
    /// Whether the source offered this variant for download
    pub downloadable: bool,
}

impl Snippet {
    /// The format this snippet was captured under.
    #[must_use]
    pub fn format(&self) -> Format {
        Format::new(self.framework, self.version, self.mode)
    }
}
