//! Browser collaborators for the extraction core.
//!
//! Provides headless Chromium control through isolated per-worker contexts,
//! the page extractors workers run, account format switching and target
//! discovery. Everything the core consumes is behind a trait so it can be
//! driven by in-memory fakes in tests.

pub mod actions;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod factory;
pub mod session;
pub mod settings;

pub use actions::{extract_domain, BrowserActions};
pub use discovery::{LinkDiscovery, StaticTargets, TargetDiscovery};
pub use engine::{BrowserContext, BrowserEngine};
pub use error::{BrowserError, Result};
pub use extractor::{
    await_format, observed_format, ContextFactory, FormatCyclingExtractor, PageExtractor,
    SnapshotExtractor,
};
pub use factory::{
    ChromiumContextFactory, ChromiumExtractor, ChromiumSwitcherFactory, ExtractionMode,
};
pub use session::{Session, StoredCookie};
pub use settings::{AccountSettingsSwitcher, FormatSwitcher, SwitcherFactory};
