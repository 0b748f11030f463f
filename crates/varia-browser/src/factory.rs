//! Chromium-backed worker contexts.

use crate::engine::{BrowserContext, BrowserEngine};
use crate::error::Result;
use crate::extractor::{ContextFactory, FormatCyclingExtractor, PageExtractor, SnapshotExtractor};
use crate::session::Session;
use crate::settings::{AccountSettingsSwitcher, FormatSwitcher, SwitcherFactory};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use varia_core::{Format, Locator, ResultTree, SelectorConfig};

/// Which extractor variant workers run.
#[derive(Debug, Clone)]
pub enum ExtractionMode {
    /// The account format is switched between passes; read snapshots.
    Snapshot,
    /// No account state; cycle through `formats` on every target.
    FormatCycling { formats: Vec<Format> },
}

/// Builds one isolated [`BrowserContext`] per worker.
pub struct ChromiumContextFactory {
    engine: Arc<BrowserEngine>,
    selectors: SelectorConfig,
    format_wait: Duration,
    mode: ExtractionMode,
}

impl ChromiumContextFactory {
    pub fn new(
        engine: Arc<BrowserEngine>,
        selectors: SelectorConfig,
        format_wait: Duration,
        mode: ExtractionMode,
    ) -> Self {
        Self {
            engine,
            selectors,
            format_wait,
            mode,
        }
    }
}

/// Extractor over a chromium context, in either variant.
pub enum ChromiumExtractor {
    Snapshot(SnapshotExtractor<BrowserContext>),
    Cycling(FormatCyclingExtractor<BrowserContext>),
}

impl ChromiumExtractor {
    fn context(&self) -> &BrowserContext {
        match self {
            Self::Snapshot(extractor) => extractor.page(),
            Self::Cycling(extractor) => extractor.page(),
        }
    }
}

#[async_trait]
impl PageExtractor for ChromiumExtractor {
    async fn extract(&mut self, target: &Locator, expected: Option<&Format>) -> Result<ResultTree> {
        match self {
            Self::Snapshot(extractor) => extractor.extract(target, expected).await,
            Self::Cycling(extractor) => extractor.extract(target, expected).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.context().close().await
    }
}

#[async_trait]
impl ContextFactory for ChromiumContextFactory {
    type Context = ChromiumExtractor;

    async fn create(&self, worker_id: usize, session: Option<&Session>) -> Result<Self::Context> {
        let context = self.engine.new_context(session).await?;
        tracing::debug!(worker = worker_id, "Opened browser context");

        Ok(match &self.mode {
            ExtractionMode::Snapshot => ChromiumExtractor::Snapshot(SnapshotExtractor::new(
                context,
                self.selectors.clone(),
                self.format_wait,
            )),
            ExtractionMode::FormatCycling { formats } => {
                ChromiumExtractor::Cycling(FormatCyclingExtractor::new(
                    context,
                    self.selectors.clone(),
                    self.format_wait,
                    formats.clone(),
                ))
            }
        })
    }
}

/// Opens the account settings page on its own context.
pub struct ChromiumSwitcherFactory {
    engine: Arc<BrowserEngine>,
    selectors: SelectorConfig,
    format_wait: Duration,
    active: Option<Format>,
}

impl ChromiumSwitcherFactory {
    /// `active` is the format the account is configured with.
    pub fn new(
        engine: Arc<BrowserEngine>,
        selectors: SelectorConfig,
        format_wait: Duration,
        active: Option<Format>,
    ) -> Self {
        Self {
            engine,
            selectors,
            format_wait,
            active,
        }
    }
}

#[async_trait]
impl SwitcherFactory for ChromiumSwitcherFactory {
    async fn connect(&self, session: &Session) -> Result<Box<dyn FormatSwitcher>> {
        let context = self.engine.new_context(Some(session)).await?;
        tracing::debug!("Opened control-plane context");
        Ok(Box::new(AccountSettingsSwitcher::new(
            context,
            self.selectors.clone(),
            self.format_wait,
            self.active,
        )))
    }
}
