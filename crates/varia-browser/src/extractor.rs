//! Page extraction capabilities consumed by the worker pool.
//!
//! Two variants exist: [`SnapshotExtractor`] assumes the account format is
//! already set and verifies the page shows it before reading, while
//! [`FormatCyclingExtractor`] switches formats itself through in-page
//! controls and captures every variant of a target in one visit.

use crate::actions::{js_string, BrowserActions};
use crate::error::{BrowserError, Result};
use crate::session::Session;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use varia_core::{Format, Locator, ResultTree, SelectorConfig, Snippet};

/// Polling interval while waiting for a page to converge on a format.
const FORMAT_POLL: Duration = Duration::from_millis(200);

/// Reads one target into a partial result.
#[async_trait]
pub trait PageExtractor: Send {
    /// Extract every item on `target`.
    ///
    /// With `expected` set, the page must converge to that format within the
    /// bounded wait or [`BrowserError::FormatMismatch`] is returned.
    async fn extract(&mut self, target: &Locator, expected: Option<&Format>) -> Result<ResultTree>;

    /// Release the underlying execution context.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Creates one isolated execution context per worker.
#[async_trait]
pub trait ContextFactory: Send + Sync {
    /// The per-worker extractor.
    type Context: PageExtractor + 'static;

    /// Create the context for `worker_id`, cloned from `session` when given.
    async fn create(&self, worker_id: usize, session: Option<&Session>) -> Result<Self::Context>;
}

/// Item as reported by the in-page collection script.
#[derive(Debug, Deserialize)]
struct RawItem {
    name: String,
    code: String,
    dark_mode: bool,
    downloadable: bool,
    preview: bool,
}

/// Script collecting every item on the page.
fn items_script(selectors: &SelectorConfig) -> String {
    format!(
        "(() => Array.from(document.querySelectorAll({item})).map(el => {{ \
           const code = el.querySelector({code}); \
           return {{ \
             name: el.getAttribute({name}) || '', \
             code: code ? code.textContent : '', \
             dark_mode: el.hasAttribute({dark}), \
             downloadable: el.hasAttribute({download}), \
             preview: el.hasAttribute({preview}) \
           }}; \
         }}))()",
        item = js_string(&selectors.item),
        code = js_string(&selectors.code),
        name = js_string(&selectors.item_name_attr),
        dark = js_string(&selectors.dark_mode_attr),
        download = js_string(&selectors.downloadable_attr),
        preview = js_string(&selectors.preview_attr),
    )
}

/// Script reading the format key the page currently shows.
fn format_script(selectors: &SelectorConfig) -> String {
    format!(
        "(() => {{ const el = document.querySelector({marker}); \
         return el ? el.getAttribute({attr}) : null; }})()",
        marker = js_string(&selectors.format_marker),
        attr = js_string(&selectors.format_marker_attr),
    )
}

/// The format the page currently shows, if it shows a parsable one.
pub async fn observed_format<A: BrowserActions + ?Sized>(
    page: &A,
    selectors: &SelectorConfig,
) -> Result<Option<Format>> {
    let value = page.evaluate(&format_script(selectors)).await?;
    Ok(value.as_str().and_then(|key| key.parse().ok()))
}

/// Poll until the page shows `expected`, failing after `wait`.
pub async fn await_format<A: BrowserActions + ?Sized>(
    page: &A,
    selectors: &SelectorConfig,
    expected: &Format,
    wait: Duration,
) -> Result<()> {
    let deadline = Instant::now() + wait;
    loop {
        let observed = observed_format(page, selectors).await?;
        if observed.as_ref() == Some(expected) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(BrowserError::FormatMismatch {
                expected: expected.key(),
                observed: observed.map_or_else(|| "nothing".to_string(), |f| f.key()),
            });
        }
        tokio::time::sleep(FORMAT_POLL).await;
    }
}

async fn read_items<A: BrowserActions + ?Sized>(
    page: &A,
    selectors: &SelectorConfig,
) -> Result<Vec<RawItem>> {
    let value = page.evaluate(&items_script(selectors)).await?;
    serde_json::from_value(value).map_err(|e| BrowserError::Script(e.to_string()))
}

fn insert_items(tree: &mut ResultTree, target: &Locator, format: &Format, items: Vec<RawItem>) {
    let path = target.tree_path();
    for item in items {
        if item.name.is_empty() {
            tracing::debug!("Skipping unnamed item on {}", target);
            continue;
        }
        tree.insert_snippet(
            &path,
            &item.name,
            Snippet {
                code: item.code,
                framework: format.framework,
                version: format.version,
                mode: format.mode,
                dark_mode: item.dark_mode,
                downloadable: item.downloadable,
            },
        );
    }
}

/// Reads a target under the format that is already globally active.
pub struct SnapshotExtractor<A> {
    page: A,
    selectors: SelectorConfig,
    format_wait: Duration,
}

impl<A: BrowserActions> SnapshotExtractor<A> {
    pub fn new(page: A, selectors: SelectorConfig, format_wait: Duration) -> Self {
        Self {
            page,
            selectors,
            format_wait,
        }
    }

    /// The wrapped page.
    pub fn page(&self) -> &A {
        &self.page
    }
}

#[async_trait]
impl<A: BrowserActions + 'static> PageExtractor for SnapshotExtractor<A> {
    async fn extract(&mut self, target: &Locator, expected: Option<&Format>) -> Result<ResultTree> {
        self.page.navigate(target.as_str()).await?;

        let format = match expected {
            Some(format) => {
                await_format(&self.page, &self.selectors, format, self.format_wait).await?;
                *format
            }
            None => observed_format(&self.page, &self.selectors)
                .await?
                .ok_or_else(|| BrowserError::FormatMismatch {
                    expected: "any".to_string(),
                    observed: "nothing".to_string(),
                })?,
        };

        let items = read_items(&self.page, &self.selectors).await?;
        tracing::debug!("Read {} items from {} as {}", items.len(), target, format);

        let mut tree = ResultTree::new();
        insert_items(&mut tree, target, &format, items);
        Ok(tree)
    }
}

/// Visits a target once and captures it under every format in turn.
///
/// The anonymous source reports a baseline entry on every page that belongs
/// to no format: it is flagged preview and is not downloadable. Such items
/// are dropped here.
pub struct FormatCyclingExtractor<A> {
    page: A,
    selectors: SelectorConfig,
    format_wait: Duration,
    formats: Vec<Format>,
}

impl<A: BrowserActions> FormatCyclingExtractor<A> {
    pub fn new(page: A, selectors: SelectorConfig, format_wait: Duration, formats: Vec<Format>) -> Self {
        Self {
            page,
            selectors,
            format_wait,
            formats,
        }
    }

    /// The wrapped page.
    pub fn page(&self) -> &A {
        &self.page
    }

    fn option_selector(&self, format: &Format) -> String {
        self.selectors.format_option.replace("{key}", &format.key())
    }
}

#[async_trait]
impl<A: BrowserActions + 'static> PageExtractor for FormatCyclingExtractor<A> {
    async fn extract(&mut self, target: &Locator, _expected: Option<&Format>) -> Result<ResultTree> {
        self.page.navigate(target.as_str()).await?;

        let mut tree = ResultTree::new();
        for format in &self.formats {
            if observed_format(&self.page, &self.selectors).await?.as_ref() != Some(format) {
                self.page.click(&self.option_selector(format)).await?;
                await_format(&self.page, &self.selectors, format, self.format_wait).await?;
            }

            let items: Vec<RawItem> = read_items(&self.page, &self.selectors)
                .await?
                .into_iter()
                .filter(|item| item.downloadable || !item.preview)
                .collect();
            tracing::debug!("Read {} items from {} as {}", items.len(), target, format);
            insert_items(&mut tree, target, format, items);
        }
        Ok(tree)
    }
}
