//! Varia Application Shell
//!
//! This is the thin application shell that loads configuration, wires the
//! Chromium-backed collaborators into the orchestrator and writes the output.
//! Core logic lives in the `crates/` directory.

pub mod output;

use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use varia_auth::{
    AuthHandshake, ChromiumAuthPage, CredentialResolver, HandshakeConfig, SessionStore,
};
use varia_browser::{
    BrowserContext, BrowserEngine, ChromiumContextFactory, ChromiumSwitcherFactory,
    ExtractionMode, LinkDiscovery, StaticTargets, TargetDiscovery,
};
use varia_core::{AppConfig, Category, Locator};
use varia_extract::{Orchestrator, RunReport, RunSettings};
use varia_scheduler::FormatScheduler;

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,varia=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Where targets come from: configuration or the category index page.
pub enum Discovery {
    Static(StaticTargets),
    Links(LinkDiscovery<BrowserContext>),
}

#[async_trait]
impl TargetDiscovery for Discovery {
    async fn discover(&self, category: Category) -> varia_browser::Result<Vec<Locator>> {
        match self {
            Self::Static(targets) => targets.discover(category).await,
            Self::Links(links) => links.discover(category).await,
        }
    }

    async fn close(&self) -> varia_browser::Result<()> {
        match self {
            Self::Static(targets) => targets.close().await,
            Self::Links(links) => links.close().await,
        }
    }
}

/// Targets listed in configuration, if any.
pub fn static_targets(config: &AppConfig) -> anyhow::Result<Option<StaticTargets>> {
    if config.source.targets.is_empty() {
        return Ok(None);
    }
    let targets = config
        .source
        .targets
        .iter()
        .map(|t| Locator::new(t.as_str()).with_context(|| format!("invalid target {t}")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Some(StaticTargets(targets)))
}

async fn discovery(config: &AppConfig, engine: &Arc<BrowserEngine>) -> anyhow::Result<Discovery> {
    if let Some(targets) = static_targets(config)? {
        info!("Using {} configured targets", targets.0.len());
        return Ok(Discovery::Static(targets));
    }
    let context = engine
        .new_context(None)
        .await
        .context("opening discovery context")?;
    Ok(Discovery::Links(LinkDiscovery::new(
        context,
        config.source.index_url.clone(),
        config.source.target_link_selector.clone(),
    )))
}

/// Build the orchestrator for `config` and run it.
async fn extract(
    config: &AppConfig,
    settings: RunSettings,
    engine: &Arc<BrowserEngine>,
) -> anyhow::Result<RunReport> {
    let format_wait = Duration::from_millis(config.pool.format_wait_ms);
    let current = settings.current.for_category(settings.category);
    let account_formats = settings.account_formats;

    let mode = if account_formats {
        ExtractionMode::Snapshot
    } else {
        ExtractionMode::FormatCycling {
            formats: FormatScheduler::sequence(current, settings.category),
        }
    };
    let factory = Arc::new(ChromiumContextFactory::new(
        engine.clone(),
        config.selectors.clone(),
        format_wait,
        mode,
    ));

    let mut orchestrator = Orchestrator::new(settings, factory, discovery(config, engine).await?);

    if account_formats {
        let context = engine
            .new_context(None)
            .await
            .context("opening login context")?;
        let page = ChromiumAuthPage::new(context, config.auth.clone())?;
        let store = SessionStore::new(config.session_path()?);
        let credentials = CredentialResolver::new(
            config.auth.email.clone(),
            config.auth.password.clone(),
            config.auth.credentials_file.clone(),
            config.general.interactive,
        );
        let handshake =
            AuthHandshake::new(page, credentials, store, HandshakeConfig::from(&config.auth));
        let switchers = ChromiumSwitcherFactory::new(
            engine.clone(),
            config.selectors.clone(),
            format_wait,
            Some(current),
        );
        orchestrator = orchestrator.with_account(handshake, switchers);
    }

    let report = orchestrator.run().await?;
    Ok(report)
}

/// Load configuration, run one extraction and write its output.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Varia v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_with_env().context("loading configuration")?;
    config.validate().context("invalid configuration")?;
    let settings = RunSettings::from_config(&config)?;

    let engine = Arc::new(
        BrowserEngine::launch(&config.browser)
            .await
            .context("launching browser")?,
    );

    let result = extract(&config, settings, &engine).await;

    match Arc::try_unwrap(engine) {
        Ok(engine) => engine.shutdown().await,
        Err(_) => warn!("Browser engine still referenced at exit, not shutting down"),
    }

    let report = result?;
    let paths = output::write_run(&config.general.output_dir, &report)
        .with_context(|| format!("writing output to {}", config.general.output_dir.display()))?;

    info!(
        "Wrote {} leaves ({} snippets) to {}",
        report.leaves,
        report.snippets,
        paths.tree.display()
    );
    if report.dropped() > 0 {
        warn!(
            "{} jobs were dropped after exhausting retries, see {}",
            report.dropped(),
            paths.report.display()
        );
    }
    Ok(())
}
