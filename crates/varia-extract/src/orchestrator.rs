//! Run orchestration.
//!
//! A run authenticates once, discovers its targets, then runs one pool pass
//! per format. Between passes the account format is switched from a single
//! control-plane page; each pass's pool is fully stopped before the next
//! switch. Without account formats the run makes one format-agnostic pass.

use crate::error::{ExtractError, Result};
use crate::host::RunHost;
use crate::job::Job;
use crate::merger::{count, deduplicate};
use crate::pool::WorkerPool;
use crate::report::{PassReport, RunReport};
use crate::retry::retry_with_backoff;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;
use varia_auth::Authenticate;
use varia_browser::{ContextFactory, FormatSwitcher, Session, SwitcherFactory, TargetDiscovery};
use varia_core::{AppConfig, Category, ConfigError, Format, Locator, PoolConfig, VariaError};
use varia_scheduler::FormatScheduler;

/// What a run extracts and how hard it tries.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub category: Category,
    /// Format the account is in when the run starts
    pub current: Format,
    /// Whether formats are account state that must be switched between passes
    pub account_formats: bool,
    pub pool: PoolConfig,
}

impl RunSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let current = config.format.current().map_err(|reason| {
            VariaError::Config(ConfigError::InvalidValue {
                field: "format.current".to_string(),
                reason,
            })
        })?;
        Ok(Self {
            category: config.source.category,
            current,
            account_formats: config.source.account_formats,
            pool: config.pool.clone(),
        })
    }

    /// Formats to run one pass each for; `None` is the format-agnostic pass.
    #[must_use]
    pub fn passes(&self) -> Vec<Option<Format>> {
        if self.account_formats {
            FormatScheduler::sequence(self.current, self.category)
                .into_iter()
                .map(Some)
                .collect()
        } else {
            vec![None]
        }
    }
}

/// Drives a whole extraction run.
pub struct Orchestrator<F, D> {
    settings: RunSettings,
    factory: Arc<F>,
    discovery: D,
    auth: Option<Box<dyn Authenticate>>,
    switchers: Option<Box<dyn SwitcherFactory>>,
}

impl<F, D> Orchestrator<F, D>
where
    F: ContextFactory + 'static,
    D: TargetDiscovery,
{
    pub fn new(settings: RunSettings, factory: Arc<F>, discovery: D) -> Self {
        Self {
            settings,
            factory,
            discovery,
            auth: None,
            switchers: None,
        }
    }

    /// Log in before extracting and switch account formats between passes.
    #[must_use]
    pub fn with_account(
        mut self,
        auth: impl Authenticate + 'static,
        switchers: impl SwitcherFactory + 'static,
    ) -> Self {
        self.auth = Some(Box::new(auth));
        self.switchers = Some(Box::new(switchers));
        self
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Run to completion and return the merged tree with its report.
    pub async fn run(&mut self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "run",
            run_id = %run_id,
            category = %self.settings.category
        );
        self.execute(run_id).instrument(span).await
    }

    async fn execute(&mut self, run_id: Uuid) -> Result<RunReport> {
        let started = Instant::now();
        let passes = self.settings.passes();
        if self.settings.account_formats && (self.auth.is_none() || self.switchers.is_none()) {
            return Err(VariaError::Validation(
                "account formats require a login and a format switcher".to_string(),
            )
            .into());
        }

        let session = match self.auth.as_mut() {
            Some(auth) => Some(auth.authenticate().await?),
            None => None,
        };

        let targets = self.discover().await?;
        tracing::info!(
            "Extracting {} targets in {} passes",
            targets.len(),
            passes.len()
        );

        let host = Arc::new(RunHost::new(self.settings.pool.max_retries));
        let mut switcher: Option<Box<dyn FormatSwitcher>> = None;
        let outcome = self
            .run_passes(&host, passes, &targets, session.as_ref(), &mut switcher)
            .await;
        if let Some(mut active) = switcher {
            if let Err(e) = active.close().await {
                tracing::warn!("Failed to close format switcher: {}", e);
            }
        }
        let reports = outcome?;

        let mut tree = host.take_tree().await;
        if !self.settings.category.has_theme_modes() {
            deduplicate(&mut tree);
        }

        let report = RunReport {
            run_id,
            category: self.settings.category,
            targets: targets.len(),
            passes: reports,
            leaves: count(&tree),
            snippets: tree.snippet_count(),
            elapsed: started.elapsed(),
            tree,
        };
        tracing::info!(
            leaves = report.leaves,
            snippets = report.snippets,
            dropped = report.dropped(),
            "Run finished in {:.1}s",
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }

    /// One pass per format, switching the account format first when needed.
    async fn run_passes(
        &self,
        host: &Arc<RunHost>,
        passes: Vec<Option<Format>>,
        targets: &[Locator],
        session: Option<&Session>,
        switcher: &mut Option<Box<dyn FormatSwitcher>>,
    ) -> Result<Vec<PassReport>> {
        let mut reports = Vec::with_capacity(passes.len());
        for format in passes {
            if let Some(format) = format {
                if switcher.is_none() {
                    *switcher = Some(self.connect_switcher(session, &format).await?);
                }
                if let Some(active) = switcher.as_mut() {
                    active
                        .apply(&format)
                        .await
                        .map_err(|source| ExtractError::FormatSwitch {
                            format: format.key(),
                            source,
                        })?;
                }
            }

            let report = self
                .run_pass(host, format, targets, session)
                .instrument(tracing::info_span!(
                    "pass",
                    format = %format.map_or_else(|| "any".to_string(), |f| f.key())
                ))
                .await?;
            reports.push(report);
        }
        Ok(reports)
    }

    async fn connect_switcher(
        &self,
        session: Option<&Session>,
        format: &Format,
    ) -> Result<Box<dyn FormatSwitcher>> {
        let (Some(switchers), Some(session)) = (self.switchers.as_ref(), session) else {
            return Err(VariaError::Validation(
                "format switching needs an authenticated session".to_string(),
            )
            .into());
        };
        switchers
            .connect(session)
            .await
            .map_err(|source| ExtractError::FormatSwitch {
                format: format.key(),
                source,
            })
    }

    async fn discover(&self) -> Result<Vec<Locator>> {
        let category = self.settings.category;
        let attempts = self.settings.pool.discovery_attempts.max(1);
        let backoff = Duration::from_millis(self.settings.pool.discovery_backoff_ms);

        let outcome =
            retry_with_backoff(|| self.discovery.discover(category), attempts, backoff).await;
        if let Err(e) = self.discovery.close().await {
            tracing::warn!("Failed to close discovery page: {}", e);
        }
        let targets = outcome.map_err(|source| ExtractError::Discovery { attempts, source })?;

        if targets.is_empty() {
            return Err(ExtractError::NoTargets(category.to_string()));
        }
        Ok(targets)
    }

    async fn run_pass(
        &self,
        host: &Arc<RunHost>,
        format: Option<Format>,
        targets: &[Locator],
        session: Option<&Session>,
    ) -> Result<PassReport> {
        host.begin_pass(format, Job::for_targets(targets)).await;

        let mut pool = WorkerPool::new(self.factory.clone(), &self.settings.pool, targets.len());
        let outcome = pool.start(host.clone(), session).await;
        pool.stop().await;
        outcome?;

        let stats = host.finish_pass().await;
        tracing::info!(
            completed = stats.completed,
            retried = stats.retried,
            dropped = stats.dropped.len(),
            "Pass finished"
        );
        Ok(PassReport::new(
            format.map(|f| f.key()),
            targets.len(),
            stats,
        ))
    }
}
