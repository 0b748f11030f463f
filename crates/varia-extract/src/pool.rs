//! Bounded pool of workers draining the job queue.

use crate::error::{classify_attempt, ExtractError, Result};
use crate::host::OrchestratorHost;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use varia_browser::{ContextFactory, PageExtractor, Session};
use varia_core::PoolConfig;

/// N workers, each owning one isolated context, competing for jobs.
///
/// Contexts are created in [`WorkerPool::start`] and handed back to the pool
/// when their worker finishes; [`WorkerPool::stop`] closes them. Callers
/// must call `stop` whether or not `start` succeeded.
pub struct WorkerPool<F: ContextFactory> {
    factory: Arc<F>,
    workers: usize,
    extraction_timeout: Duration,
    contexts: Vec<F::Context>,
    stopped: bool,
}

impl<F: ContextFactory> WorkerPool<F> {
    /// Size the pool for `pending` jobs.
    pub fn new(factory: Arc<F>, config: &PoolConfig, pending: usize) -> Self {
        Self {
            factory,
            workers: config.effective_workers(pending),
            extraction_timeout: Duration::from_secs(config.extraction_timeout_secs),
            contexts: Vec::new(),
            stopped: false,
        }
    }

    /// Number of workers `start` will run.
    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Run every worker until each has seen an empty queue.
    ///
    /// Workers whose context cannot be created are skipped; the pool fails
    /// only when no context could be created at all.
    pub async fn start(
        &mut self,
        host: Arc<dyn OrchestratorHost>,
        session: Option<&Session>,
    ) -> Result<()> {
        if self.workers == 0 {
            tracing::debug!("No pending jobs, pool not started");
            return Ok(());
        }

        let created = join_all((0..self.workers).map(|id| self.factory.create(id, session))).await;

        let mut contexts = Vec::with_capacity(self.workers);
        let mut last_error = None;
        for (id, result) in created.into_iter().enumerate() {
            match result {
                Ok(context) => contexts.push((id, context)),
                Err(e) => {
                    tracing::warn!(worker = id, "Could not create worker context: {}", e);
                    last_error = Some(e);
                }
            }
        }
        if contexts.is_empty() {
            if let Some(e) = last_error {
                return Err(ExtractError::NoWorkers(e));
            }
        }

        tracing::info!("Starting {} workers", contexts.len());
        let handles: Vec<_> = contexts
            .into_iter()
            .map(|(id, context)| {
                let host = host.clone();
                let timeout = self.extraction_timeout;
                tokio::spawn(
                    run_worker(context, host, timeout)
                        .instrument(tracing::info_span!("worker", worker = id)),
                )
            })
            .collect();

        for joined in join_all(handles).await {
            match joined {
                Ok(context) => self.contexts.push(context),
                Err(e) => tracing::error!("Worker task ended abnormally: {}", e),
            }
        }
        Ok(())
    }

    /// Release every worker context. Safe to call more than once.
    pub async fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        let count = self.contexts.len();
        for mut context in self.contexts.drain(..) {
            if let Err(e) = context.close().await {
                tracing::warn!("Failed to close worker context: {}", e);
            }
        }
        tracing::debug!("Pool stopped, {} contexts released", count);
    }
}

/// Dequeue, extract, report until the queue is empty. Returns the context.
async fn run_worker<C: PageExtractor>(
    mut context: C,
    host: Arc<dyn OrchestratorHost>,
    timeout: Duration,
) -> C {
    let mut processed = 0usize;
    while let Some(mut job) = host.dequeue().await {
        job.mark_processing();
        let format = host.current_format();

        // A panic inside one extraction fails that attempt, not the worker.
        let attempt = AssertUnwindSafe(context.extract(&job.target, format.as_ref())).catch_unwind();
        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(Ok(tree))) => job.complete(tree),
            Ok(Ok(Err(e))) => {
                tracing::debug!(job = %job.id, class = ?classify_attempt(&e), "Extraction failed: {}", e);
                job.fail(e.to_string());
            }
            Ok(Err(_)) => {
                tracing::error!(job = %job.id, "Extraction panicked");
                job.fail("extraction panicked".to_string());
            }
            Err(_) => {
                tracing::debug!(job = %job.id, "Extraction timed out");
                job.fail(format!("extraction timed out after {timeout:?}"));
            }
        }

        host.report_result(job).await;
        processed += 1;
    }
    tracing::debug!(processed, "Queue drained");
    context
}
