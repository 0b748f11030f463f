//! The orchestrator as seen by workers.
//!
//! Workers only read the current format, take jobs and hand them back. The
//! hand-back path is the single place where the queue is refilled with
//! retries and where the accumulated result is mutated, and it runs under
//! one async mutex.

use crate::job::{Job, JobId, JobStatus};
use crate::merger::merge;
use crate::queue::JobQueue;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{PoisonError, RwLock};
use tokio::sync::Mutex;
use varia_core::{Format, Locator, ResultTree};

/// Operations exposed to workers.
#[async_trait]
pub trait OrchestratorHost: Send + Sync {
    /// Format the current pass expects pages to show, if any.
    fn current_format(&self) -> Option<Format>;

    /// Take the next job, or `None` once the queue is drained.
    async fn dequeue(&self) -> Option<Job>;

    /// Hand back a job in `Completed` or `Failed` state.
    async fn report_result(&self, job: Job);
}

/// A job that ran out of retries.
#[derive(Debug, Clone, Serialize)]
pub struct DroppedJob {
    pub id: JobId,
    pub target: Locator,
    pub retry_count: u32,
    pub error: String,
}

/// Ingestion counters for one pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassStats {
    pub completed: usize,
    pub retried: usize,
    pub dropped: Vec<DroppedJob>,
}

#[derive(Debug, Default)]
struct Accumulator {
    tree: ResultTree,
    pass: PassStats,
}

/// [`OrchestratorHost`] owning the queue and the accumulated result of a run.
pub struct RunHost {
    queue: JobQueue,
    format: RwLock<Option<Format>>,
    max_retries: u32,
    accumulator: Mutex<Accumulator>,
}

impl RunHost {
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            queue: JobQueue::new(),
            format: RwLock::new(None),
            max_retries,
            accumulator: Mutex::new(Accumulator::default()),
        }
    }

    /// Queue `jobs` under `format` and reset the pass counters.
    pub async fn begin_pass(&self, format: Option<Format>, jobs: Vec<Job>) {
        *self.format.write().unwrap_or_else(PoisonError::into_inner) = format;
        self.accumulator.lock().await.pass = PassStats::default();
        self.queue.enqueue(jobs).await;
    }

    /// Counters of the pass since the last [`RunHost::begin_pass`].
    pub async fn finish_pass(&self) -> PassStats {
        std::mem::take(&mut self.accumulator.lock().await.pass)
    }

    /// Jobs still waiting.
    pub async fn pending(&self) -> usize {
        self.queue.len().await
    }

    /// The accumulated result, leaving an empty tree behind.
    pub async fn take_tree(&self) -> ResultTree {
        std::mem::take(&mut self.accumulator.lock().await.tree)
    }
}

#[async_trait]
impl OrchestratorHost for RunHost {
    fn current_format(&self) -> Option<Format> {
        *self.format.read().unwrap_or_else(PoisonError::into_inner)
    }

    async fn dequeue(&self) -> Option<Job> {
        self.queue.dequeue().await
    }

    async fn report_result(&self, mut job: Job) {
        let mut acc = self.accumulator.lock().await;
        match job.status {
            JobStatus::Completed => {
                if let Some(partial) = job.result.take() {
                    merge(&mut acc.tree, partial);
                }
                acc.pass.completed += 1;
                tracing::debug!(job = %job.id, "Merged result for {}", job.target);
            }
            JobStatus::Failed if job.retry_count < self.max_retries => {
                tracing::warn!(
                    job = %job.id,
                    attempt = job.retry_count + 1,
                    "Job failed, requeueing: {}",
                    job.error.as_deref().unwrap_or("unknown error")
                );
                job.reset_for_retry();
                acc.pass.retried += 1;
                self.queue.push(job).await;
            }
            JobStatus::Failed => {
                let error = job.error.take().unwrap_or_default();
                tracing::error!(
                    job = %job.id,
                    "Dropping {} after {} retries: {}",
                    job.target,
                    job.retry_count,
                    error
                );
                acc.pass.dropped.push(DroppedJob {
                    id: job.id,
                    target: job.target,
                    retry_count: job.retry_count,
                    error,
                });
            }
            JobStatus::Pending | JobStatus::Processing => {
                tracing::warn!(job = %job.id, "Job reported without an outcome, requeueing");
                job.status = JobStatus::Pending;
                self.queue.push(job).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use varia_core::{Framework, MajorVersion, Snippet};

    fn job(n: usize) -> Job {
        let target = Locator::new(format!("https://example.com/ui/a/b/page-{n}")).unwrap();
        Job::new(JobId(n), target)
    }

    fn partial(job: &Job, code: &str) -> ResultTree {
        let mut tree = ResultTree::new();
        tree.insert_snippet(
            &job.target.tree_path(),
            "Item",
            Snippet {
                code: code.to_string(),
                framework: Framework::Html,
                version: MajorVersion::V4,
                mode: None,
                dark_mode: false,
                downloadable: true,
            },
        );
        tree
    }

    #[tokio::test]
    async fn test_failed_job_is_requeued_until_budget() {
        let host = RunHost::new(2);
        host.begin_pass(None, Vec::new()).await;

        let mut retries = Vec::new();
        let mut current = job(1);
        for _ in 0..3 {
            current.mark_processing();
            current.fail("timeout");
            host.report_result(current).await;
            match host.dequeue().await {
                Some(next) => {
                    retries.push(next.retry_count);
                    current = next;
                }
                None => break,
            }
        }

        assert_eq!(retries, vec![1, 2]);
        let stats = host.finish_pass().await;
        assert_eq!(stats.retried, 2);
        assert_eq!(stats.dropped.len(), 1);
        assert_eq!(stats.dropped[0].retry_count, 2);
        assert_eq!(stats.dropped[0].error, "timeout");
    }

    #[tokio::test]
    async fn test_completed_job_is_merged() {
        let host = RunHost::new(3);
        let mut j = job(7);
        host.begin_pass(None, Vec::new()).await;

        let tree = partial(&j, "<div/>");
        j.complete(tree);
        host.report_result(j).await;

        let stats = host.finish_pass().await;
        assert_eq!(stats.completed, 1);
        assert_eq!(host.take_tree().await.snippet_count(), 1);
        assert!(host.take_tree().await.is_empty());
    }

    #[tokio::test]
    async fn test_begin_pass_sets_format_and_queue() {
        let host = RunHost::new(0);
        let format = Format::new(Framework::Vue, MajorVersion::V3, None);
        host.begin_pass(Some(format), vec![job(1), job(2)]).await;

        assert_eq!(host.current_format(), Some(format));
        assert_eq!(host.pending().await, 2);
    }
}
