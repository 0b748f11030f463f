//! Unit of work: one target page.

use serde::Serialize;
use std::fmt;
use varia_core::{Locator, ResultTree};

/// Stable identifier of a job within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JobId(pub usize);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One target to extract, with retry bookkeeping.
///
/// Only the worker that dequeued a job mutates it until the job is handed
/// back through `report_result`.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub target: Locator,
    pub status: JobStatus,
    pub retry_count: u32,
    pub result: Option<ResultTree>,
    pub error: Option<String>,
}

impl Job {
    #[must_use]
    pub fn new(id: JobId, target: Locator) -> Self {
        Self {
            id,
            target,
            status: JobStatus::Pending,
            retry_count: 0,
            result: None,
            error: None,
        }
    }

    /// One pending job per target, numbered from 1 in order.
    #[must_use]
    pub fn for_targets(targets: &[Locator]) -> Vec<Self> {
        targets
            .iter()
            .enumerate()
            .map(|(i, target)| Self::new(JobId(i + 1), target.clone()))
            .collect()
    }

    pub fn mark_processing(&mut self) {
        self.status = JobStatus::Processing;
    }

    pub fn complete(&mut self, result: ResultTree) {
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.error = None;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.result = None;
        self.error = Some(error.into());
    }

    /// Clear the failure and count one more attempt.
    pub fn reset_for_retry(&mut self) {
        self.status = JobStatus::Pending;
        self.retry_count += 1;
        self.error = None;
        self.result = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(n: usize) -> Locator {
        Locator::new(format!("https://example.com/ui/marketing/sections/page-{n}")).unwrap()
    }

    #[test]
    fn test_for_targets_numbers_from_one() {
        let jobs = Job::for_targets(&[locator(1), locator(2)]);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, JobId(1));
        assert_eq!(jobs[1].id.to_string(), "#2");
        assert!(jobs.iter().all(|j| j.status == JobStatus::Pending));
    }

    #[test]
    fn test_fail_then_retry_clears_error() {
        let mut job = Job::new(JobId(3), locator(3));
        job.mark_processing();
        job.fail("timeout");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("timeout"));

        job.reset_for_retry();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.retry_count, 1);
        assert!(job.error.is_none());
    }

    #[test]
    fn test_complete_stores_result() {
        let mut job = Job::new(JobId(1), locator(1));
        job.complete(ResultTree::new());
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.result.is_some());
    }
}
