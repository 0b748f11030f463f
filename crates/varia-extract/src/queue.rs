//! Shared FIFO of pending jobs.

use crate::job::Job;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Job queue drained concurrently by the worker pool.
///
/// Every operation takes the queue lock, so `dequeue` hands each job to
/// exactly one caller.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
}

impl JobQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `jobs` in order.
    pub async fn enqueue(&self, jobs: impl IntoIterator<Item = Job>) {
        self.jobs.lock().await.extend(jobs);
    }

    /// Append one job at the tail.
    pub async fn push(&self, job: Job) {
        self.jobs.lock().await.push_back(job);
    }

    /// Remove and return the head, if any.
    pub async fn dequeue(&self) -> Option<Job> {
        self.jobs.lock().await.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }
}
