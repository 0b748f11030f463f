//! Varia Extract - Concurrent extraction orchestration.
//!
//! This crate turns a list of target pages into one merged result tree. It
//! coordinates a shared job queue, a bounded pool of isolated browser
//! contexts and a serialized ingestion path that retries failed jobs and
//! merges completed ones.
//!
//! # Features
//!
//! - One authenticated session cloned into every worker context
//! - Format passes ordered so consecutive passes change one setting
//! - Per-job retries up to a configured budget, then drop and report
//! - Order-independent deep merge with per-leaf deduplication
//!
//! # Example
//!
//! ```rust,ignore
//! use varia_extract::{Orchestrator, RunSettings};
//! use std::sync::Arc;
//!
//! let settings = RunSettings::from_config(&config)?;
//! let mut orchestrator = Orchestrator::new(settings, Arc::new(factory), discovery)
//!     .with_account(handshake, switchers);
//!
//! let report = orchestrator.run().await?;
//! println!("{} leaves, {} snippets", report.leaves, report.snippets);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod host;
pub mod job;
pub mod merger;
pub mod orchestrator;
pub mod pool;
pub mod queue;
pub mod report;
pub mod retry;

// Re-export commonly used types
pub use error::{classify_attempt, ExtractError, Result};
pub use host::{DroppedJob, OrchestratorHost, PassStats, RunHost};
pub use job::{Job, JobId, JobStatus};
pub use merger::{count, deduplicate, merge};
pub use orchestrator::{Orchestrator, RunSettings};
pub use pool::WorkerPool;
pub use queue::JobQueue;
pub use report::{PassReport, RunReport};
pub use retry::{backoff_delay, retry_with_backoff};
