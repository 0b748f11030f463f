//! Summary of a finished run.

use crate::host::{DroppedJob, PassStats};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;
use varia_core::{Category, ResultTree};

/// Statistics of one pass of the pool.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    /// Format key of the pass, `None` when the run is format-agnostic
    pub format: Option<String>,
    pub jobs: usize,
    pub completed: usize,
    pub retried: usize,
    pub dropped: Vec<DroppedJob>,
}

impl PassReport {
    pub(crate) fn new(format: Option<String>, jobs: usize, stats: PassStats) -> Self {
        Self {
            format,
            jobs,
            completed: stats.completed,
            retried: stats.retried,
            dropped: stats.dropped,
        }
    }
}

/// Final tree plus what it took to build it.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub category: Category,
    pub targets: usize,
    pub passes: Vec<PassReport>,
    /// Leaf entries in the final tree
    pub leaves: usize,
    /// Snippets across all leaves
    pub snippets: usize,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
    #[serde(skip)]
    pub tree: ResultTree,
}

impl RunReport {
    /// Completed jobs across every pass.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.passes.iter().map(|p| p.completed).sum()
    }

    /// Jobs dropped after exhausting their retries, across every pass.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.passes.iter().map(|p| p.dropped.len()).sum()
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_across_passes() {
        let pass = |completed| PassReport {
            format: None,
            jobs: 3,
            completed,
            retried: 0,
            dropped: Vec::new(),
        };
        let report = RunReport {
            run_id: Uuid::new_v4(),
            category: Category::Marketing,
            targets: 3,
            passes: vec![pass(3), pass(2)],
            leaves: 0,
            snippets: 0,
            elapsed: Duration::from_millis(1500),
            tree: ResultTree::new(),
        };
        assert_eq!(report.completed(), 5);
        assert_eq!(report.dropped(), 0);

        let json = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(json["elapsed"], serde_json::json!(1.5));
        assert!(json.get("tree").is_none());
    }
}
