//! Run output files.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use varia_extract::RunReport;

/// Report as written next to the tree.
#[derive(Debug, Serialize)]
struct ReportFile<'a> {
    written_at: DateTime<Utc>,
    #[serde(flatten)]
    report: &'a RunReport,
}

/// Files written for one run.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    /// `<output_dir>/<category>.json`, the merged tree
    pub tree: PathBuf,
    /// `<output_dir>/<category>.report.json`, the run statistics
    pub report: PathBuf,
}

impl OutputPaths {
    /// Paths for `report`'s category under `dir`.
    pub fn for_report(dir: impl AsRef<Path>, report: &RunReport) -> Self {
        let dir = dir.as_ref();
        let name = report.category.as_str();
        Self {
            tree: dir.join(format!("{name}.json")),
            report: dir.join(format!("{name}.report.json")),
        }
    }
}

/// Write the merged tree and the report as pretty JSON, creating `dir`.
pub fn write_run(dir: impl AsRef<Path>, report: &RunReport) -> std::io::Result<OutputPaths> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let paths = OutputPaths::for_report(dir, report);

    let tree = serde_json::to_string_pretty(&report.tree)?;
    std::fs::write(&paths.tree, tree)?;

    let file = ReportFile {
        written_at: Utc::now(),
        report,
    };
    std::fs::write(&paths.report, serde_json::to_string_pretty(&file)?)?;

    Ok(paths)
}
