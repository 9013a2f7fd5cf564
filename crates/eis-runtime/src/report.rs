//! Batch outcome: the combined table plus a JSON-serialisable summary.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use eis_core::error::{EisError, ErrorKind, Result};
use eis_core::models::CombinedTable;
use eis_data::export::write_combined_csv;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One file the batch could not use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
}

impl FileFailure {
    pub fn new(path: &Path, error: &EisError) -> Self {
        Self {
            path: path.to_path_buf(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Result of [`BatchPipeline::run`](crate::pipeline::BatchPipeline::run).
///
/// The combined table itself is not part of the JSON form; it is written
/// separately as CSV by [`BatchReport::persist`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub root: PathBuf,
    pub policy: String,
    /// Files folded into the table, in scan order.
    pub processed: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
    /// Columns removed by the intersect policy over the whole batch.
    pub dropped_columns: usize,
    pub row_count: usize,
    pub column_count: usize,
    pub elapsed_secs: f64,
    #[serde(skip)]
    pub combined: CombinedTable,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line human summary for logs and the terminal.
    pub fn summary(&self) -> String {
        format!(
            "{} files aggregated, {} failed, {} rows x {} columns ({} dropped) in {:.2}s",
            self.processed.len(),
            self.failures.len(),
            self.row_count,
            self.column_count,
            self.dropped_columns,
            self.elapsed_secs
        )
    }

    /// Write the combined CSV to `output` and this report next to it.
    ///
    /// Returns the path of the JSON sidecar.
    pub fn persist(&self, output: &Path) -> Result<PathBuf> {
        write_combined_csv(&self.combined, output)?;

        let sidecar = report_path(output);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&sidecar, json)?;
        info!("Batch report written to {}", sidecar.display());

        Ok(sidecar)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| EisError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// `results/EIS.csv` -> `results/EIS.csv.report.json`.
pub fn report_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".report.json");
    output.with_file_name(name)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
