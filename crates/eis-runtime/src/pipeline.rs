//! Async batch pipeline.
//!
//! Every input file is parsed and reshaped in its own task on tokio's
//! blocking pool. Results are awaited in scan order and folded into a
//! [`BatchAggregator`] in that same order, so the intersect policy sees the
//! files exactly as the scanner listed them.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use chrono::Utc;
use eis_core::error::{EisError, Result};
use eis_core::models::WideRecord;
use eis_data::aggregator::{AggregationPolicy, BatchAggregator};
use eis_data::parser::parse_file;
use eis_data::reshape::reshape;
use eis_data::scanner::collect_batch_inputs;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::report::{BatchReport, FileFailure};

// ── ErrorPolicy ───────────────────────────────────────────────────────────────

/// What happens when a single file of a batch cannot be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Log the failure, record it in the report and carry on.
    #[default]
    Skip,
    /// Stop at the first failing file and return its error.
    Abort,
}

impl FromStr for ErrorPolicy {
    type Err = EisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "skip" => Ok(ErrorPolicy::Skip),
            "abort" => Ok(ErrorPolicy::Abort),
            other => Err(EisError::Config(format!("unknown error policy: {other}"))),
        }
    }
}

// ── BatchPipeline ─────────────────────────────────────────────────────────────

/// Batch configuration; [`BatchPipeline::run`] does the work.
#[derive(Debug, Clone)]
pub struct BatchPipeline {
    pub policy: AggregationPolicy,
    pub on_error: ErrorPolicy,
    pub extension: String,
    /// Scan each subdirectory of the root instead of the root itself.
    pub folders: bool,
}

impl Default for BatchPipeline {
    fn default() -> Self {
        Self {
            policy: AggregationPolicy::default(),
            on_error: ErrorPolicy::default(),
            extension: "txt".to_string(),
            folders: false,
        }
    }
}

impl BatchPipeline {
    pub fn new(
        policy: AggregationPolicy,
        on_error: ErrorPolicy,
        extension: impl Into<String>,
        folders: bool,
    ) -> Self {
        Self {
            policy,
            on_error,
            extension: extension.into(),
            folders,
        }
    }

    /// Scan `root`, process every export and fold the results.
    ///
    /// Scanning errors always fail the batch. Per-file errors follow
    /// [`BatchPipeline::on_error`].
    pub async fn run(&self, root: &Path) -> Result<BatchReport> {
        let started = Instant::now();
        let inputs = collect_batch_inputs(root, self.folders, &self.extension)?;

        if inputs.is_empty() {
            warn!("No *.{} files found under {}", self.extension, root.display());
        } else {
            info!(
                "Processing {} files from {} ({} policy)",
                inputs.len(),
                root.display(),
                self.policy.as_str()
            );
        }

        let tasks: Vec<(PathBuf, JoinHandle<Result<WideRecord>>)> = inputs
            .into_iter()
            .map(|path| {
                let owned = path.clone();
                (path, task::spawn_blocking(move || process_file(&owned)))
            })
            .collect();

        let mut aggregator = BatchAggregator::new(self.policy);
        let mut processed = Vec::new();
        let mut failures = Vec::new();

        for (path, handle) in tasks {
            let outcome = handle
                .await
                .map_err(|e| EisError::Io(std::io::Error::other(e)))?;

            match outcome {
                Ok(record) => {
                    aggregator.push(record);
                    processed.push(path);
                }
                Err(err) => match self.on_error {
                    ErrorPolicy::Abort => {
                        error!("Aborting batch at {}: {}", path.display(), err);
                        return Err(err);
                    }
                    ErrorPolicy::Skip => {
                        warn!("Skipping {}: {}", path.display(), err);
                        failures.push(FileFailure::new(&path, &err));
                    }
                },
            }
        }

        let dropped_columns = aggregator.dropped_total();
        let combined = aggregator.finish();
        let report = BatchReport {
            generated_at: Utc::now(),
            root: root.to_path_buf(),
            policy: self.policy.as_str().to_string(),
            processed,
            failures,
            dropped_columns,
            row_count: combined.row_count(),
            column_count: combined.column_count(),
            elapsed_secs: started.elapsed().as_secs_f64(),
            combined,
        };

        info!("{}", report.summary());
        Ok(report)
    }
}

/// Parse one export and flatten it into a record tagged with its path.
pub fn process_file(path: &Path) -> Result<WideRecord> {
    let (table, _header) = parse_file(path)?;
    let record = reshape(path, &table)?.with_file(path);
    debug!("{}: {} wide columns", path.display(), record.len());
    Ok(record)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{export_text, write};
    use eis_core::error::ErrorKind;
    use tempfile::TempDir;

    const HIGH: &[&str] = &[
        "1.000e+5, 2.093e+2, -1.186e+1, 2.096e+2, -3.24",
        "1.000e+4, 2.150e+2, -4.012e+1, 2.187e+2, -10.57",
    ];
    const LOW: &[&str] = &[
        "1.000e+3, 2.871e+2, -1.623e+2, 3.298e+2, -29.48",
        "1.000e+2, 3.512e+2, -2.411e+2, 4.260e+2, -34.47",
    ];

    const DUPE: &[&str] = &[
        "1.000e+0, 4.102e+2, -3.310e+2, 5.271e+2, -38.90",
        "1.000e+0, 4.118e+2, -3.297e+2, 5.275e+2, -38.68",
    ];

    fn batch_dir(files: &[(&str, String)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, text) in files {
            write(dir.path(), name, text);
        }
        dir
    }

    // ── ErrorPolicy ───────────────────────────────────────────────────────────

    #[test]
    fn test_error_policy_from_str() {
        assert_eq!("skip".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Skip);
        assert_eq!("abort".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Abort);
        assert!("retry".parse::<ErrorPolicy>().is_err());
        assert_eq!(ErrorPolicy::default(), ErrorPolicy::Skip);
    }

    #[test]
    fn test_pipeline_defaults() {
        let pipeline = BatchPipeline::default();
        assert_eq!(pipeline.policy, AggregationPolicy::Union);
        assert_eq!(pipeline.on_error, ErrorPolicy::Skip);
        assert_eq!(pipeline.extension, "txt");
        assert!(!pipeline.folders);
    }

    // ── process_file ──────────────────────────────────────────────────────────

    #[test]
    fn test_process_file_tags_record_with_path() {
        let dir = batch_dir(&[("a.txt", export_text(HIGH))]);
        let path = dir.path().join("a.txt");
        let record = process_file(&path).unwrap();
        assert_eq!(record.len(), 8);
        assert_eq!(record.file.as_deref(), Some(path.display().to_string().as_str()));
        assert_eq!(record.get("Z'/ohm_100000.0"), Some(209.3));
    }

    #[test]
    fn test_process_file_duplicate_frequency_is_reshape_error() {
        let dir = batch_dir(&[("dupe.txt", export_text(DUPE))]);
        let path = dir.path().join("dupe.txt");
        let err = process_file(&path).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Reshape);
        match err {
            EisError::DuplicateFrequency {
                path: reported,
                label,
                ..
            } => {
                assert_eq!(reported, path);
                assert_eq!(label, "Z'/ohm_1.0");
            }
            other => panic!("expected DuplicateFrequency, got {other:?}"),
        }
    }

    // ── run ───────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_run_union_keeps_every_column_in_scan_order() {
        let dir = batch_dir(&[("a.txt", export_text(HIGH)), ("b.txt", export_text(LOW))]);
        let report = BatchPipeline::default().run(dir.path()).await.unwrap();

        assert_eq!(report.processed.len(), 2);
        assert!(report.is_clean());
        assert_eq!(report.column_count, 16);
        assert_eq!(report.combined.columns[0], "Z'/ohm_100000.0");
        assert!(report.combined.files()[0].ends_with("a.txt"));
        assert_eq!(report.combined.value(0, "Z'/ohm_1000.0"), None);
        assert_eq!(report.combined.value(1, "Z'/ohm_1000.0"), Some(287.1));
    }

    #[tokio::test]
    async fn test_run_intersect_disjoint_sweeps_leave_only_file_column() {
        let dir = batch_dir(&[("a.txt", export_text(HIGH)), ("b.txt", export_text(LOW))]);
        let pipeline = BatchPipeline::new(AggregationPolicy::Intersect, ErrorPolicy::Skip, "txt", false);
        let report = pipeline.run(dir.path()).await.unwrap();

        assert_eq!(report.row_count, 2);
        assert_eq!(report.column_count, 0);
        assert_eq!(report.dropped_columns, 16);
        assert_eq!(report.policy, "intersect");
    }

    #[tokio::test]
    async fn test_run_skip_records_failure_and_continues() {
        let dir = batch_dir(&[
            ("a.txt", export_text(HIGH)),
            ("b.txt", "no marker in here\n".to_string()),
            ("c.txt", export_text(LOW)),
        ]);
        let report = BatchPipeline::default().run(dir.path()).await.unwrap();

        assert_eq!(report.processed.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].path.ends_with("b.txt"));
        assert_eq!(report.failures[0].kind, ErrorKind::Parse);
        assert_eq!(report.row_count, 2);
    }

    #[tokio::test]
    async fn test_run_abort_returns_first_error() {
        let dir = batch_dir(&[
            ("a.txt", export_text(HIGH)),
            ("b.txt", export_text(&["1.0, 2.0, x, 4.0, 5.0"])),
        ]);
        let pipeline = BatchPipeline {
            on_error: ErrorPolicy::Abort,
            ..BatchPipeline::default()
        };
        let err = pipeline.run(dir.path()).await.unwrap_err();
        assert!(matches!(err, EisError::NonNumeric { field: 3, .. }));
    }

    #[tokio::test]
    async fn test_run_abort_on_duplicate_frequency_names_file() {
        let dir = batch_dir(&[("a.txt", export_text(HIGH)), ("dupe.txt", export_text(DUPE))]);
        let pipeline = BatchPipeline {
            on_error: ErrorPolicy::Abort,
            ..BatchPipeline::default()
        };
        let err = pipeline.run(dir.path()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Reshape);
        let message = err.to_string();
        assert!(message.contains("dupe.txt"), "{message}");
        assert!(message.contains("Z'/ohm_1.0"), "{message}");
    }

    #[tokio::test]
    async fn test_run_skip_reports_duplicate_frequency_as_reshape_failure() {
        let dir = batch_dir(&[("a.txt", export_text(HIGH)), ("dupe.txt", export_text(DUPE))]);
        let report = BatchPipeline::default().run(dir.path()).await.unwrap();

        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, ErrorKind::Reshape);
        assert!(report.failures[0].message.contains("dupe.txt"));
    }

    #[tokio::test]
    async fn test_run_folders_scans_subdirectories() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("11");
        let second = dir.path().join("12");
        std::fs::create_dir_all(&first).unwrap();
        std::fs::create_dir_all(&second).unwrap();
        write(&first, "a.txt", &export_text(HIGH));
        write(&second, "b.txt", &export_text(HIGH));
        write(dir.path(), "ignored.txt", &export_text(LOW));

        let pipeline = BatchPipeline {
            folders: true,
            ..BatchPipeline::default()
        };
        let report = pipeline.run(dir.path()).await.unwrap();
        assert_eq!(report.processed.len(), 2);
        assert_eq!(report.column_count, 8);
    }

    #[tokio::test]
    async fn test_run_empty_directory_gives_empty_report() {
        let dir = TempDir::new().unwrap();
        let report = BatchPipeline::default().run(dir.path()).await.unwrap();
        assert!(report.processed.is_empty());
        assert_eq!(report.combined.row_count(), 0);
    }

    #[tokio::test]
    async fn test_run_missing_root_fails() {
        let err = BatchPipeline::default()
            .run(Path::new("/tmp/no-such-eis-batch-root"))
            .await
            .unwrap_err();
        assert!(matches!(err, EisError::DirectoryRead { .. }));
    }
}
