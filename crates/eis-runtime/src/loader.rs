//! Loading exports for the chart viewer.

use std::path::{Path, PathBuf};

use eis_core::error::{EisError, Result};
use eis_core::models::ParsedExport;
use eis_data::parser::load_export;
use eis_data::scanner::list_export_files;
use tokio::task;
use tracing::{info, warn};

use crate::report::FileFailure;

/// Exports loaded for plotting plus the files that could not be parsed.
#[derive(Debug, Default)]
pub struct LoadedExports {
    pub exports: Vec<ParsedExport>,
    pub failures: Vec<FileFailure>,
}

/// A single file is used as-is; a directory contributes its `*.<extension>` files.
pub fn resolve_plot_inputs(input: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    list_export_files(input, extension)
}

/// Parse every path on the blocking pool, keeping input order.
///
/// Files that fail are logged and reported rather than failing the load.
pub async fn load_exports(paths: Vec<PathBuf>) -> Result<LoadedExports> {
    let handles: Vec<_> = paths
        .into_iter()
        .map(|path| {
            let owned = path.clone();
            (path, task::spawn_blocking(move || load_export(&owned)))
        })
        .collect();

    let mut loaded = LoadedExports::default();
    for (path, handle) in handles {
        match handle
            .await
            .map_err(|e| EisError::Io(std::io::Error::other(e)))?
        {
            Ok(export) => loaded.exports.push(export),
            Err(err) => {
                warn!("Skipping {}: {}", path.display(), err);
                loaded.failures.push(FileFailure::new(&path, &err));
            }
        }
    }

    info!(
        "Loaded {} exports ({} failed)",
        loaded.exports.len(),
        loaded.failures.len()
    );
    Ok(loaded)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
