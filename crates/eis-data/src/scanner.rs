//! Directory discovery for instrument exports.
//!
//! Both listings are non-recursive and sorted by path. Neither looks at file
//! content.

use std::path::{Path, PathBuf};

use eis_core::error::{EisError, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;

// ── Public API ────────────────────────────────────────────────────────────────

/// Files directly inside `dir` whose name ends in `.<extension>`.
///
/// Returns an empty list when nothing matches. Fails when `dir` is missing,
/// is not a directory, or cannot be listed.
pub fn list_export_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let suffix = format!(".{}", extension.trim_start_matches('.'));

    let files: Vec<PathBuf> = immediate_children(dir)?
        .into_iter()
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .map(|name| name.ends_with(&suffix))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    debug!("Found {} *{} files in {}", files.len(), suffix, dir.display());
    Ok(files)
}

/// Immediate subdirectories of `dir`, used to drive multi-folder batches.
pub fn list_subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let dirs: Vec<PathBuf> = immediate_children(dir)?
        .into_iter()
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect();

    debug!("Found {} subdirectories in {}", dirs.len(), dir.display());
    Ok(dirs)
}

/// Every export file of a batch, in scan order.
///
/// With `folders` set, each subdirectory of `root` is scanned in turn and
/// `root` itself contributes nothing; otherwise only `root` is scanned.
pub fn collect_batch_inputs(root: &Path, folders: bool, extension: &str) -> Result<Vec<PathBuf>> {
    if !folders {
        return list_export_files(root, extension);
    }

    let mut all = Vec::new();
    for folder in list_subdirectories(root)? {
        let files = list_export_files(&folder, extension)?;
        if files.is_empty() {
            warn!("No *.{} files in folder {}", extension, folder.display());
        }
        all.extend(files);
    }
    Ok(all)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Depth-1 entries of `dir`, sorted by file name.
fn immediate_children(dir: &Path) -> Result<Vec<walkdir::DirEntry>> {
    let meta = std::fs::metadata(dir).map_err(|source| EisError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(EisError::DirectoryRead {
            path: dir.to_path_buf(),
            source: std::io::Error::other("not a directory"),
        });
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| {
            entry.map_err(|e| EisError::DirectoryRead {
                path: e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| dir.to_path_buf()),
                source: e.into(),
            })
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
