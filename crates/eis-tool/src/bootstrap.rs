use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Name of the per-user state directory under `$HOME`.
const APP_DIR: &str = ".eis-tool";

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// `~/.eis-tool`, falling back to `./.eis-tool` without a home directory.
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Ensure `~/.eis-tool/` and `~/.eis-tool/logs/` exist.
pub fn ensure_directories() -> anyhow::Result<PathBuf> {
    ensure_directories_in(&app_dir())
}

pub fn ensure_directories_in(dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir.join("logs"))?;
    Ok(dir.to_path_buf())
}

/// Log file used when the viewer owns the terminal and no `--log-file` was given.
pub fn default_log_file(dir: &Path) -> PathBuf {
    dir.join("logs").join("eis-tool.log")
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `DEBUG`/`INFO`/`WARNING`/`ERROR`/`CRITICAL` level name to a tracing
/// filter directive. Unknown names pass through unchanged.
pub fn filter_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output goes to stderr when `to_stderr` is set and, in addition, to
/// `log_file` (appending, without colours) when one is given.
pub fn setup_logging(log_level: &str, log_file: Option<&Path>, to_stderr: bool) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(filter_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = to_stderr.then(|| {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_writer(std::io::stderr)
    });

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

// ── Input discovery ────────────────────────────────────────────────────────────

/// Default input directory: `./data` when present, else the current directory.
pub fn discover_input_dir() -> PathBuf {
    discover_input_dir_in(Path::new("."))
}

pub fn discover_input_dir_in(cwd: &Path) -> PathBuf {
    let data = cwd.join("data");
    if data.is_dir() {
        data
    } else {
        cwd.to_path_buf()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
