use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the EIS toolkit.
#[derive(Error, Debug)]
pub enum EisError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory could not be listed.
    #[error("Failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The column-header marker line never appeared in the file.
    #[error("{path}: column header marker line not found")]
    MarkerNotFound { path: PathBuf },

    /// A data line did not split into the five expected fields.
    #[error("{path}:{line}: expected 5 comma-separated fields, found {found}")]
    FieldCount {
        path: PathBuf,
        line: usize,
        found: usize,
    },

    /// A data field could not be parsed as a number. `field` is 1-based.
    #[error("{path}:{line}: field {field} ({column}) is not numeric: {value:?}")]
    NonNumeric {
        path: PathBuf,
        line: usize,
        field: usize,
        column: String,
        value: String,
    },

    /// The data section was present but held no measurement rows.
    #[error("{path}: data section contains no measurement rows")]
    EmptyTable { path: PathBuf },

    /// Two rows share a frequency, so their wide labels would collide.
    #[error("{path}: duplicate wide column {label} (rows {first_row} and {second_row})")]
    DuplicateFrequency {
        path: PathBuf,
        label: String,
        first_row: usize,
        second_row: usize,
    },

    /// A table did not carry the fixed five-column measurement schema.
    #[error("{path}: expected columns {expected:?}, found {found:?}")]
    Schema {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A delimited table could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON document could not be parsed or produced.
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Coarse error classes used in batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FileSystem,
    Parse,
    Reshape,
    Schema,
    Other,
}

impl EisError {
    /// Classify this error for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EisError::FileRead { .. } | EisError::DirectoryRead { .. } | EisError::Io(_) => {
                ErrorKind::FileSystem
            }
            EisError::MarkerNotFound { .. }
            | EisError::FieldCount { .. }
            | EisError::NonNumeric { .. }
            | EisError::EmptyTable { .. } => ErrorKind::Parse,
            EisError::DuplicateFrequency { .. } => ErrorKind::Reshape,
            EisError::Schema { .. } => ErrorKind::Schema,
            EisError::Csv(_) | EisError::Json(_) | EisError::Config(_) => ErrorKind::Other,
        }
    }
}

/// Convenience alias used throughout the EIS crates.
pub type Result<T> = std::result::Result<T, EisError>;
