//! Shared data model and plumbing for the EIS toolkit.
//!
//! Holds the measurement table types, the error taxonomy, float formatting
//! used for column labels, and the command-line settings.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{EisError, ErrorKind, Result};
