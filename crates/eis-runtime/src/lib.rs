//! Runtime layer for the EIS toolkit.
//!
//! Runs batches of exports through parsing, reshaping and aggregation on the
//! tokio blocking pool, and loads exports for the chart viewer.

pub mod loader;
pub mod pipeline;
pub mod report;

pub use eis_core as core;
pub use eis_data as data;
