//! Data ingestion layer for the EIS toolkit.
//!
//! Responsible for discovering instrument export files, parsing them into
//! measurement tables, reshaping tables into wide records, folding wide
//! records into a combined batch table and persisting tables as CSV.

pub mod aggregator;
pub mod export;
pub mod header;
pub mod parser;
pub mod reshape;
pub mod scanner;

pub use eis_core as core;
