//! Terminal chart layer for the EIS toolkit.
//!
//! Draws Nyquist and Bode charts of parsed exports with [`ratatui`], plus the
//! header panel and the interactive viewer loop.

pub mod app;
pub mod charts;
pub mod components;
pub mod themes;

pub use eis_core as core;
