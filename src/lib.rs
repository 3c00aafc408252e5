//! `traffic-curves` library crate.
//!
//! The binary (`tcurves`) is a thin wrapper around this library so that:
//!
//! - the grid, classifier and sweeps are testable without spawning processes
//! - saved predictions and curves can be reloaded by other tools
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod classifier;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod grid;
pub mod io;
pub mod logging;
pub mod plot;
pub mod report;
pub mod sweep;
