//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the five article features (`Feature`) and their vector form
//! - labels and per-row resolution state (`Label`, `Resolution`)
//! - the training table (`TrainingSet`) and run configuration (`RunConfig`)
//! - curve outputs (`MarginalCurve`, `CurvesFile`)

pub mod types;

pub use types::*;
