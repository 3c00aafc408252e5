//! Classifier capability used by the sweeps.
//!
//! The marginal predictor only needs `predict`; training is a separate
//! `Trainer` so tests can plug in scripted classifiers without fitting anything.

pub mod forest;
pub mod tree;

pub use forest::*;

use crate::domain::{FeatureVector, Label, TrainingSet};
use crate::error::AppError;

/// A trained binary model.
///
/// `predict` must be deterministic and return exactly one label per input
/// row, in input order.
pub trait Classifier: Sync {
    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<Label>, AppError>;
}

/// Fits a classifier on historical articles.
pub trait Trainer {
    type Model: Classifier;

    fn fit(&self, data: &TrainingSet) -> Result<Self::Model, AppError>;
}
