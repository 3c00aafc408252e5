//! Per-feature sweeps over the shared grid.
//!
//! For each value of the target feature a sweep:
//! 1. selects grid rows holding that value that have no prediction yet
//! 2. classifies them in one batch and records the labels
//! 3. aggregates every row holding that value into a curve point
//!
//! Rows resolved by an earlier sweep (or an earlier value) are never sent to
//! the classifier again, so each row is classified at most once per run.

use tracing::{debug, info};

use crate::classifier::Classifier;
use crate::domain::{Feature, FeatureVector, MarginalCurve};
use crate::error::AppError;
use crate::grid::{FeatureRange, Grid};
use crate::sweep::aggregate::aggregate_value;

/// What one sweep did.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRecord {
    pub feature: Feature,
    pub values: usize,
    pub batches: usize,
    pub rows_classified: usize,
    pub resolved_after: usize,
}

/// Totals across all sweeps run by one predictor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepStats {
    pub batches: usize,
    pub rows_classified: usize,
    pub sweeps: Vec<SweepRecord>,
}

/// Resolves grid rows on demand and turns them into marginal curves.
pub struct MarginalPredictor<'c, C: Classifier + ?Sized> {
    classifier: &'c C,
    stats: SweepStats,
}

impl<'c, C: Classifier + ?Sized> MarginalPredictor<'c, C> {
    pub fn new(classifier: &'c C) -> Self {
        Self {
            classifier,
            stats: SweepStats::default(),
        }
    }

    pub fn stats(&self) -> &SweepStats {
        &self.stats
    }

    /// Sweep one feature across `range`, resolving rows as needed.
    pub fn sweep(&mut self, grid: &mut Grid, range: &FeatureRange) -> Result<MarginalCurve, AppError> {
        let feature = range.feature();
        let mut record = SweepRecord {
            feature,
            values: range.len(),
            batches: 0,
            rows_classified: 0,
            resolved_after: 0,
        };

        let mut points = Vec::with_capacity(range.len());
        for &value in range.values() {
            let rows = grid
                .rows_with(feature, value)
                .ok_or(AppError::EmptySubset { feature, value })?;
            if rows.total() == 0 {
                return Err(AppError::EmptySubset { feature, value });
            }

            let pending: Vec<usize> = rows.filter(|&id| !grid.resolution(id).is_resolved()).collect();
            if !pending.is_empty() {
                self.resolve_batch(grid, feature, value, &pending)?;
                record.batches += 1;
                record.rows_classified += pending.len();
            }

            let point = aggregate_value(grid, feature, value)?;
            debug!(
                %feature,
                value,
                classified = pending.len(),
                proportion = point.proportion,
                "resolved sweep value"
            );
            points.push(point);
        }

        record.resolved_after = grid.resolved_count();
        info!(
            %feature,
            values = record.values,
            classified = record.rows_classified,
            resolved = record.resolved_after,
            total = grid.len(),
            "sweep complete"
        );

        self.stats.batches += record.batches;
        self.stats.rows_classified += record.rows_classified;
        self.stats.sweeps.push(record);

        Ok(MarginalCurve { feature, points })
    }

    /// Sweep all five features in canonical order over the grid's own ranges.
    pub fn sweep_all(&mut self, grid: &mut Grid) -> Result<Vec<MarginalCurve>, AppError> {
        let mut curves = Vec::with_capacity(Feature::ALL.len());
        for feature in Feature::ALL {
            let range = grid.range(feature).clone();
            curves.push(self.sweep(grid, &range)?);
        }
        Ok(curves)
    }

    fn resolve_batch(
        &mut self,
        grid: &mut Grid,
        feature: Feature,
        value: f64,
        ids: &[usize],
    ) -> Result<(), AppError> {
        let batch: Vec<FeatureVector> = ids.iter().map(|&id| grid.values(id)).collect();
        let labels = self
            .classifier
            .predict(&batch)
            .map_err(|e| AppError::ClassifierInvocation {
                feature,
                value,
                message: e.to_string(),
            })?;

        if labels.len() != batch.len() {
            return Err(AppError::ClassifierInvocation {
                feature,
                value,
                message: format!("returned {} labels for {} rows", labels.len(), batch.len()),
            });
        }

        for (&id, label) in ids.iter().zip(labels) {
            grid.resolve(id, label);
        }
        Ok(())
    }
}
