//! Feature range generation.
//!
//! Each feature is discretized into an ordered list of values. The grid is the
//! cartesian product of the five ranges, and each sweep walks one of them.
//!
//! Two shapes are supported:
//! - stepped inclusive ranges (content length, title length, links)
//! - evenly spaced points between observed extremes (verbosity, sentiment)

use std::collections::HashSet;

use crate::domain::{FEATURE_COUNT, Feature, RangeSettings, TrainingSet};
use crate::error::AppError;

/// Tolerance used when counting steps, so `300..=2000 by 100` keeps `2000`.
const STEP_EPS: f64 = 1e-9;

/// Ordered discrete values for one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRange {
    feature: Feature,
    values: Vec<f64>,
}

impl FeatureRange {
    /// Wrap explicit values. Validation happens in the grid builder.
    pub fn new(feature: Feature, values: Vec<f64>) -> Self {
        Self { feature, values }
    }

    /// Inclusive range `start..=stop` in increments of `step`.
    pub fn stepped(feature: Feature, start: f64, stop: f64, step: f64) -> Result<Self, AppError> {
        if !(start.is_finite() && stop.is_finite() && step.is_finite()) || step <= 0.0 || stop < start {
            return Err(AppError::InvalidRange {
                feature,
                message: format!(
                    "start={start}, stop={stop}, step={step} (must be finite, step>0, stop>=start)"
                ),
            });
        }

        let len = stepped_len(start, stop, step).ok_or_else(|| AppError::InvalidRange {
            feature,
            message: format!("start={start}, stop={stop}, step={step} yields too many values"),
        })?;
        let values = (0..len).map(|i| start + step * i as f64).collect();
        Ok(Self { feature, values })
    }

    /// `points` evenly spaced values from `min` to `max` inclusive.
    ///
    /// A degenerate interval (`min == max`) collapses to a single value so the
    /// range never carries duplicates.
    pub fn linspace(feature: Feature, min: f64, max: f64, points: usize) -> Result<Self, AppError> {
        if !(min.is_finite() && max.is_finite()) || max < min {
            return Err(AppError::InvalidRange {
                feature,
                message: format!("min={min}, max={max} (must be finite and max>=min)"),
            });
        }
        if points == 0 {
            return Err(AppError::InvalidRange {
                feature,
                message: "point count must be >= 1".to_string(),
            });
        }
        if points == 1 || min == max {
            return Ok(Self {
                feature,
                values: vec![min],
            });
        }

        let step = (max - min) / (points as f64 - 1.0);
        let mut values: Vec<f64> = (0..points).map(|i| min + step * i as f64).collect();
        // Pin the endpoint exactly.
        values[points - 1] = max;
        Ok(Self { feature, values })
    }

    pub fn feature(&self) -> Feature {
        self.feature
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reject empty, non-finite, duplicated, or (for counts) fractional values.
    pub fn validate(&self) -> Result<(), AppError> {
        let invalid = |message: String| AppError::InvalidRange {
            feature: self.feature,
            message,
        };

        if self.values.is_empty() {
            return Err(invalid("range is empty".to_string()));
        }

        let mut seen = HashSet::with_capacity(self.values.len());
        for &v in &self.values {
            if !v.is_finite() {
                return Err(invalid(format!("non-finite value {v}")));
            }
            if matches!(self.feature, Feature::TitleLength | Feature::Links) && v.fract() != 0.0 {
                return Err(invalid(format!("value {v} is not an integer")));
            }
            if !seen.insert(value_key(v)) {
                return Err(invalid(format!("duplicate value {v}")));
            }
        }
        Ok(())
    }
}

/// Number of values `FeatureRange::stepped` would produce, without allocating.
///
/// `None` for invalid bounds or a count that does not fit in `usize`.
pub fn stepped_len(start: f64, stop: f64, step: f64) -> Option<usize> {
    if !(start.is_finite() && stop.is_finite() && step.is_finite()) || step <= 0.0 || stop < start {
        return None;
    }
    let steps = ((stop - start) / step + STEP_EPS).floor();
    if !steps.is_finite() || steps >= usize::MAX as f64 {
        return None;
    }
    (steps as usize).checked_add(1)
}

/// Number of values `FeatureRange::linspace` would produce.
fn linspace_len(min: f64, max: f64, points: usize) -> usize {
    if min == max { points.min(1) } else { points }
}

/// Bit pattern used to compare feature values exactly (`-0.0` folds to `0.0`).
pub fn value_key(v: f64) -> u64 {
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}

/// One range per feature, in `Feature::ALL` order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRanges {
    ranges: [FeatureRange; FEATURE_COUNT],
}

impl FeatureRanges {
    /// Assemble from five ranges given in `Feature::ALL` order.
    pub fn new(ranges: [FeatureRange; FEATURE_COUNT]) -> Result<Self, AppError> {
        for (range, expected) in ranges.iter().zip(Feature::ALL) {
            if range.feature != expected {
                return Err(AppError::InvalidRange {
                    feature: expected,
                    message: format!("slot holds a range for {}", range.feature),
                });
            }
        }
        Ok(Self { ranges })
    }

    /// Derive ranges from the training table.
    ///
    /// Content length uses the configured stepped interval; title length and
    /// links step by 1 over the observed integer extremes; verbosity and
    /// sentiment use `float_points` evenly spaced values over observed extremes.
    ///
    /// Range lengths are checked against `max_grid_rows` before any value is
    /// allocated, so an outlier bound fails with `InvalidRange`.
    pub fn from_training(data: &TrainingSet, settings: &RangeSettings) -> Result<Self, AppError> {
        let bounds = |feature: Feature| {
            data.feature_bounds(feature).ok_or_else(|| AppError::InvalidRange {
                feature,
                message: "training table is empty".to_string(),
            })
        };

        let content = (settings.content_start, settings.content_stop, settings.content_step);
        let (lo, hi) = bounds(Feature::TitleLength)?;
        let title = (lo.floor(), hi.ceil(), 1.0);
        let (lo, hi) = bounds(Feature::Links)?;
        let links = (lo.floor(), hi.ceil(), 1.0);
        let verbosity = bounds(Feature::Verbosity)?;
        let sentiment = bounds(Feature::Sentiment)?;

        let planned = [
            (Feature::ContentLength, stepped_len(content.0, content.1, content.2)),
            (Feature::TitleLength, stepped_len(title.0, title.1, title.2)),
            (Feature::Links, stepped_len(links.0, links.1, links.2)),
            (
                Feature::Verbosity,
                Some(linspace_len(verbosity.0, verbosity.1, settings.float_points)),
            ),
            (
                Feature::Sentiment,
                Some(linspace_len(sentiment.0, sentiment.1, settings.float_points)),
            ),
        ];
        check_planned_size(&planned, settings.max_grid_rows)?;

        Self::new([
            FeatureRange::stepped(Feature::ContentLength, content.0, content.1, content.2)?,
            FeatureRange::stepped(Feature::TitleLength, title.0, title.1, title.2)?,
            FeatureRange::stepped(Feature::Links, links.0, links.1, links.2)?,
            FeatureRange::linspace(Feature::Verbosity, verbosity.0, verbosity.1, settings.float_points)?,
            FeatureRange::linspace(Feature::Sentiment, sentiment.0, sentiment.1, settings.float_points)?,
        ])
    }

    pub fn get(&self, feature: Feature) -> &FeatureRange {
        &self.ranges[feature.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureRange> {
        self.ranges.iter()
    }

    pub fn lengths(&self) -> [usize; FEATURE_COUNT] {
        let mut out = [0; FEATURE_COUNT];
        for (slot, range) in out.iter_mut().zip(&self.ranges) {
            *slot = range.len();
        }
        out
    }

    /// Product of the range lengths, or `None` on overflow.
    pub fn product_len(&self) -> Option<usize> {
        self.ranges
            .iter()
            .try_fold(1usize, |acc, r| acc.checked_mul(r.len()))
    }
}

/// Reject a discretization whose running row product exceeds `max_rows`.
///
/// A `None` length (invalid bounds) is left for the range constructors to
/// report with their own message.
fn check_planned_size(planned: &[(Feature, Option<usize>)], max_rows: usize) -> Result<(), AppError> {
    let mut total = 1usize;
    for &(feature, len) in planned {
        let Some(len) = len else { continue };
        total = match total.checked_mul(len) {
            Some(t) if t <= max_rows => t,
            _ => {
                return Err(AppError::InvalidRange {
                    feature,
                    message: format!(
                        "{len} values push the grid above the cap of {max_rows} rows; coarsen the discretization"
                    ),
                });
            }
        };
    }
    Ok(())
}
