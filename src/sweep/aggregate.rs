//! Reduce grid predictions into marginal curves.
//!
//! Shared by the sweep (right after resolving each value) and by the
//! `curves` command, which recomputes curves from a persisted predictions file
//! without touching a classifier.

use crate::domain::{CurvePoint, Feature, MarginalCurve};
use crate::error::AppError;
use crate::grid::{FeatureRange, Grid};

/// Proportion of `Top` among resolved rows holding `feature == value`.
pub fn aggregate_value(grid: &Grid, feature: Feature, value: f64) -> Result<CurvePoint, AppError> {
    let rows = grid
        .rows_with(feature, value)
        .ok_or(AppError::EmptySubset { feature, value })?;

    let mut matching = 0usize;
    let mut resolved = 0usize;
    let mut top = 0usize;
    for id in rows {
        matching += 1;
        if let Some(label) = grid.resolution(id).label() {
            resolved += 1;
            top += label.is_top() as usize;
        }
    }

    if matching == 0 {
        return Err(AppError::EmptySubset { feature, value });
    }
    if resolved == 0 {
        return Err(AppError::InvalidData(format!(
            "none of the {matching} grid rows with {feature} = {value} has a prediction"
        )));
    }

    Ok(CurvePoint {
        value,
        proportion: top as f64 / resolved as f64,
        rows: matching,
        resolved,
    })
}

/// Curve for one feature over the given values, without resolving anything.
pub fn marginal_curve(grid: &Grid, range: &FeatureRange) -> Result<MarginalCurve, AppError> {
    let feature = range.feature();
    let points = range
        .values()
        .iter()
        .map(|&v| aggregate_value(grid, feature, v))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MarginalCurve { feature, points })
}

/// Curves for all five features over the grid's own ranges.
pub fn marginal_curves(grid: &Grid) -> Result<Vec<MarginalCurve>, AppError> {
    Feature::ALL
        .into_iter()
        .map(|f| marginal_curve(grid, grid.range(f)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FEATURE_COUNT, Label};
    use crate::grid::{FeatureRanges, GridBuilder};

    fn grid() -> Grid {
        let lengths = [2, 1, 3, 1, 2];
        let ranges = FeatureRanges::new(std::array::from_fn(|i| {
            FeatureRange::new(Feature::ALL[i], (0..lengths[i]).map(|v| v as f64).collect())
        }))
        .unwrap();
        GridBuilder::default().build(ranges).unwrap()
    }

    #[test]
    fn counts_only_resolved_rows() {
        let mut g = grid();
        // Links = 1 occupies 4 rows; label two of them.
        let ids: Vec<usize> = g.rows_with(Feature::Links, 1.0).unwrap().collect();
        assert_eq!(ids.len(), 4);
        g.resolve(ids[0], Label::Top);
        g.resolve(ids[1], Label::NotTop);

        let point = aggregate_value(&g, Feature::Links, 1.0).unwrap();
        assert_eq!(point.rows, 4);
        assert_eq!(point.resolved, 2);
        assert_eq!(point.proportion, 0.5);
    }

    #[test]
    fn unknown_value_is_an_empty_subset() {
        let g = grid();
        let err = aggregate_value(&g, Feature::Sentiment, 0.25).unwrap_err();
        assert!(matches!(
            err,
            AppError::EmptySubset {
                feature: Feature::Sentiment,
                ..
            }
        ));
    }

    #[test]
    fn nothing_resolved_is_not_reported_as_zero() {
        let g = grid();
        let err = aggregate_value(&g, Feature::ContentLength, 0.0).unwrap_err();
        assert!(matches!(err, AppError::InvalidData(_)));
    }

    #[test]
    fn curves_cover_every_feature() {
        let mut g = grid();
        for id in 0..g.len() {
            let top = g.values(id)[0] == 1.0;
            g.resolve(id, Label::from_bool(top));
        }
        let curves = marginal_curves(&g).unwrap();
        assert_eq!(curves.len(), FEATURE_COUNT);
        assert_eq!(curves[0].proportions(), vec![0.0, 1.0]);
        assert!(curves[2].proportions().iter().all(|&p| p == 0.5));
    }
}
