//! Predictions CSV: the resolved grid, one row per feature combination.
//!
//! Columns are the five feature values plus `prediction` (`0`/`1`, empty for
//! a row never resolved). Reading the file back rebuilds the `Grid`, checking
//! that the rows form a complete cartesian product.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{FEATURE_COUNT, Feature, Label};
use crate::error::AppError;
use crate::grid::{FeatureRange, FeatureRanges, Grid, GridBuilder, value_key};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PredictionRecord {
    content_length: f64,
    title_length: f64,
    links: f64,
    verbosity: f64,
    sentiment: f64,
    prediction: Option<u8>,
}

impl PredictionRecord {
    fn values(&self) -> [f64; FEATURE_COUNT] {
        [
            self.content_length,
            self.title_length,
            self.links,
            self.verbosity,
            self.sentiment,
        ]
    }
}

/// Write every grid row to a predictions CSV.
pub fn write_predictions_csv(path: &Path, grid: &Grid) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::io(path, e))?;
    let mut writer = csv::Writer::from_writer(file);

    for row in grid.rows() {
        let [content_length, title_length, links, verbosity, sentiment] = row.values;
        writer.serialize(PredictionRecord {
            content_length,
            title_length,
            links,
            verbosity,
            sentiment,
            prediction: row.resolution.label().map(Label::as_u8),
        })?;
    }
    writer.flush().map_err(|e| AppError::io(path, e))?;

    info!(path = %path.display(), rows = grid.len(), "wrote predictions");
    Ok(())
}

/// Rebuild a grid (with its resolutions) from a predictions CSV.
pub fn read_predictions_csv(path: &Path) -> Result<Grid, AppError> {
    let file = File::open(path).map_err(|e| AppError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let records = reader
        .deserialize()
        .collect::<Result<Vec<PredictionRecord>, _>>()?;
    let grid = grid_from_records(&records)?;

    info!(
        path = %path.display(),
        rows = grid.len(),
        resolved = grid.resolved_count(),
        "loaded predictions"
    );
    Ok(grid)
}

fn grid_from_records(records: &[PredictionRecord]) -> Result<Grid, AppError> {
    if records.is_empty() {
        return Err(AppError::InvalidData("predictions file has no rows".to_string()));
    }

    // Distinct values per feature, in order of first appearance.
    let mut values: [Vec<f64>; FEATURE_COUNT] = Default::default();
    let mut seen: [HashSet<u64>; FEATURE_COUNT] = Default::default();
    for record in records {
        for (i, v) in record.values().into_iter().enumerate() {
            if seen[i].insert(value_key(v)) {
                values[i].push(v);
            }
        }
    }

    let mut values = values.into_iter();
    let ranges = FeatureRanges::new(std::array::from_fn(|i| {
        FeatureRange::new(Feature::ALL[i], values.next().unwrap_or_default())
    }))?;

    // Size check before allocating: a complete product has exactly one record per row.
    let span = ranges.product_len();
    if span != Some(records.len()) {
        let span = span.map_or_else(|| "more than usize::MAX".to_string(), |n| n.to_string());
        return Err(AppError::InvalidData(format!(
            "predictions file has {} rows but its values span a grid of {span}",
            records.len()
        )));
    }
    let mut grid = GridBuilder::new(records.len()).build(ranges)?;

    let mut filled = vec![false; grid.len()];
    for (line, record) in records.iter().enumerate() {
        let v = record.values();
        let mut positions = [0usize; FEATURE_COUNT];
        for feature in Feature::ALL {
            let i = feature.index();
            positions[i] = grid.position_of(feature, v[i]).ok_or_else(|| {
                AppError::InvalidData(format!("row {} has unknown {feature} value {}", line + 2, v[i]))
            })?;
        }
        let id = grid.id_of(positions);
        if std::mem::replace(&mut filled[id], true) {
            return Err(AppError::InvalidData(format!(
                "row {} repeats the combination {v:?}",
                line + 2
            )));
        }

        match record.prediction {
            None => {}
            Some(0) => {
                grid.resolve(id, Label::NotTop);
            }
            Some(1) => {
                grid.resolve(id, Label::Top);
            }
            Some(other) => {
                return Err(AppError::InvalidData(format!(
                    "row {} has prediction {other}; expected 0 or 1",
                    line + 2
                )));
            }
        }
    }

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Resolution;
    use crate::sweep::marginal_curves;

    fn grid() -> Grid {
        let ranges = FeatureRanges::new([
            FeatureRange::stepped(Feature::ContentLength, 300.0, 500.0, 100.0).unwrap(),
            FeatureRange::stepped(Feature::TitleLength, 20.0, 21.0, 1.0).unwrap(),
            FeatureRange::stepped(Feature::Links, 0.0, 2.0, 1.0).unwrap(),
            FeatureRange::linspace(Feature::Verbosity, 9.3, 27.1, 4).unwrap(),
            FeatureRange::linspace(Feature::Sentiment, -0.83, 0.97, 3).unwrap(),
        ])
        .unwrap();
        GridBuilder::default().build(ranges).unwrap()
    }

    #[test]
    fn written_grid_reads_back_with_same_curves() {
        let mut original = grid();
        for id in 0..original.len() {
            let v = original.values(id);
            original.resolve(id, Label::from_bool(v[2] + v[4] > 1.0));
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.csv");
        write_predictions_csv(&path, &original).unwrap();
        let loaded = read_predictions_csv(&path).unwrap();

        assert_eq!(loaded.len(), original.len());
        assert_eq!(loaded.ranges(), original.ranges());
        assert_eq!(
            marginal_curves(&loaded).unwrap(),
            marginal_curves(&original).unwrap()
        );
    }

    #[test]
    fn unresolved_rows_stay_unresolved() {
        let mut original = grid();
        original.resolve(0, Label::NotTop);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.csv");
        write_predictions_csv(&path, &original).unwrap();
        let loaded = read_predictions_csv(&path).unwrap();

        assert_eq!(loaded.resolution(0), Resolution::Resolved(Label::NotTop));
        assert_eq!(loaded.resolution(1), Resolution::Unresolved);
        assert_eq!(loaded.resolved_count(), 1);
    }

    #[test]
    fn incomplete_product_is_rejected() {
        let row = |c: f64, l: f64| PredictionRecord {
            content_length: c,
            title_length: 20.0,
            links: l,
            verbosity: 10.0,
            sentiment: 0.0,
            prediction: Some(1),
        };
        let records = vec![row(300.0, 0.0), row(300.0, 1.0), row(400.0, 0.0)];
        assert!(matches!(
            grid_from_records(&records),
            Err(AppError::InvalidData(_))
        ));
    }

    #[test]
    fn sparse_rows_are_rejected_without_building_their_span() {
        let records: Vec<PredictionRecord> = (0..2000)
            .map(|i| {
                let x = i as f64;
                PredictionRecord {
                    content_length: x,
                    title_length: x,
                    links: x,
                    verbosity: x + 0.5,
                    sentiment: -x,
                    prediction: None,
                }
            })
            .collect();
        assert!(matches!(
            grid_from_records(&records),
            Err(AppError::InvalidData(_))
        ));
    }
}
