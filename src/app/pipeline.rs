//! Shared pipeline logic used by the `run` and `demo` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! training table -> feature ranges -> grid -> forest -> five sweeps
//!
//! Ranges are derived from the same training table the forest is fitted on,
//! inside one run, so the grid never queries a model with ranges taken from a
//! different data snapshot.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::classifier::{ForestTrainer, Trainer};
use crate::data::generate_sample;
use crate::domain::{MarginalCurve, RunConfig, TrainingSet, TrainingSource, TrainingSummary};
use crate::error::AppError;
use crate::grid::{FeatureRanges, Grid, GridBuilder};
use crate::io::ingest::{LabelSource, load_training_csv};
use crate::io::read_predictions_csv;
use crate::sweep::{MarginalPredictor, SweepStats, marginal_curves};

/// Where the training table of a run came from.
#[derive(Debug, Clone)]
pub enum TrainingOrigin {
    Csv {
        path: PathBuf,
        rows_read: usize,
        skipped: usize,
        label_source: LabelSource,
    },
    Synthetic {
        seed: u64,
        threshold: f64,
    },
}

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub origin: TrainingOrigin,
    pub training: TrainingSummary,
    pub grid: Grid,
    pub curves: Vec<MarginalCurve>,
    pub stats: SweepStats,
}

/// Load the training table named by the config.
pub fn load_training(source: &TrainingSource) -> Result<(TrainingSet, TrainingOrigin), AppError> {
    match source {
        TrainingSource::Csv(path) => {
            let data = load_training_csv(path)?;
            let origin = TrainingOrigin::Csv {
                path: path.clone(),
                rows_read: data.rows_read,
                skipped: data.row_errors.len(),
                label_source: data.label_source,
            };
            Ok((data.training, origin))
        }
        TrainingSource::Synthetic { articles, seed } => {
            let sample = generate_sample(*articles, *seed)?;
            info!(articles, seed, threshold = sample.threshold, "generated synthetic training table");
            Ok((
                sample.training,
                TrainingOrigin::Synthetic {
                    seed: *seed,
                    threshold: sample.threshold,
                },
            ))
        }
    }
}

/// Execute the full pipeline and return the computed outputs.
pub fn run_pipeline(config: &RunConfig) -> Result<RunOutput, AppError> {
    let (training, origin) = load_training(&config.source)?;
    run_with_training(config, &training, origin)
}

/// Execute the pipeline on an already loaded training table.
pub fn run_with_training(
    config: &RunConfig,
    training: &TrainingSet,
    origin: TrainingOrigin,
) -> Result<RunOutput, AppError> {
    // 1) Ranges and grid first: an oversized grid fails before any training.
    let ranges = FeatureRanges::from_training(training, &config.ranges)?;
    let mut grid = GridBuilder::new(config.ranges.max_grid_rows).build(ranges)?;
    info!(rows = grid.len(), lengths = ?grid.ranges().lengths(), "grid ready");

    // 2) Fit the classifier.
    let forest = ForestTrainer::new(config.forest.clone()).fit(training)?;
    let summary = forest.summary();
    info!(oob_score = ?summary.oob_score, "classifier trained");

    // 3) Sweep every feature in canonical order over the shared grid.
    let mut predictor = MarginalPredictor::new(&forest);
    let curves = predictor.sweep_all(&mut grid)?;
    let stats = predictor.stats().clone();

    Ok(RunOutput {
        origin,
        training: summary,
        grid,
        curves,
        stats,
    })
}

/// Recompute all five curves from a persisted predictions file.
pub fn curves_from_predictions(path: &Path) -> Result<(Grid, Vec<MarginalCurve>), AppError> {
    let grid = read_predictions_csv(path)?;
    let curves = marginal_curves(&grid)?;
    Ok((grid, curves))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Feature, ForestSettings, RangeSettings};
    use crate::io::write_predictions_csv;

    fn config(articles: usize) -> RunConfig {
        RunConfig {
            source: TrainingSource::Synthetic { articles, seed: 5 },
            ranges: RangeSettings {
                content_start: 300.0,
                content_stop: 2000.0,
                content_step: 100.0,
                float_points: 3,
                max_grid_rows: 5_000_000,
            },
            forest: ForestSettings {
                n_trees: 15,
                seed: 3,
                ..ForestSettings::default()
            },
            plot: false,
            plot_width: 60,
            plot_height: 12,
            export_predictions: None,
            export_curves: None,
        }
    }

    #[test]
    fn synthetic_run_resolves_whole_grid() {
        let run = run_pipeline(&config(120)).unwrap();

        assert_eq!(run.curves.len(), 5);
        assert_eq!(run.grid.unresolved_count(), 0);
        assert_eq!(run.stats.rows_classified, run.grid.len());
        assert_eq!(run.curves[0].feature, Feature::ContentLength);
        assert_eq!(run.curves[0].points.len(), 18);
        for curve in &run.curves {
            assert_eq!(curve.points.len(), run.grid.range(curve.feature).len());
            assert!(curve.points.iter().all(|p| (0.0..=1.0).contains(&p.proportion)));
        }
    }

    #[test]
    fn persisted_predictions_reproduce_curves() {
        let run = run_pipeline(&config(80)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.csv");
        write_predictions_csv(&path, &run.grid).unwrap();

        let (grid, curves) = curves_from_predictions(&path).unwrap();
        assert_eq!(grid.len(), run.grid.len());
        assert_eq!(curves, run.curves);
    }

    #[test]
    fn oversized_grid_fails_before_training() {
        let mut cfg = config(50);
        cfg.ranges.max_grid_rows = 10;
        assert!(matches!(run_pipeline(&cfg), Err(crate::error::AppError::InvalidRange { .. })));
    }
}
