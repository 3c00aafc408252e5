//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initializes logging
//! - runs the pipeline (or reloads saved outputs)
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, CurvesArgs, PipelineArgs, PlotArgs};
use crate::domain::{ForestSettings, RangeSettings, RunConfig, TrainingSource};
use crate::error::AppError;
use crate::grid::stepped_len;
use crate::io::{curves_file, read_curves_json, write_curves_json, write_predictions_csv};

pub mod pipeline;

/// Entry point for the `tcurves` binary.
pub fn run() -> Result<(), AppError> {
    // Before parsing, so `env` fallbacks see values from `.env`.
    dotenvy::dotenv().ok();

    let cli = crate::cli::Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Run(args) => handle_pipeline(run_config_from_args(
            TrainingSource::Csv(args.input),
            &args.pipeline,
        )?),
        Command::Demo(args) => handle_pipeline(run_config_from_args(
            TrainingSource::Synthetic {
                articles: args.articles,
                seed: args.sample_seed,
            },
            &args.pipeline,
        )?),
        Command::Curves(args) => handle_curves(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn handle_pipeline(config: RunConfig) -> Result<(), AppError> {
    let run = pipeline::run_pipeline(&config)?;

    println!("{}", crate::report::format_run_summary(&run));
    println!("{}", crate::report::format_curves(&run.curves));

    if config.plot {
        println!(
            "{}",
            crate::plot::render_curves(&run.curves, config.plot_width, config.plot_height)
        );
    }

    // Optional exports.
    if let Some(path) = &config.export_predictions {
        write_predictions_csv(path, &run.grid)?;
    }
    if let Some(path) = &config.export_curves {
        let file = curves_file(run.curves.clone(), run.grid.len(), Some(run.training.clone()));
        write_curves_json(path, &file)?;
    }

    Ok(())
}

fn handle_curves(args: CurvesArgs) -> Result<(), AppError> {
    let (grid, curves) = pipeline::curves_from_predictions(&args.predictions)?;

    println!("Grid: {} rows ({} resolved)\n", grid.len(), grid.resolved_count());
    println!("{}", crate::report::format_curves(&curves));
    if !args.plot.no_plot {
        println!(
            "{}",
            crate::plot::render_curves(&curves, args.plot.width, args.plot.height)
        );
    }

    if let Some(path) = &args.export_curves {
        write_curves_json(path, &curves_file(curves, grid.len(), None))?;
    }
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let file = read_curves_json(&args.curves)?;

    let curves: Vec<_> = file
        .curves
        .into_iter()
        .filter(|c| args.feature.is_none_or(|f| f == c.feature))
        .collect();
    if curves.is_empty() {
        return Err(AppError::InvalidData(format!(
            "'{}' has no curve for the requested feature",
            args.curves.display()
        )));
    }

    println!("{}", crate::plot::render_curves(&curves, args.width, args.height));
    Ok(())
}

/// Map CLI flags to a validated run configuration.
pub fn run_config_from_args(source: TrainingSource, args: &PipelineArgs) -> Result<RunConfig, AppError> {
    if args.points == 0 {
        return Err(AppError::Config("--points must be >= 1".to_string()));
    }
    if args.trees == 0 {
        return Err(AppError::Config("--trees must be >= 1".to_string()));
    }
    if args.max_grid_rows == 0 {
        return Err(AppError::Config("--max-grid-rows must be >= 1".to_string()));
    }
    if !(args.content_step.is_finite() && args.content_step > 0.0) {
        return Err(AppError::Config("--content-step must be a positive number".to_string()));
    }
    if args.content_stop < args.content_start {
        return Err(AppError::Config(
            "--content-stop must not be below --content-start".to_string(),
        ));
    }
    let content_len = stepped_len(args.content_start, args.content_stop, args.content_step);
    if content_len.is_none_or(|n| n > args.max_grid_rows) {
        return Err(AppError::Config(format!(
            "--content-start/--content-stop/--content-step yield more than --max-grid-rows ({}) values",
            args.max_grid_rows
        )));
    }
    if args.points > args.max_grid_rows {
        return Err(AppError::Config(format!(
            "--points ({}) exceeds --max-grid-rows ({})",
            args.points, args.max_grid_rows
        )));
    }
    if matches!(source, TrainingSource::Synthetic { articles: 0, .. }) {
        return Err(AppError::Config("--articles must be >= 1".to_string()));
    }

    Ok(RunConfig {
        source,
        ranges: RangeSettings {
            content_start: args.content_start,
            content_stop: args.content_stop,
            content_step: args.content_step,
            float_points: args.points,
            max_grid_rows: args.max_grid_rows,
        },
        forest: ForestSettings {
            n_trees: args.trees,
            max_features: args.max_features,
            max_depth: args.max_depth,
            min_samples_split: 2,
            seed: args.seed,
        },
        plot: !args.plot.no_plot,
        plot_width: args.plot.width,
        plot_height: args.plot.height,
        export_predictions: args.export.clone(),
        export_curves: args.export_curves.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn pipeline_args(argv: &[&str]) -> PipelineArgs {
        let mut full = vec!["tcurves", "demo"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Command::Demo(args) => args.pipeline,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn flags_map_into_config() {
        let args = pipeline_args(&["--trees", "20", "--points", "4", "--export", "p.csv", "--no-plot"]);
        let config = run_config_from_args(TrainingSource::Synthetic { articles: 10, seed: 1 }, &args).unwrap();
        assert_eq!(config.forest.n_trees, 20);
        assert_eq!(config.ranges.float_points, 4);
        assert!(!config.plot);
        assert_eq!(config.export_predictions.as_deref(), Some(std::path::Path::new("p.csv")));
    }

    #[test]
    fn invalid_flags_are_config_errors() {
        let source = TrainingSource::Synthetic { articles: 10, seed: 1 };
        for argv in [
            &["--points", "0"][..],
            &["--content-step", "0"][..],
            &["--content-start", "900", "--content-stop", "800"][..],
            &["--content-stop", "1e15"][..],
            &["--points", "100", "--max-grid-rows", "50"][..],
        ] {
            let err = run_config_from_args(source.clone(), &pipeline_args(argv)).unwrap_err();
            assert!(matches!(err, AppError::Config(_)), "{argv:?}");
        }
    }
}
