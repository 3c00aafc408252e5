//! Command-line parsing for the marginal traffic curve tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the grid/sweep code.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::Feature;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "tcurves",
    version,
    about = "Marginal probability curves of high organic traffic per article feature"
)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Train on a CSV of historical articles, sweep the grid, and report curves.
    Run(RunArgs),
    /// Same as `run`, on a synthetic training table.
    Demo(DemoArgs),
    /// Recompute curves from a predictions CSV written by `--export`.
    Curves(CurvesArgs),
    /// Plot a curves JSON written by `--export-curves`.
    Plot(PlotArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Training CSV: five feature columns plus `top` or `users`.
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct DemoArgs {
    /// Number of synthetic articles to generate.
    #[arg(long, default_value_t = 300)]
    pub articles: usize,

    /// Seed for synthetic article generation.
    #[arg(long, default_value_t = 7)]
    pub sample_seed: u64,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Options shared by `run` and `demo`.
#[derive(Debug, Args, Clone)]
pub struct PipelineArgs {
    /// First content-length grid value (words).
    #[arg(long, default_value_t = 300.0)]
    pub content_start: f64,

    /// Last content-length grid value (inclusive).
    #[arg(long, default_value_t = 2000.0)]
    pub content_stop: f64,

    /// Content-length grid step.
    #[arg(long, default_value_t = 100.0)]
    pub content_step: f64,

    /// Evenly spaced grid points for verbosity and sentiment.
    #[arg(long, default_value_t = 10)]
    pub points: usize,

    /// Refuse to build grids with more rows than this.
    #[arg(long, env = "TRAFFIC_CURVES_MAX_GRID_ROWS", default_value_t = 5_000_000)]
    pub max_grid_rows: usize,

    /// Number of trees in the random forest.
    #[arg(long, env = "TRAFFIC_CURVES_TREES", default_value_t = 500)]
    pub trees: usize,

    /// Maximum tree depth (unbounded if omitted).
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Features considered per split (default: sqrt of the feature count).
    #[arg(long)]
    pub max_features: Option<usize>,

    /// Random seed for bootstrap sampling and feature subsampling.
    #[arg(long, env = "TRAFFIC_CURVES_SEED", default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub plot: PlotSizeArgs,

    /// Export the resolved grid to a predictions CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export curves (plus training diagnostics) to JSON.
    #[arg(long = "export-curves", value_name = "JSON")]
    pub export_curves: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct PlotSizeArgs {
    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 60)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 12)]
    pub height: usize,
}

#[derive(Debug, Parser)]
pub struct CurvesArgs {
    /// Predictions CSV produced by `tcurves run --export`.
    #[arg(long, value_name = "CSV")]
    pub predictions: PathBuf,

    #[command(flatten)]
    pub plot: PlotSizeArgs,

    /// Export the recomputed curves to JSON.
    #[arg(long = "export-curves", value_name = "JSON")]
    pub export_curves: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Curves JSON produced by `--export-curves`.
    #[arg(long, value_name = "JSON")]
    pub curves: PathBuf,

    /// Plot only this feature.
    #[arg(long, value_enum)]
    pub feature: Option<Feature>,

    /// Plot width (columns).
    #[arg(long, default_value_t = 60)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 12)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn demo_defaults() {
        let cli = Cli::parse_from(["tcurves", "demo", "--articles", "50", "--no-plot"]);
        let Command::Demo(args) = cli.command else {
            panic!("expected demo");
        };
        assert_eq!(args.articles, 50);
        assert!(args.pipeline.plot.no_plot);
        assert_eq!(args.pipeline.content_step, 100.0);
    }

    #[test]
    fn plot_accepts_feature_names() {
        let cli = Cli::parse_from(["tcurves", "plot", "--curves", "c.json", "--feature", "title-length"]);
        let Command::Plot(args) = cli.command else {
            panic!("expected plot");
        };
        assert_eq!(args.feature, Some(Feature::TitleLength));
    }
}
