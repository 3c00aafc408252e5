//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the grid/sweep code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::app::pipeline::{RunOutput, TrainingOrigin};
use crate::domain::{Feature, MarginalCurve, TrainingSummary};
use crate::io::ingest::LabelSource;
use crate::sweep::SweepStats;

/// Format the run summary (training data + classifier diagnostics + grid/sweep stats).
pub fn format_run_summary(run: &RunOutput) -> String {
    let mut out = String::new();

    out.push_str("=== tcurves - Traffic Marginal Curves ===\n");
    match &run.origin {
        TrainingOrigin::Csv {
            path,
            rows_read,
            skipped,
            label_source,
        } => {
            out.push_str(&format!("Training: {} ({rows_read} rows read, {skipped} skipped)\n", path.display()));
            out.push_str(&format!("Label: {}\n", format_label_source(label_source)));
        }
        TrainingOrigin::Synthetic { seed, threshold } => {
            out.push_str(&format!("Training: synthetic sample (seed={seed})\n"));
            out.push_str(&format!("Label: users >= median ({threshold:.1})\n"));
        }
    }

    out.push_str(&format_training(&run.training));
    out.push('\n');

    let lengths = run.grid.ranges().lengths();
    out.push_str(&format!(
        "Grid: {} rows = {}\n",
        run.grid.len(),
        lengths
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" x ")
    ));
    out.push_str(&format_sweeps(&run.stats));
    out
}

fn format_label_source(source: &LabelSource) -> String {
    match source {
        LabelSource::Column => "'top' column".to_string(),
        LabelSource::UsersMedian { threshold } => format!("users >= median ({threshold:.1})"),
    }
}

/// Classifier diagnostics: class balance, OOB score and importances.
pub fn format_training(summary: &TrainingSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Articles: n={} | top={} | trees={}\n",
        summary.n_articles, summary.n_top, summary.n_trees
    ));
    match summary.oob_score {
        Some(score) => out.push_str(&format!("OOB score: {score:.4}\n")),
        None => out.push_str("OOB score: n/a\n"),
    }
    out.push_str("Feature importances:\n");
    for (feature, importance) in Feature::ALL.iter().zip(&summary.feature_importances) {
        out.push_str(&format!("  {:<16} {importance:.4}\n", feature.display_name()));
    }
    out
}

fn format_sweeps(stats: &SweepStats) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Sweeps: {} rows classified in {} batches\n",
        stats.rows_classified, stats.batches
    ));
    for s in &stats.sweeps {
        out.push_str(&format!(
            "  {:<16} values={:<4} classified={:<9} resolved={}\n",
            s.feature.display_name(),
            s.values,
            s.rows_classified,
            s.resolved_after
        ));
    }
    out
}

/// Format one table per curve: value, proportion, supporting rows.
pub fn format_curves(curves: &[MarginalCurve]) -> String {
    let mut out = String::new();
    for curve in curves {
        out.push_str(&format!("{}:\n", curve.feature.display_name()));
        out.push_str(&format!("{:>12} {:>10} {:>10}\n", "value", "p(top)", "rows"));
        out.push_str(&format!("{:->12} {:->10} {:->10}\n", "", "", ""));
        for p in &curve.points {
            let value = if curve.feature.is_integral() {
                format!("{:.0}", p.value)
            } else {
                format!("{:.4}", p.value)
            };
            out.push_str(&format!("{value:>12} {:>10.4} {:>10}\n", p.proportion, p.rows));
        }
        out.push('\n');
    }
    out
}
