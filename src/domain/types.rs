//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - used in-memory while building and sweeping the grid
//! - exported to CSV/JSON
//! - reloaded later for plotting or recomputing curves

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Number of article features the pipeline models.
pub const FEATURE_COUNT: usize = 5;

/// One article's five feature values, in `Feature::ALL` order.
pub type FeatureVector = [f64; FEATURE_COUNT];

/// The five article features, in canonical (grid and sweep) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Words of body text.
    ContentLength,
    /// Characters in the title.
    TitleLength,
    /// Outbound `<a>` links in the body.
    Links,
    /// Average sentence length in words.
    Verbosity,
    /// Compound sentiment score in [-1, 1].
    Sentiment,
}

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::ContentLength,
        Feature::TitleLength,
        Feature::Links,
        Feature::Verbosity,
        Feature::Sentiment,
    ];

    /// Position of this feature inside a `FeatureVector`.
    pub fn index(self) -> usize {
        match self {
            Feature::ContentLength => 0,
            Feature::TitleLength => 1,
            Feature::Links => 2,
            Feature::Verbosity => 3,
            Feature::Sentiment => 4,
        }
    }

    /// Column name used in CSV files.
    pub fn column_name(self) -> &'static str {
        match self {
            Feature::ContentLength => "content_length",
            Feature::TitleLength => "title_length",
            Feature::Links => "links",
            Feature::Verbosity => "verbosity",
            Feature::Sentiment => "sentiment",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            Feature::ContentLength => "Content Length",
            Feature::TitleLength => "Title Length",
            Feature::Links => "Links",
            Feature::Verbosity => "Verbosity",
            Feature::Sentiment => "Sentiment",
        }
    }

    /// X-axis caption for plots.
    pub fn axis_label(self) -> &'static str {
        match self {
            Feature::ContentLength => "Words in Article",
            Feature::TitleLength => "Characters in Title",
            Feature::Links => "Outbound Links",
            Feature::Verbosity => "Average Sentence Length",
            Feature::Sentiment => "Sentiment",
        }
    }

    /// Whether grid values for this feature are integer steps.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Feature::ContentLength | Feature::TitleLength | Feature::Links
        )
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Binary classifier output: is the article in the top half of traffic?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    NotTop,
    Top,
}

impl Label {
    pub fn from_bool(top: bool) -> Self {
        if top { Label::Top } else { Label::NotTop }
    }

    pub fn is_top(self) -> bool {
        self == Label::Top
    }

    /// Integer encoding used in the predictions CSV.
    pub fn as_u8(self) -> u8 {
        match self {
            Label::NotTop => 0,
            Label::Top => 1,
        }
    }
}

/// Resolution state of a grid row.
///
/// `Unresolved` means no prediction has been computed yet. It is not the same
/// as `Resolved(Label::NotTop)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    Unresolved,
    Resolved(Label),
}

impl Resolution {
    pub fn label(self) -> Option<Label> {
        match self {
            Resolution::Unresolved => None,
            Resolution::Resolved(label) => Some(label),
        }
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// A historical article: five features plus the observed "top half" label.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub features: FeatureVector,
    pub label: Label,
}

/// Training table consumed by the classifier and by range derivation.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub articles: Vec<Article>,
}

impl TrainingSet {
    pub fn new(articles: Vec<Article>) -> Self {
        Self { articles }
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Observed `(min, max)` of one feature, or `None` for an empty table.
    pub fn feature_bounds(&self, feature: Feature) -> Option<(f64, f64)> {
        let idx = feature.index();
        let mut it = self.articles.iter().map(|a| a.features[idx]);
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    pub fn top_count(&self) -> usize {
        self.articles.iter().filter(|a| a.label.is_top()).count()
    }
}

/// Discretization settings used to derive feature ranges from training data.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSettings {
    pub content_start: f64,
    pub content_stop: f64,
    pub content_step: f64,
    /// Number of evenly spaced points for verbosity and sentiment.
    pub float_points: usize,
    /// Upper bound on the cartesian-product size.
    pub max_grid_rows: usize,
}

impl Default for RangeSettings {
    fn default() -> Self {
        Self {
            content_start: 300.0,
            content_stop: 2000.0,
            content_step: 100.0,
            float_points: 10,
            max_grid_rows: 5_000_000,
        }
    }
}

/// Random forest hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestSettings {
    pub n_trees: usize,
    /// Features considered per split; `None` means `floor(sqrt(n_features))`.
    pub max_features: Option<usize>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestSettings {
    fn default() -> Self {
        Self {
            n_trees: 500,
            max_features: None,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

/// Where the training table comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingSource {
    Csv(PathBuf),
    Synthetic { articles: usize, seed: u64 },
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus environment and defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: TrainingSource,
    pub ranges: RangeSettings,
    pub forest: ForestSettings,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_predictions: Option<PathBuf>,
    pub export_curves: Option<PathBuf>,
}

/// One point on a marginal curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub value: f64,
    /// Fraction of resolved matching rows predicted `Top`.
    pub proportion: f64,
    /// Grid rows holding this value.
    pub rows: usize,
    /// Of those, rows resolved when the point was computed.
    pub resolved: usize,
}

/// Per-feature marginal probability curve: value -> proportion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginalCurve {
    pub feature: Feature,
    pub points: Vec<CurvePoint>,
}

impl MarginalCurve {
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn proportions(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.proportion).collect()
    }

    /// Proportion recorded for an exact value.
    pub fn proportion_at(&self, value: f64) -> Option<f64> {
        self.points
            .iter()
            .find(|p| p.value == value)
            .map(|p| p.proportion)
    }
}

/// Classifier training diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub n_articles: usize,
    pub n_top: usize,
    pub n_trees: usize,
    pub oob_score: Option<f64>,
    /// Impurity importances in `Feature::ALL` order.
    pub feature_importances: Vec<f64>,
}

/// A saved curves file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurvesFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub grid_rows: usize,
    pub training: Option<TrainingSummary>,
    pub curves: Vec<MarginalCurve>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_order_matches_indices() {
        for (i, f) in Feature::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
        }
    }

    #[test]
    fn unresolved_is_not_label_zero() {
        assert_ne!(Resolution::Unresolved, Resolution::Resolved(Label::NotTop));
        assert_eq!(Resolution::Unresolved.label(), None);
        assert_eq!(Resolution::Resolved(Label::NotTop).label(), Some(Label::NotTop));
    }

    #[test]
    fn training_bounds_cover_all_rows() {
        let set = TrainingSet::new(vec![
            Article {
                features: [500.0, 40.0, 3.0, 12.5, 0.2],
                label: Label::Top,
            },
            Article {
                features: [900.0, 25.0, 0.0, 18.0, -0.4],
                label: Label::NotTop,
            },
        ]);
        assert_eq!(set.feature_bounds(Feature::Links), Some((0.0, 3.0)));
        assert_eq!(set.feature_bounds(Feature::Sentiment), Some((-0.4, 0.2)));
        assert_eq!(set.top_count(), 1);
        assert_eq!(TrainingSet::default().feature_bounds(Feature::Links), None);
    }
}
