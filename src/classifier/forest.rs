//! Bagged random forest of CART trees.
//!
//! Training:
//! - each tree draws a bootstrap sample (with replacement) of the articles
//! - each split considers a random subset of features (`sqrt(5)` by default)
//! - trees are grown in parallel, each with its own seed derived from the run
//!   seed, so results do not depend on thread scheduling
//!
//! Prediction averages leaf probabilities across trees and labels a row `Top`
//! when the mean is strictly above one half.

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::classifier::tree::{DecisionTree, TreeParams};
use crate::classifier::{Classifier, Trainer};
use crate::domain::{FEATURE_COUNT, FeatureVector, ForestSettings, Label, TrainingSet, TrainingSummary};
use crate::error::AppError;

/// Fits `RandomForest` models from a training table.
#[derive(Debug, Clone, Default)]
pub struct ForestTrainer {
    pub settings: ForestSettings,
}

impl ForestTrainer {
    pub fn new(settings: ForestSettings) -> Self {
        Self { settings }
    }
}

impl Trainer for ForestTrainer {
    type Model = RandomForest;

    fn fit(&self, data: &TrainingSet) -> Result<RandomForest, AppError> {
        let s = &self.settings;
        if data.is_empty() {
            return Err(AppError::InvalidData("cannot train on an empty table".to_string()));
        }
        if s.n_trees == 0 {
            return Err(AppError::Config("tree count must be > 0".to_string()));
        }
        if s.max_features == Some(0) {
            return Err(AppError::Config("max features must be > 0".to_string()));
        }

        let x: Vec<FeatureVector> = data.articles.iter().map(|a| a.features).collect();
        let y: Vec<bool> = data.articles.iter().map(|a| a.label.is_top()).collect();
        let n = x.len();

        let params = TreeParams {
            max_features: s
                .max_features
                .unwrap_or_else(|| (FEATURE_COUNT as f64).sqrt().floor() as usize)
                .clamp(1, FEATURE_COUNT),
            max_depth: s.max_depth,
            min_samples_split: s.min_samples_split,
        };

        info!(
            articles = n,
            trees = s.n_trees,
            max_features = params.max_features,
            "training random forest"
        );

        let fitted: Vec<(DecisionTree, Vec<bool>)> = (0..s.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(s.seed.wrapping_add(t as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let mut in_bag = vec![false; n];
                for &i in &sample {
                    in_bag[i] = true;
                }
                let tree = DecisionTree::fit(&x, &y, sample, &params, &mut rng);
                (tree, in_bag)
            })
            .collect();

        let oob_score = oob_score(&fitted, &x, &y);
        let importances = feature_importances(fitted.iter().map(|(t, _)| t));
        let trees: Vec<DecisionTree> = fitted.into_iter().map(|(t, _)| t).collect();

        debug!(
            nodes = trees.iter().map(DecisionTree::node_count).sum::<usize>(),
            ?oob_score,
            "random forest trained"
        );

        Ok(RandomForest {
            trees,
            oob_score,
            importances,
            n_articles: n,
            n_top: data.top_count(),
        })
    }
}

/// Accuracy of out-of-bag votes over articles left out of at least one tree.
fn oob_score(fitted: &[(DecisionTree, Vec<bool>)], x: &[FeatureVector], y: &[bool]) -> Option<f64> {
    let (scored, correct) = (0..x.len())
        .into_par_iter()
        .filter_map(|i| {
            let (sum, votes) = fitted
                .iter()
                .filter(|(_, in_bag)| !in_bag[i])
                .fold((0.0, 0usize), |(sum, votes), (tree, _)| {
                    (sum + tree.predict_proba(&x[i]), votes + 1)
                });
            (votes > 0).then(|| ((sum / votes as f64 > 0.5) == y[i]) as usize)
        })
        .fold(|| (0usize, 0usize), |(n, c), hit| (n + 1, c + hit))
        .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

    (scored > 0).then(|| correct as f64 / scored as f64)
}

/// Mean of per-tree normalized impurity decreases, renormalized to sum to 1.
fn feature_importances<'a>(trees: impl Iterator<Item = &'a DecisionTree>) -> [f64; FEATURE_COUNT] {
    let mut total = [0.0; FEATURE_COUNT];
    for tree in trees {
        let sum: f64 = tree.importances().iter().sum();
        if sum > 0.0 {
            for (acc, v) in total.iter_mut().zip(tree.importances()) {
                *acc += v / sum;
            }
        }
    }
    let sum: f64 = total.iter().sum();
    if sum > 0.0 {
        for v in &mut total {
            *v /= sum;
        }
    }
    total
}

/// A trained forest. Immutable and safe to share across threads.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    oob_score: Option<f64>,
    importances: [f64; FEATURE_COUNT],
    n_articles: usize,
    n_top: usize,
}

impl RandomForest {
    /// Mean leaf probability of `Top` across trees.
    pub fn predict_proba(&self, row: &FeatureVector) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(row)).sum();
        sum / self.trees.len() as f64
    }

    pub fn oob_score(&self) -> Option<f64> {
        self.oob_score
    }

    pub fn feature_importances(&self) -> &[f64; FEATURE_COUNT] {
        &self.importances
    }

    pub fn summary(&self) -> TrainingSummary {
        TrainingSummary {
            n_articles: self.n_articles,
            n_top: self.n_top,
            n_trees: self.trees.len(),
            oob_score: self.oob_score,
            feature_importances: self.importances.to_vec(),
        }
    }
}

impl Classifier for RandomForest {
    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<Label>, AppError> {
        Ok(rows
            .par_iter()
            .map(|row| Label::from_bool(self.predict_proba(row) > 0.5))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Article;

    fn separable(n: usize) -> TrainingSet {
        TrainingSet::new(
            (0..n)
                .map(|i| {
                    let links = (i % 10) as f64;
                    Article {
                        features: [500.0 + i as f64, 40.0, links, 15.0, 0.1],
                        label: Label::from_bool(links >= 5.0),
                    }
                })
                .collect(),
        )
    }

    fn settings() -> ForestSettings {
        ForestSettings {
            n_trees: 25,
            seed: 11,
            ..ForestSettings::default()
        }
    }

    #[test]
    fn learns_a_separable_rule() {
        let forest = ForestTrainer::new(settings()).fit(&separable(200)).unwrap();
        let labels = forest
            .predict(&[[700.0, 40.0, 1.0, 15.0, 0.1], [700.0, 40.0, 8.0, 15.0, 0.1]])
            .unwrap();
        assert_eq!(labels, vec![Label::NotTop, Label::Top]);

        let oob = forest.oob_score().unwrap();
        assert!(oob > 0.9, "oob score {oob}");
        let importances = forest.feature_importances();
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances[2] > importances[0]);
    }

    #[test]
    fn same_seed_same_forest() {
        let data = separable(120);
        let a = ForestTrainer::new(settings()).fit(&data).unwrap();
        let b = ForestTrainer::new(settings()).fit(&data).unwrap();
        let row = [900.0, 40.0, 4.0, 15.0, 0.1];
        assert_eq!(a.predict_proba(&row), b.predict_proba(&row));
        assert_eq!(a.oob_score(), b.oob_score());
    }

    #[test]
    fn rejects_empty_table_and_zero_trees() {
        let empty = ForestTrainer::new(settings()).fit(&TrainingSet::default());
        assert!(matches!(empty, Err(AppError::InvalidData(_))));

        let zero = ForestTrainer::new(ForestSettings {
            n_trees: 0,
            ..settings()
        })
        .fit(&separable(10));
        assert!(matches!(zero, Err(AppError::Config(_))));
    }
}
