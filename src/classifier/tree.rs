//! CART decision tree for binary labels (Gini impurity).
//!
//! Nodes live in a flat arena; children are referenced by index. Leaves store
//! the fraction of `Top` samples that reached them, so the forest can average
//! probabilities across trees.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::domain::{FEATURE_COUNT, FeatureVector};

/// Minimum impurity decrease for a split to count as an improvement.
const MIN_DECREASE: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_features: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        p_top: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct BestSplit {
    feature: usize,
    threshold: f64,
    /// Samples sorted by `feature`; the first `n_left` go left.
    order: Vec<usize>,
    n_left: usize,
    decrease: f64,
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    /// Total weighted impurity decrease per feature (unnormalized).
    importances: [f64; FEATURE_COUNT],
}

impl DecisionTree {
    /// Grow a tree on the samples listed in `sample` (duplicates allowed).
    pub fn fit(
        x: &[FeatureVector],
        y: &[bool],
        sample: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = DecisionTree {
            nodes: Vec::new(),
            importances: [0.0; FEATURE_COUNT],
        };
        tree.grow(x, y, sample, 0, params, rng);
        tree
    }

    /// Fraction of `Top` training samples in the leaf this row lands in.
    pub fn predict_proba(&self, row: &FeatureVector) -> f64 {
        let mut at = 0;
        loop {
            match self.nodes[at] {
                Node::Leaf { p_top } => return p_top,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    pub fn importances(&self) -> &[f64; FEATURE_COUNT] {
        &self.importances
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn grow(
        &mut self,
        x: &[FeatureVector],
        y: &[bool],
        sample: Vec<usize>,
        depth: usize,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> usize {
        let id = self.nodes.len();
        let n = sample.len();
        let n_top = sample.iter().filter(|&&i| y[i]).count();
        let p_top = if n == 0 { 0.0 } else { n_top as f64 / n as f64 };
        self.nodes.push(Node::Leaf { p_top });

        let pure = n_top == 0 || n_top == n;
        let too_deep = params.max_depth.is_some_and(|d| depth >= d);
        if pure || too_deep || n < params.min_samples_split.max(2) {
            return id;
        }

        let Some(split) = best_split(x, y, &sample, n_top, params.max_features, rng) else {
            return id;
        };

        self.importances[split.feature] += split.decrease;
        let mut order = split.order;
        let right_sample = order.split_off(split.n_left);
        let left = self.grow(x, y, order, depth + 1, params, rng);
        let right = self.grow(x, y, right_sample, depth + 1, params, rng);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }
}

fn gini(n_top: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = n_top as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

/// Search a random subset of features for the best threshold.
///
/// Features are visited in random order until `max_features` non-constant
/// features have been examined; constant features do not count against the
/// budget.
fn best_split(
    x: &[FeatureVector],
    y: &[bool],
    sample: &[usize],
    n_top: usize,
    max_features: usize,
    rng: &mut StdRng,
) -> Option<BestSplit> {
    let n = sample.len();
    let parent = n as f64 * gini(n_top, n);

    let mut features: Vec<usize> = (0..FEATURE_COUNT).collect();
    features.shuffle(rng);

    let mut best: Option<BestSplit> = None;
    let mut examined = 0;

    for feature in features {
        if examined >= max_features {
            break;
        }

        let mut order = sample.to_vec();
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));
        if x[order[0]][feature] == x[order[n - 1]][feature] {
            continue;
        }
        examined += 1;

        let mut left_top = 0usize;
        let mut local: Option<(usize, f64, f64)> = None;
        for i in 0..n - 1 {
            if y[order[i]] {
                left_top += 1;
            }
            let (lo, hi) = (x[order[i]][feature], x[order[i + 1]][feature]);
            if lo == hi {
                continue;
            }
            let n_left = i + 1;
            let children = n_left as f64 * gini(left_top, n_left)
                + (n - n_left) as f64 * gini(n_top - left_top, n - n_left);
            let decrease = parent - children;
            if local.is_none_or(|(_, _, d)| decrease > d) {
                let mid = lo + (hi - lo) / 2.0;
                let threshold = if mid < hi { mid } else { lo };
                local = Some((n_left, threshold, decrease));
            }
        }

        if let Some((n_left, threshold, decrease)) = local {
            if decrease > MIN_DECREASE && best.as_ref().is_none_or(|b| decrease > b.decrease) {
                best = Some(BestSplit {
                    feature,
                    threshold,
                    order,
                    n_left,
                    decrease,
                });
            }
        }
    }

    best
}
