//! AdaBoost.R2 with linear loss.

use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::distributions::{Distribution, WeightedIndex};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use super::tree::{grow, RegressionTree, TreeParams};
use super::{check_fit_input, check_predict_input, FitError, Regressor};
use crate::utils::{weighted_quantile, Parallelism};

/// AdaBoost.R2 regressor (Drucker, 1997).
///
/// Each round fits a depth-3 tree on a weighted bootstrap resample, scores
/// its linear loss `|y - ŷ| / max|y - ŷ|` on every sample, and reweights
/// samples toward the ones it got wrong. Prediction is the weighted median
/// of the member trees.
///
/// Boosting stops early on a perfect fit or when the weighted loss reaches
/// 0.5; in the latter case the round's tree is dropped unless it is the
/// only one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoostRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub tree_params: TreeParams,
    pub seed: u64,
    trees: Vec<RegressionTree>,
    tree_weights: Vec<f64>,
    n_features: Option<usize>,
}

impl Default for AdaBoostRegressor {
    fn default() -> Self {
        Self::new(42)
    }
}

impl AdaBoostRegressor {
    /// 50 rounds of depth-3 trees at learning rate 1.0.
    pub fn new(seed: u64) -> Self {
        Self {
            n_estimators: 50,
            learning_rate: 1.0,
            tree_params: TreeParams::cart_with_depth(3),
            seed,
            trees: Vec::new(),
            tree_weights: Vec::new(),
            n_features: None,
        }
    }

    /// Voting weight of each member tree.
    pub fn tree_weights(&self) -> &[f64] {
        &self.tree_weights
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let n_features = super::fitted_width(self.n_features)?;
        if self.trees.is_empty() || self.trees.len() != self.tree_weights.len() {
            return Err(format!(
                "{} trees with {} weights",
                self.trees.len(),
                self.tree_weights.len()
            ));
        }
        self.trees.iter().try_for_each(|t| t.validate(n_features))
    }
}

/// Outcome of one boosting round.
enum Round {
    /// Keep the tree with this weight and continue with the given sample weights.
    Continue { tree_weight: f64 },
    /// Keep the tree with this weight and stop.
    Last { tree_weight: f64 },
    /// Discard the tree (unless it is the only one) and stop.
    Discard,
}

impl Regressor for AdaBoostRegressor {
    fn fit(
        &mut self,
        features: ArrayView2<f64>,
        targets: ArrayView1<f64>,
        _parallelism: Parallelism,
    ) -> Result<(), FitError> {
        check_fit_input(features, targets)?;
        let n_rows = features.nrows();
        let targets_vec = targets.to_vec();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut sample_weights = vec![1.0 / n_rows as f64; n_rows];

        let mut trees = Vec::with_capacity(self.n_estimators);
        let mut tree_weights = Vec::with_capacity(self.n_estimators);

        for round in 0..self.n_estimators {
            let sampler = WeightedIndex::new(&sample_weights)
                .map_err(|e| FitError::DegenerateWeights(e.to_string()))?;
            let mut counts = vec![0.0f64; n_rows];
            for _ in 0..n_rows {
                counts[sampler.sample(&mut rng)] += 1.0;
            }
            let rows: Vec<usize> = (0..n_rows).filter(|&r| counts[r] > 0.0).collect();
            let tree = grow(features, &targets_vec, &counts, rows, &self.tree_params);

            let mut errors: Vec<f64> = features
                .rows()
                .into_iter()
                .zip(targets.iter())
                .map(|(row, &y)| (tree.predict_row(row) - y).abs())
                .collect();
            let max_error = errors
                .iter()
                .zip(sample_weights.iter())
                .filter(|(_, &w)| w > 0.0)
                .map(|(&e, _)| e)
                .fold(0.0f64, f64::max);
            if max_error != 0.0 {
                errors.iter_mut().for_each(|e| *e /= max_error);
            }

            let loss: f64 = errors
                .iter()
                .zip(sample_weights.iter())
                .filter(|(_, &w)| w > 0.0)
                .map(|(&e, &w)| e * w)
                .sum();

            let outcome = if loss <= 0.0 {
                Round::Last { tree_weight: 1.0 }
            } else if loss >= 0.5 {
                Round::Discard
            } else {
                let beta = loss / (1.0 - loss);
                let tree_weight = self.learning_rate * (1.0 / beta).ln();
                if round + 1 < self.n_estimators {
                    for (w, &e) in sample_weights.iter_mut().zip(errors.iter()) {
                        if *w > 0.0 {
                            *w *= beta.powf((1.0 - e) * self.learning_rate);
                        }
                    }
                }
                Round::Continue { tree_weight }
            };

            match outcome {
                Round::Discard => {
                    if trees.is_empty() {
                        trees.push(tree);
                        tree_weights.push(0.0);
                    }
                    break;
                }
                Round::Last { tree_weight } => {
                    trees.push(tree);
                    tree_weights.push(tree_weight);
                    break;
                }
                Round::Continue { tree_weight } => {
                    trees.push(tree);
                    tree_weights.push(tree_weight);
                }
            }

            let total: f64 = sample_weights.iter().sum();
            if !total.is_finite() || total <= 0.0 {
                break;
            }
            if round + 1 < self.n_estimators {
                sample_weights.iter_mut().for_each(|w| *w /= total);
            }
        }

        tracing::debug!(n_trees = trees.len(), "adaboost fit finished");
        self.trees = trees;
        self.tree_weights = tree_weights;
        self.n_features = Some(features.ncols());
        Ok(())
    }

    fn predict(&self, features: ArrayView2<f64>) -> Result<Array1<f64>, FitError> {
        check_predict_input(features, self.n_features)?;
        if self.trees.is_empty() {
            return Err(FitError::NotFitted);
        }

        let mut member_preds = vec![0.0f64; self.trees.len()];
        let mut scratch = Vec::with_capacity(self.trees.len());
        Ok(features
            .rows()
            .into_iter()
            .map(|row| {
                for (slot, tree) in member_preds.iter_mut().zip(self.trees.iter()) {
                    *slot = tree.predict_row(row);
                }
                weighted_quantile(&member_preds, Some(&self.tree_weights), 0.5, &mut scratch)
            })
            .collect())
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::r2_score;
    use crate::testing::synthetic_linear_split;
    use ndarray::{s, Array2};

    #[test]
    fn perfect_first_round_stops_early() {
        // A depth-3 tree fits a two-level step function exactly, as long as
        // the bootstrap draws from both halves.
        let x = Array2::from_shape_fn((20, 1), |(i, _)| (i % 2) as f64);
        let y = Array1::from_shape_fn(20, |i| if i % 2 == 0 { 2.0 } else { 4.0 });
        let mut model = AdaBoostRegressor::new(1);
        model.fit(x.view(), y.view(), Parallelism::Sequential).unwrap();

        assert_eq!(model.tree_weights(), &[1.0]);
        assert_eq!(model.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn weights_stay_positive_and_bounded() {
        let (train, _) = synthetic_linear_split(100, 10, 3, 0.2, 4);
        let mut model = AdaBoostRegressor::new(9);
        model
            .fit(train.slice(s![.., ..3]), train.column(3), Parallelism::Sequential)
            .unwrap();

        assert!(!model.tree_weights().is_empty());
        assert!(model.tree_weights().len() <= 50);
        assert!(model.tree_weights().iter().all(|w| w.is_finite() && *w >= 0.0));
    }

    #[test]
    fn same_seed_same_model() {
        let (train, test) = synthetic_linear_split(60, 10, 2, 0.1, 2);
        let x = train.slice(s![.., ..2]);
        let y = train.column(2);

        let mut a = AdaBoostRegressor::new(5);
        let mut b = AdaBoostRegressor::new(5);
        a.fit(x, y, Parallelism::Sequential).unwrap();
        b.fit(x, y, Parallelism::Sequential).unwrap();

        let x_test = test.slice(s![.., ..2]);
        assert_eq!(a.predict(x_test).unwrap(), b.predict(x_test).unwrap());
    }

    #[test]
    fn defaults_fit_linear_signal() {
        let (train, test) = synthetic_linear_split(200, 50, 2, 0.05, 13);
        let mut model = AdaBoostRegressor::default();
        model
            .fit(train.slice(s![.., ..2]), train.column(2), Parallelism::Sequential)
            .unwrap();
        let pred = model.predict(test.slice(s![.., ..2])).unwrap();
        assert!(r2_score(test.column(2), pred.view()) > 0.6);
    }
}
