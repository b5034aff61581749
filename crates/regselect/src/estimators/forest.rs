//! Bootstrap-aggregated CART trees.

use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use super::tree::{grow, RegressionTree, TreeParams};
use super::{check_fit_input, check_predict_input, FitError, Regressor};
use crate::utils::Parallelism;

/// Random forest regressor.
///
/// Each tree is grown to purity on a bootstrap sample drawn with replacement;
/// repeated draws become integer sample weights. Predictions average all trees.
/// Tree `i` uses the seed `seed + i`, so fits are reproducible regardless of
/// thread count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    pub n_estimators: usize,
    pub tree_params: TreeParams,
    pub seed: u64,
    trees: Vec<RegressionTree>,
    n_features: Option<usize>,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(42)
    }
}

impl RandomForestRegressor {
    /// 100 fully grown trees.
    pub fn new(seed: u64) -> Self {
        Self {
            n_estimators: 100,
            tree_params: TreeParams::cart(),
            seed,
            trees: Vec::new(),
            n_features: None,
        }
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let n_features = super::fitted_width(self.n_features)?;
        if self.trees.is_empty() {
            return Err("random forest has no trees".into());
        }
        self.trees.iter().try_for_each(|t| t.validate(n_features))
    }
}

/// Draw `n` row indices with replacement and return per-row counts.
fn bootstrap_counts(n: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut counts = vec![0.0f64; n];
    for _ in 0..n {
        counts[rng.gen_range(0..n)] += 1.0;
    }
    counts
}

impl Regressor for RandomForestRegressor {
    fn fit(
        &mut self,
        features: ArrayView2<f64>,
        targets: ArrayView1<f64>,
        parallelism: Parallelism,
    ) -> Result<(), FitError> {
        check_fit_input(features, targets)?;
        let n_rows = features.nrows();
        let targets = targets.to_vec();
        let params = self.tree_params;
        let seed = self.seed;

        self.trees = parallelism.maybe_par_map(0..self.n_estimators, |i| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            let weights = bootstrap_counts(n_rows, &mut rng);
            let rows: Vec<usize> = (0..n_rows).filter(|&r| weights[r] > 0.0).collect();
            grow(features, &targets, &weights, rows, &params)
        });
        self.n_features = Some(features.ncols());
        Ok(())
    }

    fn predict(&self, features: ArrayView2<f64>) -> Result<Array1<f64>, FitError> {
        check_predict_input(features, self.n_features)?;
        if self.trees.is_empty() {
            return Err(FitError::NotFitted);
        }
        let mut sum = Array1::<f64>::zeros(features.nrows());
        for tree in &self.trees {
            sum += &tree.predict_rows(features);
        }
        Ok(sum / self.trees.len() as f64)
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
    use ndarray::s;

    #[test]
    fn bootstrap_counts_sum_to_n() {
        let mut rng = StdRng::seed_from_u64(7);
        let counts = bootstrap_counts(50, &mut rng);
        assert_eq!(counts.iter().sum::<f64>(), 50.0);
    }

    #[test]
    fn fit_is_deterministic_across_parallelism() {
        let (train, test) = synthetic_linear_split(60, 10, 3, 0.1, 11);
        let x = train.slice(s![.., ..3]);
        let y = train.column(3);

        let mut seq = RandomForestRegressor { n_estimators: 10, ..RandomForestRegressor::new(3) };
        seq.fit(x, y, Parallelism::Sequential).unwrap();
        let mut par = RandomForestRegressor { n_estimators: 10, ..RandomForestRegressor::new(3) };
        par.fit(x, y, Parallelism::Parallel).unwrap();
        assert_eq!(seq.trees(), par.trees());

        let x_test = test.slice(s![.., ..3]);
        assert_eq!(seq.predict(x_test).unwrap(), par.predict(x_test).unwrap());
    }

    #[test]
    fn learns_smooth_signal() {
        let (train, test) = synthetic_linear_split(200, 40, 2, 0.05, 5);
        let x = train.slice(s![.., ..2]);
        let y = train.column(2);
        let mut model = RandomForestRegressor::new(0);
        model.fit(x, y, Parallelism::Sequential).unwrap();
        assert_eq!(model.trees().len(), 100);

        let pred = model.predict(test.slice(s![.., ..2])).unwrap();
        assert!(r2_score(test.column(2), pred.view()) > 0.6);
    }
}
