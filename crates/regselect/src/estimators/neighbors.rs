//! Brute-force k-nearest-neighbors regression.

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{check_fit_input, check_predict_input, FitError, Regressor};
use crate::utils::Parallelism;

/// k-NN regressor with uniform weights and Euclidean distance.
///
/// Fitting memorizes the training set. Prediction averages the targets of the
/// `k` closest training rows; among equidistant rows the earlier one is
/// preferred.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNeighborsRegressor {
    pub n_neighbors: usize,
    /// Training features, row-major `[n_samples * n_features]`.
    samples: Vec<f64>,
    targets: Vec<f64>,
    n_features: Option<usize>,
}

impl Default for KNeighborsRegressor {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KNeighborsRegressor {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            samples: Vec::new(),
            targets: Vec::new(),
            n_features: None,
        }
    }

    /// Number of memorized training rows.
    pub fn n_samples(&self) -> usize {
        self.targets.len()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let n_features = super::fitted_width(self.n_features)?;
        if self.targets.is_empty() || self.samples.len() != self.targets.len() * n_features {
            return Err(format!(
                "{} stored values for {} samples of {n_features} features",
                self.samples.len(),
                self.targets.len()
            ));
        }
        Ok(())
    }

    fn sample(&self, i: usize, n_features: usize) -> &[f64] {
        &self.samples[i * n_features..(i + 1) * n_features]
    }
}

#[inline]
fn squared_distance(a: ArrayView1<f64>, b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl Regressor for KNeighborsRegressor {
    fn fit(
        &mut self,
        features: ArrayView2<f64>,
        targets: ArrayView1<f64>,
        _parallelism: Parallelism,
    ) -> Result<(), FitError> {
        check_fit_input(features, targets)?;
        let k = self.n_neighbors.max(1);
        if features.nrows() < k {
            return Err(FitError::TooFewSamples {
                required: k,
                got: features.nrows(),
            });
        }

        self.samples = features.iter().copied().collect();
        self.targets = targets.to_vec();
        self.n_features = Some(features.ncols());
        Ok(())
    }

    fn predict(&self, features: ArrayView2<f64>) -> Result<Array1<f64>, FitError> {
        check_predict_input(features, self.n_features)?;
        let n_features = features.ncols();
        let k = self.n_neighbors.max(1).min(self.n_samples());

        let mut dist: Vec<(f64, usize)> = Vec::with_capacity(self.n_samples());
        Ok(features
            .rows()
            .into_iter()
            .map(|row| {
                dist.clear();
                dist.extend(
                    (0..self.n_samples())
                        .map(|i| (squared_distance(row, self.sample(i, n_features)), i)),
                );
                // Order by distance, then by index for ties.
                let cmp = |a: &(f64, usize), b: &(f64, usize)| {
                    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
                };
                if k < dist.len() {
                    dist.select_nth_unstable_by(k - 1, cmp);
                }
                dist[..k].iter().map(|&(_, i)| self.targets[i]).sum::<f64>() / k as f64
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
    use crate::testing::DEFAULT_TOLERANCE;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 3.0)] // rows 0..=4
    #[case(9.0, 8.0)] // rows 5..=9
    #[case(4.4, 5.0)] // rows 2..=6
    fn averages_the_five_closest(#[case] query: f64, #[case] expected: f64) {
        // Ten points on a line, target = position + 1.
        let x = Array1::from_iter((0..10).map(|i| i as f64)).insert_axis(ndarray::Axis(1));
        let y = Array1::from_iter((0..10).map(|i| i as f64 + 1.0));
        let mut model = KNeighborsRegressor::default();
        model.fit(x.view(), y.view(), Parallelism::Sequential).unwrap();

        let pred = model.predict(array![[query]].view()).unwrap();
        assert_abs_diff_eq!(pred[0], expected, epsilon = DEFAULT_TOLERANCE);
    }

    #[test]
    fn uses_euclidean_distance() {
        // From (1, 1): √2 to the origin, √13 to (3, 4), √162 to (10, 10).
        let x = array![[0.0, 0.0], [3.0, 4.0], [10.0, 10.0]];
        let y = array![1.0, 2.0, 100.0];
        let mut model = KNeighborsRegressor::new(2);
        model.fit(x.view(), y.view(), Parallelism::Sequential).unwrap();
        let pred = model.predict(array![[1.0, 1.0]].view()).unwrap();
        assert_abs_diff_eq!(pred[0], 1.5, epsilon = DEFAULT_TOLERANCE);
    }

    #[test]
    fn equidistant_ties_prefer_earlier_rows() {
        let x = array![[1.0], [-1.0], [1.0]];
        let y = array![10.0, 20.0, 30.0];
        let mut model = KNeighborsRegressor::new(1);
        model.fit(x.view(), y.view(), Parallelism::Sequential).unwrap();
        assert_eq!(model.predict(array![[0.0]].view()).unwrap(), array![10.0]);
    }

    #[test]
    fn needs_at_least_k_samples() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![0.0, 1.0, 2.0];
        let mut model = KNeighborsRegressor::default();
        assert_eq!(
            model.fit(x.view(), y.view(), Parallelism::Sequential),
            Err(FitError::TooFewSamples { required: 5, got: 3 })
        );
        assert!(!model.is_fitted());
    }
}
