//! Ordinary least squares.

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{check_fit_input, check_predict_input, FitError, Regressor};
use crate::utils::Parallelism;

/// Diagonal jitter tried, in order, on the unit-diagonal Gram matrix.
const JITTER_STEPS: [f64; 4] = [0.0, 1e-10, 1e-8, 1e-6];

/// Smallest acceptable Cholesky pivot, relative to the diagonal entry.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Least-squares linear model `y = X·w + b`.
///
/// Fits on centered data by solving the normal equations with a Cholesky
/// factorization. Collinear features get a tiny ridge so the solve succeeds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearRegression {
    coefficients: Vec<f64>,
    intercept: f64,
    n_features: Option<usize>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fitted coefficients, one per feature.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let n_features = super::fitted_width(self.n_features)?;
        if self.coefficients.len() != n_features {
            return Err(format!(
                "{} coefficients for {n_features} features",
                self.coefficients.len()
            ));
        }
        Ok(())
    }
}

impl Regressor for LinearRegression {
    fn fit(
        &mut self,
        features: ArrayView2<f64>,
        targets: ArrayView1<f64>,
        _parallelism: Parallelism,
    ) -> Result<(), FitError> {
        check_fit_input(features, targets)?;
        let (n_rows, n_cols) = features.dim();

        let x_mean = features.sum_axis(ndarray::Axis(0)) / n_rows as f64;
        let y_mean = targets.sum() / n_rows as f64;

        // Gram matrix and moment vector on centered data (row-major p×p).
        let mut gram = vec![0.0f64; n_cols * n_cols];
        let mut moment = vec![0.0f64; n_cols];
        let mut centered = vec![0.0f64; n_cols];
        for (row, &y) in features.rows().into_iter().zip(targets.iter()) {
            for (c, slot) in centered.iter_mut().enumerate() {
                *slot = row[c] - x_mean[c];
            }
            let dy = y - y_mean;
            for i in 0..n_cols {
                let xi = centered[i];
                moment[i] += xi * dy;
                for j in 0..=i {
                    gram[i * n_cols + j] += xi * centered[j];
                }
            }
        }
        for i in 0..n_cols {
            for j in 0..i {
                gram[j * n_cols + i] = gram[i * n_cols + j];
            }
        }

        // Solve in correlation form so both tolerances are relative to each
        // column's own spread. Constant columns keep a unit scale.
        let scales: Vec<f64> = (0..n_cols)
            .map(|i| {
                let d = gram[i * n_cols + i].sqrt();
                if d > 0.0 {
                    d
                } else {
                    1.0
                }
            })
            .collect();
        for i in 0..n_cols {
            moment[i] /= scales[i];
            for j in 0..n_cols {
                gram[i * n_cols + j] /= scales[i] * scales[j];
            }
        }

        let standardized = JITTER_STEPS
            .iter()
            .find_map(|&jitter| {
                let mut a = gram.clone();
                for i in 0..n_cols {
                    a[i * n_cols + i] += jitter;
                }
                cholesky_solve(&mut a, &moment, n_cols)
            })
            .ok_or(FitError::Singular)?;
        let coefficients: Vec<f64> = standardized
            .iter()
            .zip(scales.iter())
            .map(|(w, s)| w / s)
            .collect();

        let intercept = y_mean
            - coefficients
                .iter()
                .zip(x_mean.iter())
                .map(|(w, m)| w * m)
                .sum::<f64>();

        self.coefficients = coefficients;
        self.intercept = intercept;
        self.n_features = Some(n_cols);
        Ok(())
    }

    fn predict(&self, features: ArrayView2<f64>) -> Result<Array1<f64>, FitError> {
        check_predict_input(features, self.n_features)?;
        let w = ArrayView1::from(&self.coefficients[..]);
        Ok(features.dot(&w) + self.intercept)
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }
}

/// Solve `A·x = b` for symmetric positive-definite `A` (row-major `n×n`).
///
/// Factorizes `A` in place into its lower Cholesky factor. Returns `None` if
/// `A` is not numerically positive definite.
fn cholesky_solve(a: &mut [f64], b: &[f64], n: usize) -> Option<Vec<f64>> {
    for j in 0..n {
        let mut diag = a[j * n + j];
        for k in 0..j {
            diag -= a[j * n + k] * a[j * n + k];
        }
        if !(diag > PIVOT_TOLERANCE * a[j * n + j].abs()) {
            return None;
        }
        let diag = diag.sqrt();
        a[j * n + j] = diag;
        for i in (j + 1)..n {
            let mut v = a[i * n + j];
            for k in 0..j {
                v -= a[i * n + k] * a[j * n + k];
            }
            a[i * n + j] = v / diag;
        }
    }

    // Forward substitution: L·z = b
    let mut z = b.to_vec();
    for i in 0..n {
        for k in 0..i {
            z[i] -= a[i * n + k] * z[k];
        }
        z[i] /= a[i * n + i];
    }
    // Back substitution: Lᵀ·x = z
    for i in (0..n).rev() {
        for k in (i + 1)..n {
            z[i] -= a[k * n + i] * z[k];
        }
        z[i] /= a[i * n + i];
    }
    Some(z)
}
