//! Testing utilities for regselect.
//!
//! Synthetic train/test arrays in the selector's input layout (features
//! followed by the target column) and shared float tolerances. Used by the
//! unit tests, the integration tests, and the benchmarks.

use ndarray::{s, Array1, Array2, ArrayView1};
use rand::prelude::*;

// =============================================================================
// Constants
// =============================================================================

/// Default tolerance for floating point comparisons of O(1) values.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

// =============================================================================
// Synthetic Data
// =============================================================================

/// Generate random features uniform in `[-1, 1]`, shape `[rows, cols]`.
pub fn random_features(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<f64> {
    Array2::from_shape_simple_fn((rows, cols), || rng.gen::<f64>() * 2.0 - 1.0)
}

/// Generate a train/test pair whose target is a linear function of the
/// features plus uniform noise in `[-noise, noise]`.
///
/// Each weight has magnitude in `[0.5, 1.5]` and a random sign, so every
/// feature carries signal. Both arrays have `n_features + 1` columns with the
/// target last.
pub fn synthetic_linear_split(
    train_rows: usize,
    test_rows: usize,
    n_features: usize,
    noise: f64,
    seed: u64,
) -> (Array2<f64>, Array2<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let weights: Vec<f64> = (0..n_features)
        .map(|_| {
            let magnitude = 0.5 + rng.gen::<f64>();
            if rng.gen::<bool>() { magnitude } else { -magnitude }
        })
        .collect();
    let bias = rng.gen::<f64>() * 0.5 - 0.25;

    let mut make = |rows: usize| {
        let features = random_features(rows, n_features, &mut rng);
        let targets = features.dot(&ArrayView1::from(&weights[..])).mapv(|y| {
            y + bias + (rng.gen::<f64>() * 2.0 - 1.0) * noise
        });
        stack_target(features, targets)
    };
    let train = make(train_rows);
    let test = make(test_rows);
    (train, test)
}

/// Generate a train/test pair whose target is uniform noise in `[-1, 1]`,
/// independent of the features.
pub fn noise_split(
    train_rows: usize,
    test_rows: usize,
    n_features: usize,
    seed: u64,
) -> (Array2<f64>, Array2<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut make = |rows: usize| {
        let features = random_features(rows, n_features, &mut rng);
        let targets = Array1::from_shape_simple_fn(rows, || rng.gen::<f64>() * 2.0 - 1.0);
        stack_target(features, targets)
    };
    let train = make(train_rows);
    let test = make(test_rows);
    (train, test)
}

/// Append `targets` as the last column of `features`.
fn stack_target(features: Array2<f64>, targets: Array1<f64>) -> Array2<f64> {
    let (rows, cols) = features.dim();
    let mut out = Array2::zeros((rows, cols + 1));
    out.slice_mut(s![.., ..cols]).assign(&features);
    out.column_mut(cols).assign(&targets);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Axis;

    #[test]
    fn linear_split_layout() {
        let (train, test) = synthetic_linear_split(30, 7, 4, 0.1, 0);
        assert_eq!(train.dim(), (30, 5));
        assert_eq!(test.dim(), (7, 5));
        assert!(train.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn same_seed_same_data() {
        let a = synthetic_linear_split(10, 5, 3, 0.1, 9);
        let b = synthetic_linear_split(10, 5, 3, 0.1, 9);
        assert_eq!(a, b);
        let c = noise_split(10, 5, 3, 9);
        let d = noise_split(10, 5, 3, 9);
        assert_eq!(c, d);
    }

    #[test]
    fn features_in_unit_box() {
        let (train, _) = noise_split(50, 1, 3, 1);
        let max_abs = train
            .index_axis(Axis(1), 0)
            .iter()
            .fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(max_abs <= 1.0);
    }
}
