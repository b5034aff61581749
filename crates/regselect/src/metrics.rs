//! Regression metrics.
//!
//! [`r2_score`] is the selection metric. The error metrics are kept for
//! diagnostics and tests.

use ndarray::ArrayView1;

// =============================================================================
// R² (Coefficient of Determination)
// =============================================================================

/// Coefficient of determination: `1 - SS_res / SS_tot`.
///
/// Higher is better, 1.0 is a perfect fit and the value is unbounded below.
///
/// A constant target gives `SS_tot == 0`; the score is then 1.0 for a perfect
/// fit and 0.0 otherwise. With fewer than two samples, or when the lengths
/// differ, R² is undefined and NaN is returned.
pub fn r2_score(targets: ArrayView1<f64>, predictions: ArrayView1<f64>) -> f64 {
    let n = targets.len();
    if n < 2 || predictions.len() != n {
        return f64::NAN;
    }

    let mean = targets.sum() / n as f64;
    let (ss_res, ss_tot) = targets
        .iter()
        .zip(predictions.iter())
        .fold((0.0f64, 0.0f64), |(res, tot), (&y, &p)| {
            let err = y - p;
            let dev = y - mean;
            (res + err * err, tot + dev * dev)
        });

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

// =============================================================================
// Error Metrics
// =============================================================================

/// Mean squared error: mean((pred - label)²). NaN on empty or mismatched input.
pub fn mean_squared_error(targets: ArrayView1<f64>, predictions: ArrayView1<f64>) -> f64 {
    mean_of(targets, predictions, |d| d * d)
}

/// Mean absolute error: mean(|pred - label|). NaN on empty or mismatched input.
pub fn mean_absolute_error(targets: ArrayView1<f64>, predictions: ArrayView1<f64>) -> f64 {
    mean_of(targets, predictions, f64::abs)
}

fn mean_of(targets: ArrayView1<f64>, predictions: ArrayView1<f64>, f: impl Fn(f64) -> f64) -> f64 {
    let n = targets.len();
    if n == 0 || predictions.len() != n {
        return f64::NAN;
    }
    let sum: f64 = targets
        .iter()
        .zip(predictions.iter())
        .map(|(&y, &p)| f(p - y))
        .sum();
    sum / n as f64
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::DEFAULT_TOLERANCE;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn r2_perfect() {
        let y = array![1.0, 2.0, 3.0];
        assert_eq!(r2_score(y.view(), y.view()), 1.0);
    }

    #[test]
    fn r2_mean_prediction_is_zero() {
        let y = array![1.0, 2.0, 3.0];
        let p = array![2.0, 2.0, 2.0];
        assert_abs_diff_eq!(r2_score(y.view(), p.view()), 0.0, epsilon = DEFAULT_TOLERANCE);
    }

    #[test]
    fn r2_known_value() {
        // SS_res = 0.25 + 0 + 0.25 = 0.5, SS_tot = 2.0 → 1 - 0.25 = 0.75
        let y = array![1.0, 2.0, 3.0];
        let p = array![1.5, 2.0, 2.5];
        assert_abs_diff_eq!(r2_score(y.view(), p.view()), 0.75, epsilon = DEFAULT_TOLERANCE);
    }

    #[test]
    fn r2_can_be_negative() {
        let y = array![1.0, 2.0, 3.0];
        let p = array![3.0, 2.0, 1.0];
        assert_abs_diff_eq!(r2_score(y.view(), p.view()), -3.0, epsilon = DEFAULT_TOLERANCE);
    }

    #[test]
    fn r2_constant_target() {
        let y = array![2.0, 2.0, 2.0];
        assert_eq!(r2_score(y.view(), y.view()), 1.0);
        let p = array![2.0, 2.5, 2.0];
        assert_eq!(r2_score(y.view(), p.view()), 0.0);
    }

    #[test]
    fn r2_undefined_cases() {
        let one = array![1.0];
        assert!(r2_score(one.view(), one.view()).is_nan());

        let y = array![1.0, 2.0];
        let p = array![1.0];
        assert!(r2_score(y.view(), p.view()).is_nan());
    }

    #[test]
    fn error_metrics_known_values() {
        let y = array![0.0, 0.0];
        let p = array![1.0, 2.0];
        assert_abs_diff_eq!(mean_squared_error(y.view(), p.view()), 2.5, epsilon = DEFAULT_TOLERANCE);
        assert_abs_diff_eq!(mean_absolute_error(y.view(), p.view()), 1.5, epsilon = DEFAULT_TOLERANCE);
    }
}
