//! Regression estimators with library-default hyperparameters.
//!
//! Every estimator implements [`Regressor`]. [`Estimator`] wraps the seven
//! concrete types in one serializable enum so a candidate set can hold them
//! side by side and the winner can be persisted without knowing its type.
//!
//! # Estimators
//!
//! - [`LinearRegression`]: ordinary least squares with intercept
//! - [`KNeighborsRegressor`]: k = 5, uniform weights, Euclidean distance
//! - [`DecisionTreeRegressor`]: CART with squared error, grown to purity
//! - [`RandomForestRegressor`]: 100 bootstrapped CART trees
//! - [`XGBRegressor`]: second-order boosted trees, XGBoost defaults
//! - [`AdaBoostRegressor`]: AdaBoost.R2 over depth-3 trees
//! - [`GradientBoostingRegressor`]: least-squares boosting over depth-3 trees

mod adaboost;
mod boosting;
mod forest;
mod linear;
mod neighbors;
pub mod tree;

pub use adaboost::AdaBoostRegressor;
pub use boosting::{GradientBoostingRegressor, XGBRegressor};
pub use forest::RandomForestRegressor;
pub use linear::LinearRegression;
pub use neighbors::KNeighborsRegressor;
pub use tree::{DecisionTreeRegressor, RegressionTree, TreeParams};

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::utils::Parallelism;

// =============================================================================
// FitError
// =============================================================================

/// Errors raised while fitting or predicting.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    /// No training samples.
    #[error("cannot fit on an empty dataset")]
    EmptyInput,

    /// Zero feature columns.
    #[error("features must have at least one column")]
    NoFeatures,

    /// Target length does not match the number of feature rows.
    #[error("{n_targets} targets for {n_rows} feature rows")]
    TargetLengthMismatch { n_rows: usize, n_targets: usize },

    /// NaN or infinite value in the inputs.
    #[error("{what} contains NaN or infinite values")]
    NonFinite { what: &'static str },

    /// The estimator needs more samples than it was given.
    #[error("need at least {required} samples, got {got}")]
    TooFewSamples { required: usize, got: usize },

    /// `predict` called before `fit`.
    #[error("estimator is not fitted")]
    NotFitted,

    /// Prediction features do not match the fitted feature count.
    #[error("model was fitted on {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    /// The least-squares system could not be solved.
    #[error("normal equations are singular")]
    Singular,

    /// Sample weights collapsed during boosting.
    #[error("degenerate sample weights: {0}")]
    DegenerateWeights(String),
}

/// Validate the inputs to [`Regressor::fit`].
pub(crate) fn check_fit_input(
    features: ArrayView2<f64>,
    targets: ArrayView1<f64>,
) -> Result<(), FitError> {
    let (n_rows, n_cols) = features.dim();
    if n_rows == 0 {
        return Err(FitError::EmptyInput);
    }
    if n_cols == 0 {
        return Err(FitError::NoFeatures);
    }
    if targets.len() != n_rows {
        return Err(FitError::TargetLengthMismatch {
            n_rows,
            n_targets: targets.len(),
        });
    }
    if !features.iter().all(|v| v.is_finite()) {
        return Err(FitError::NonFinite { what: "features" });
    }
    if !targets.iter().all(|v| v.is_finite()) {
        return Err(FitError::NonFinite { what: "targets" });
    }
    Ok(())
}

/// Validate the inputs to [`Regressor::predict`] against the fitted width.
pub(crate) fn check_predict_input(
    features: ArrayView2<f64>,
    n_features: Option<usize>,
) -> Result<(), FitError> {
    let expected = n_features.ok_or(FitError::NotFitted)?;
    if features.ncols() != expected {
        return Err(FitError::FeatureMismatch {
            expected,
            got: features.ncols(),
        });
    }
    Ok(())
}

/// Fitted width of a loaded estimator, or an error if it was never fitted.
fn fitted_width(n_features: Option<usize>) -> Result<usize, String> {
    match n_features {
        Some(0) => Err("fitted on zero features".into()),
        Some(n) => Ok(n),
        None => Err("estimator is not fitted".into()),
    }
}

// =============================================================================
// Regressor
// =============================================================================

/// Common fit/predict capability of every estimator.
///
/// Features are sample-major: `[n_samples, n_features]`.
pub trait Regressor {
    /// Fit on the given samples, replacing any previous fit.
    fn fit(
        &mut self,
        features: ArrayView2<f64>,
        targets: ArrayView1<f64>,
        parallelism: Parallelism,
    ) -> Result<(), FitError>;

    /// Predict one value per sample.
    fn predict(&self, features: ArrayView2<f64>) -> Result<Array1<f64>, FitError>;

    /// Number of features seen during fit, `None` before fitting.
    fn n_features(&self) -> Option<usize>;

    fn is_fitted(&self) -> bool {
        self.n_features().is_some()
    }
}

// =============================================================================
// Estimator
// =============================================================================

/// The closed set of estimator types a candidate can hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    Linear(LinearRegression),
    KNeighbors(KNeighborsRegressor),
    DecisionTree(DecisionTreeRegressor),
    RandomForest(RandomForestRegressor),
    #[serde(rename = "xgboost")]
    XGBoost(XGBRegressor),
    #[serde(rename = "adaboost")]
    AdaBoost(AdaBoostRegressor),
    GradientBoosting(GradientBoostingRegressor),
}

impl Estimator {
    /// Short machine-readable type name (for logs and artifacts).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Linear(_) => "linear_regression",
            Self::KNeighbors(_) => "k_neighbors",
            Self::DecisionTree(_) => "decision_tree",
            Self::RandomForest(_) => "random_forest",
            Self::XGBoost(_) => "xgboost",
            Self::AdaBoost(_) => "adaboost",
            Self::GradientBoosting(_) => "gradient_boosting",
        }
    }

    /// Check that a deserialized estimator is fitted and internally
    /// consistent, so prediction cannot index out of bounds.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Linear(m) => m.validate(),
            Self::KNeighbors(m) => m.validate(),
            Self::DecisionTree(m) => m.validate(),
            Self::RandomForest(m) => m.validate(),
            Self::XGBoost(m) => m.validate(),
            Self::AdaBoost(m) => m.validate(),
            Self::GradientBoosting(m) => m.validate(),
        }
    }

    fn as_regressor(&self) -> &dyn Regressor {
        match self {
            Self::Linear(m) => m,
            Self::KNeighbors(m) => m,
            Self::DecisionTree(m) => m,
            Self::RandomForest(m) => m,
            Self::XGBoost(m) => m,
            Self::AdaBoost(m) => m,
            Self::GradientBoosting(m) => m,
        }
    }

    fn as_regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            Self::Linear(m) => m,
            Self::KNeighbors(m) => m,
            Self::DecisionTree(m) => m,
            Self::RandomForest(m) => m,
            Self::XGBoost(m) => m,
            Self::AdaBoost(m) => m,
            Self::GradientBoosting(m) => m,
        }
    }
}

impl Regressor for Estimator {
    fn fit(
        &mut self,
        features: ArrayView2<f64>,
        targets: ArrayView1<f64>,
        parallelism: Parallelism,
    ) -> Result<(), FitError> {
        self.as_regressor_mut().fit(features, targets, parallelism)
    }

    fn predict(&self, features: ArrayView2<f64>) -> Result<Array1<f64>, FitError> {
        self.as_regressor().predict(features)
    }

    fn n_features(&self) -> Option<usize> {
        self.as_regressor().n_features()
    }
}

macro_rules! impl_from_estimator {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Estimator {
                fn from(model: $ty) -> Self {
                    Self::$variant(model)
                }
            }
        )*
    };
}

impl_from_estimator! {
    LinearRegression => Linear,
    KNeighborsRegressor => KNeighbors,
    DecisionTreeRegressor => DecisionTree,
    RandomForestRegressor => RandomForest,
    XGBRegressor => XGBoost,
    AdaBoostRegressor => AdaBoost,
    GradientBoostingRegressor => GradientBoosting,
}
