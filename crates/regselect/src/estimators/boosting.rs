//! Additive tree ensembles trained on squared-error residuals.
//!
//! Both estimators start from the target mean and add one shrunken tree per
//! round, fitted to the current residuals `y - F(x)`. With squared loss the
//! gradient is `F - y` and the hessian is 1, so the Newton target of a
//! second-order booster is exactly the residual. The two estimators differ
//! only in tree parameters and learning rate:
//!
//! - [`XGBRegressor`]: λ-regularized leaves, depth 6, η = 0.3
//! - [`GradientBoostingRegressor`]: plain mean leaves, depth 3, η = 0.1

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::tree::{grow, RegressionTree, TreeParams};
use super::{check_fit_input, check_predict_input, FitError, Regressor};
use crate::utils::Parallelism;

/// Fitted additive ensemble: `F(x) = base_score + Σ tree_i(x)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoostedTrees {
    base_score: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl BoostedTrees {
    fn fit(
        features: ArrayView2<f64>,
        targets: ArrayView1<f64>,
        n_rounds: usize,
        learning_rate: f64,
        params: &TreeParams,
    ) -> Result<Self, FitError> {
        check_fit_input(features, targets)?;
        let n_rows = features.nrows();
        let base_score = targets.sum() / n_rows as f64;

        let mut predictions = vec![base_score; n_rows];
        let mut residuals = vec![0.0f64; n_rows];
        let weights = vec![1.0f64; n_rows];
        let mut trees = Vec::with_capacity(n_rounds);

        for _ in 0..n_rounds {
            for ((r, &y), &p) in residuals.iter_mut().zip(targets.iter()).zip(predictions.iter()) {
                *r = y - p;
            }
            let rows: Vec<usize> = (0..n_rows).collect();
            let mut tree = grow(features, &residuals, &weights, rows, params);
            tree.scale_leaves(learning_rate);

            for (p, row) in predictions.iter_mut().zip(features.rows()) {
                *p += tree.predict_row(row);
            }
            trees.push(tree);
        }

        Ok(Self {
            base_score,
            trees,
            n_features: features.ncols(),
        })
    }

    fn predict(&self, features: ArrayView2<f64>) -> Array1<f64> {
        features
            .rows()
            .into_iter()
            .map(|row| {
                self.base_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
            })
            .collect()
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn validate(&self) -> Result<(), String> {
        let n_features = super::fitted_width(Some(self.n_features))?;
        self.trees.iter().try_for_each(|t| t.validate(n_features))
    }
}

// =============================================================================
// XGBRegressor
// =============================================================================

/// Gradient-boosted trees with XGBoost's default regression settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub tree_params: TreeParams,
    model: Option<BoostedTrees>,
}

impl Default for XGBRegressor {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            tree_params: TreeParams::xgboost(),
            model: None,
        }
    }
}

impl XGBRegressor {
    pub fn model(&self) -> Option<&BoostedTrees> {
        self.model.as_ref()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        self.model
            .as_ref()
            .ok_or_else(|| "estimator is not fitted".to_string())?
            .validate()
    }
}

impl Regressor for XGBRegressor {
    fn fit(
        &mut self,
        features: ArrayView2<f64>,
        targets: ArrayView1<f64>,
        _parallelism: Parallelism,
    ) -> Result<(), FitError> {
        self.model = Some(BoostedTrees::fit(
            features,
            targets,
            self.n_estimators,
            self.learning_rate,
            &self.tree_params,
        )?);
        Ok(())
    }

    fn predict(&self, features: ArrayView2<f64>) -> Result<Array1<f64>, FitError> {
        check_predict_input(features, self.n_features())?;
        let model = self.model.as_ref().ok_or(FitError::NotFitted)?;
        Ok(model.predict(features))
    }

    fn n_features(&self) -> Option<usize> {
        self.model.as_ref().map(|m| m.n_features)
    }
}

// =============================================================================
// GradientBoostingRegressor
// =============================================================================

/// Least-squares gradient boosting over shallow CART trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub tree_params: TreeParams,
    model: Option<BoostedTrees>,
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            tree_params: TreeParams::cart_with_depth(3),
            model: None,
        }
    }
}

impl GradientBoostingRegressor {
    pub fn model(&self) -> Option<&BoostedTrees> {
        self.model.as_ref()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        self.model
            .as_ref()
            .ok_or_else(|| "estimator is not fitted".to_string())?
            .validate()
    }
}

impl Regressor for GradientBoostingRegressor {
    fn fit(
        &mut self,
        features: ArrayView2<f64>,
        targets: ArrayView1<f64>,
        _parallelism: Parallelism,
    ) -> Result<(), FitError> {
        self.model = Some(BoostedTrees::fit(
            features,
            targets,
            self.n_estimators,
            self.learning_rate,
            &self.tree_params,
        )?);
        Ok(())
    }

    fn predict(&self, features: ArrayView2<f64>) -> Result<Array1<f64>, FitError> {
        check_predict_input(features, self.n_features())?;
        let model = self.model.as_ref().ok_or(FitError::NotFitted)?;
        Ok(model.predict(features))
    }

    fn n_features(&self) -> Option<usize> {
        self.model.as_ref().map(|m| m.n_features)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{mean_squared_error, r2_score};
    use crate::testing::{synthetic_linear_split, DEFAULT_TOLERANCE};
    use approx::assert_abs_diff_eq;
    use ndarray::{array, s};

    #[test]
    fn base_score_is_target_mean() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![1.0, 2.0, 3.0, 6.0];
        let mut model = XGBRegressor { n_estimators: 0, ..Default::default() };
        model.fit(x.view(), y.view(), Parallelism::Sequential).unwrap();
        let inner = model.model().unwrap();
        assert_abs_diff_eq!(inner.base_score(), 3.0, epsilon = DEFAULT_TOLERANCE);
        assert_eq!(inner.n_trees(), 0);
        assert_eq!(model.predict(x.view()).unwrap(), array![3.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn training_loss_decreases_with_rounds() {
        let (train, _) = synthetic_linear_split(80, 10, 3, 0.1, 21);
        let x = train.slice(s![.., ..3]);
        let y = train.column(3);

        let mut losses = Vec::new();
        for rounds in [1, 10, 50] {
            let mut model = GradientBoostingRegressor { n_estimators: rounds, ..Default::default() };
            model.fit(x, y, Parallelism::Sequential).unwrap();
            let pred = model.predict(x).unwrap();
            losses.push(mean_squared_error(y, pred.view()));
        }
        assert!(losses[0] > losses[1]);
        assert!(losses[1] > losses[2]);
    }

    #[test]
    fn xgboost_leaves_are_regularized() {
        // One split, two leaves with residuals ±1 and two samples each:
        // leaf = η · S / (W + λ) = 0.3 · (±2) / 3
        let x = array![[0.0], [0.0], [1.0], [1.0]];
        let y = array![-1.0, -1.0, 1.0, 1.0];
        let mut model = XGBRegressor { n_estimators: 1, ..Default::default() };
        model.fit(x.view(), y.view(), Parallelism::Sequential).unwrap();
        let pred = model.predict(x.view()).unwrap();
        assert_abs_diff_eq!(pred[0], -0.2, epsilon = DEFAULT_TOLERANCE);
        assert_abs_diff_eq!(pred[3], 0.2, epsilon = DEFAULT_TOLERANCE);
    }

    #[test]
    fn gradient_boosting_first_round_is_shrunken_mean() {
        let x = array![[0.0], [0.0], [1.0], [1.0]];
        let y = array![-1.0, -1.0, 1.0, 1.0];
        let mut model = GradientBoostingRegressor { n_estimators: 1, ..Default::default() };
        model.fit(x.view(), y.view(), Parallelism::Sequential).unwrap();
        let pred = model.predict(x.view()).unwrap();
        assert_abs_diff_eq!(pred[0], -0.1, epsilon = DEFAULT_TOLERANCE);
        assert_abs_diff_eq!(pred[3], 0.1, epsilon = DEFAULT_TOLERANCE);
    }

    #[test]
    fn defaults_fit_linear_signal() {
        let (train, test) = synthetic_linear_split(200, 50, 3, 0.05, 8);
        let x = train.slice(s![.., ..3]);
        let y = train.column(3);
        let x_test = test.slice(s![.., ..3]);

        let mut xgb = XGBRegressor::default();
        xgb.fit(x, y, Parallelism::Sequential).unwrap();
        assert!(r2_score(test.column(3), xgb.predict(x_test).unwrap().view()) > 0.6);

        let mut gbr = GradientBoostingRegressor::default();
        gbr.fit(x, y, Parallelism::Sequential).unwrap();
        assert!(r2_score(test.column(3), gbr.predict(x_test).unwrap().view()) > 0.6);
    }

    #[test]
    fn predict_rejects_wrong_width() {
        let x = array![[0.0, 1.0], [1.0, 0.0]];
        let y = array![0.0, 1.0];
        let mut model = GradientBoostingRegressor { n_estimators: 2, ..Default::default() };
        model.fit(x.view(), y.view(), Parallelism::Sequential).unwrap();
        assert_eq!(
            model.predict(array![[1.0]].view()),
            Err(FitError::FeatureMismatch { expected: 2, got: 1 })
        );
    }
}
