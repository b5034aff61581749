//! Regression tree representation and exact greedy growth.
//!
//! This module provides:
//! - [`RegressionTree`]: SoA tree storage, node `0` is the root
//! - [`TreeParams`]: growth limits shared by CART and second-order boosting
//! - [`DecisionTreeRegressor`]: a single CART tree estimator
//!
//! Growth works on per-sample `(target, weight)` pairs. For plain CART the
//! target is the label and the weight the sample weight; for second-order
//! boosting the target is the Newton step `-g/h` and the weight the hessian.
//! Both reduce to the same split score `S_L²/(W_L+λ) + S_R²/(W_R+λ)` with
//! `S = Σ w·t`, `W = Σ w`, and leaf value `S / (W + λ)`.

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{check_fit_input, check_predict_input, FitError, Regressor};
use crate::utils::Parallelism;

// =============================================================================
// TreeParams
// =============================================================================

/// Tree growth parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth. `None` grows until leaves are pure or too small.
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node.
    pub min_samples_split: usize,
    /// Minimum samples in each child.
    pub min_samples_leaf: usize,
    /// Minimum weight sum (hessian sum for boosting) in each child.
    pub min_child_weight: f64,
    /// L2 regularization on leaf values.
    pub lambda: f64,
    /// Minimum score improvement for a split. `None` accepts any valid split.
    pub min_split_gain: Option<f64>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self::cart()
    }
}

impl TreeParams {
    /// Unlimited-depth CART with squared error.
    pub fn cart() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_child_weight: 0.0,
            lambda: 0.0,
            min_split_gain: None,
        }
    }

    /// CART limited to `max_depth`.
    pub fn cart_with_depth(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
            ..Self::cart()
        }
    }

    /// XGBoost tree defaults: depth 6, λ = 1, min child weight 1, γ = 0.
    pub fn xgboost() -> Self {
        Self {
            max_depth: Some(6),
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_child_weight: 1.0,
            lambda: 1.0,
            min_split_gain: Some(0.0),
        }
    }
}

// =============================================================================
// RegressionTree
// =============================================================================

/// Binary regression tree in structure-of-arrays layout.
///
/// A node is a leaf when `left_children[node] == 0` (the root is never a child).
/// Samples go left when `x[split_feature] <= threshold`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    split_features: Vec<u32>,
    thresholds: Vec<f64>,
    left_children: Vec<u32>,
    right_children: Vec<u32>,
    values: Vec<f64>,
}

impl RegressionTree {
    fn push_leaf(&mut self, value: f64) -> u32 {
        let id = self.values.len() as u32;
        self.split_features.push(0);
        self.thresholds.push(0.0);
        self.left_children.push(0);
        self.right_children.push(0);
        self.values.push(value);
        id
    }

    fn set_split(&mut self, node: u32, feature: usize, threshold: f64, left: u32, right: u32) {
        let n = node as usize;
        self.split_features[n] = feature as u32;
        self.thresholds[n] = threshold;
        self.left_children[n] = left;
        self.right_children[n] = right;
    }

    pub fn n_nodes(&self) -> usize {
        self.values.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.left_children.iter().filter(|&&l| l == 0).count()
    }

    #[inline]
    pub fn is_leaf(&self, node: u32) -> bool {
        self.left_children[node as usize] == 0
    }

    /// Depth of the deepest leaf (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        if self.values.is_empty() {
            return 0;
        }
        let mut max_depth = 0;
        let mut stack = vec![(0u32, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            if self.is_leaf(node) {
                max_depth = max_depth.max(depth);
            } else {
                stack.push((self.left_children[node as usize], depth + 1));
                stack.push((self.right_children[node as usize], depth + 1));
            }
        }
        max_depth
    }

    /// Predict one sample.
    #[inline]
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = 0u32;
        while !self.is_leaf(node) {
            let n = node as usize;
            node = if row[self.split_features[n] as usize] <= self.thresholds[n] {
                self.left_children[n]
            } else {
                self.right_children[n]
            };
        }
        self.values[node as usize]
    }

    /// Predict every row of a sample-major matrix.
    pub fn predict_rows(&self, features: ArrayView2<f64>) -> Array1<f64> {
        features.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }

    /// Check the structural invariants a loaded tree must satisfy before it
    /// is walked: equal array lengths, child ids after their parent and in
    /// range, split features below `n_features`.
    pub(crate) fn validate(&self, n_features: usize) -> Result<(), String> {
        let n = self.values.len();
        if n == 0 {
            return Err("tree has no nodes".into());
        }
        if self.split_features.len() != n
            || self.thresholds.len() != n
            || self.left_children.len() != n
            || self.right_children.len() != n
        {
            return Err(format!("tree node arrays disagree on length (expected {n})"));
        }
        for node in 0..n {
            let (left, right) = (self.left_children[node], self.right_children[node]);
            if left == 0 && right == 0 {
                continue;
            }
            for child in [left, right] {
                if child as usize <= node || child as usize >= n {
                    return Err(format!("node {node} has invalid child {child}"));
                }
            }
            if self.split_features[node] as usize >= n_features {
                return Err(format!(
                    "node {node} splits on feature {} of {n_features}",
                    self.split_features[node]
                ));
            }
        }
        Ok(())
    }

    /// Multiply every leaf value by `factor` (shrinkage).
    pub fn scale_leaves(&mut self, factor: f64) {
        for (value, &left) in self.values.iter_mut().zip(self.left_children.iter()) {
            if left == 0 {
                *value *= factor;
            }
        }
    }
}

// =============================================================================
// Growth
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct NodeStats {
    sum: f64,
    weight: f64,
}

impl NodeStats {
    fn of(rows: &[usize], targets: &[f64], weights: &[f64]) -> Self {
        rows.iter().fold(
            Self { sum: 0.0, weight: 0.0 },
            |acc, &r| {
                let w = weights[r];
                let t = targets[r];
                Self {
                    sum: acc.sum + w * t,
                    weight: acc.weight + w,
                }
            },
        )
    }

    fn leaf_value(&self, lambda: f64) -> f64 {
        let denom = self.weight + lambda;
        if denom > 0.0 {
            self.sum / denom
        } else {
            0.0
        }
    }

}

/// True when every listed row carries the same target.
fn is_pure(rows: &[usize], targets: &[f64]) -> bool {
    match rows.split_first() {
        Some((&first, rest)) => rest.iter().all(|&r| targets[r] == targets[first]),
        None => true,
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    score: f64,
}

#[inline]
fn split_score(sum: f64, weight: f64, lambda: f64) -> f64 {
    let denom = weight + lambda;
    if denom > 0.0 {
        sum * sum / denom
    } else {
        0.0
    }
}

/// Grow a tree on the samples listed in `rows`.
///
/// `targets` and `weights` are indexed by row of `features`; rows not listed
/// in `rows` are ignored. Ties between equally good splits go to the lowest
/// feature index and then the lowest threshold.
pub(crate) fn grow(
    features: ArrayView2<f64>,
    targets: &[f64],
    weights: &[f64],
    mut rows: Vec<usize>,
    params: &TreeParams,
) -> RegressionTree {
    let mut tree = RegressionTree::default();
    let mut order = Vec::with_capacity(rows.len());

    let root_stats = NodeStats::of(&rows, targets, weights);
    tree.push_leaf(root_stats.leaf_value(params.lambda));

    // (node, start, end, depth)
    let mut stack = vec![(0u32, 0usize, rows.len(), 0usize)];
    while let Some((node, start, end, depth)) = stack.pop() {
        let node_rows = &mut rows[start..end];
        let n = node_rows.len();
        let stats = NodeStats::of(node_rows, targets, weights);

        let depth_exhausted = params.max_depth.is_some_and(|d| depth >= d);
        if depth_exhausted
            || n < params.min_samples_split
            || n < 2 * params.min_samples_leaf
            || stats.weight <= 0.0
            || is_pure(node_rows, targets)
        {
            continue;
        }

        let Some(split) = best_split(features, targets, weights, node_rows, &stats, params, &mut order)
        else {
            continue;
        };

        let mid = partition(node_rows, |r| features[[r, split.feature]] <= split.threshold);
        let left_stats = NodeStats::of(&node_rows[..mid], targets, weights);
        let right_stats = NodeStats::of(&node_rows[mid..], targets, weights);
        let left = tree.push_leaf(left_stats.leaf_value(params.lambda));
        let right = tree.push_leaf(right_stats.leaf_value(params.lambda));
        tree.set_split(node, split.feature, split.threshold, left, right);

        stack.push((right, start + mid, end, depth + 1));
        stack.push((left, start, start + mid, depth + 1));
    }

    tree
}

fn best_split(
    features: ArrayView2<f64>,
    targets: &[f64],
    weights: &[f64],
    rows: &[usize],
    stats: &NodeStats,
    params: &TreeParams,
    order: &mut Vec<usize>,
) -> Option<SplitCandidate> {
    let n = rows.len();
    let parent_score = split_score(stats.sum, stats.weight, params.lambda);
    let mut best: Option<SplitCandidate> = None;

    for feature in 0..features.ncols() {
        order.clear();
        order.extend_from_slice(rows);
        order.sort_by(|&a, &b| features[[a, feature]].total_cmp(&features[[b, feature]]));

        let mut left_sum = 0.0f64;
        let mut left_weight = 0.0f64;
        for i in 0..n.saturating_sub(1) {
            let r = order[i];
            left_sum += weights[r] * targets[r];
            left_weight += weights[r];

            let x_cur = features[[r, feature]];
            let x_next = features[[order[i + 1], feature]];
            if x_next <= x_cur {
                continue;
            }

            let n_left = i + 1;
            if n_left < params.min_samples_leaf || n - n_left < params.min_samples_leaf {
                continue;
            }
            let right_weight = stats.weight - left_weight;
            if left_weight < params.min_child_weight || right_weight < params.min_child_weight {
                continue;
            }

            let score = split_score(left_sum, left_weight, params.lambda)
                + split_score(stats.sum - left_sum, right_weight, params.lambda);
            if best.is_some_and(|b| score <= b.score) {
                continue;
            }
            if let Some(min_gain) = params.min_split_gain {
                if score - parent_score <= min_gain {
                    continue;
                }
            }

            let mut threshold = x_cur / 2.0 + x_next / 2.0;
            if threshold >= x_next || !threshold.is_finite() {
                threshold = x_cur;
            }
            best = Some(SplitCandidate { feature, threshold, score });
        }
    }

    best
}

/// Reorder `rows` so that rows satisfying `goes_left` come first; returns their count.
fn partition(rows: &mut [usize], goes_left: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for i in 0..rows.len() {
        if goes_left(rows[i]) {
            rows.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

// =============================================================================
// DecisionTreeRegressor
// =============================================================================

/// Single CART regression tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    pub params: TreeParams,
    tree: Option<RegressionTree>,
    n_features: Option<usize>,
}

impl DecisionTreeRegressor {
    pub fn new(params: TreeParams) -> Self {
        Self {
            params,
            tree: None,
            n_features: None,
        }
    }

    pub fn tree(&self) -> Option<&RegressionTree> {
        self.tree.as_ref()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let n_features = super::fitted_width(self.n_features)?;
        self.tree
            .as_ref()
            .ok_or_else(|| "decision tree has no tree".to_string())?
            .validate(n_features)
    }

    /// Fit with per-sample weights. Samples with zero weight are ignored.
    pub fn fit_weighted(
        &mut self,
        features: ArrayView2<f64>,
        targets: ArrayView1<f64>,
        weights: &[f64],
    ) -> Result<(), FitError> {
        check_fit_input(features, targets)?;
        if weights.len() != features.nrows() {
            return Err(FitError::DegenerateWeights(format!(
                "{} weights for {} rows",
                weights.len(),
                features.nrows()
            )));
        }
        let rows: Vec<usize> = (0..features.nrows()).filter(|&r| weights[r] > 0.0).collect();
        if rows.is_empty() {
            return Err(FitError::DegenerateWeights("all sample weights are zero".into()));
        }

        let targets = targets.to_vec();
        self.tree = Some(grow(features, &targets, weights, rows, &self.params));
        self.n_features = Some(features.ncols());
        Ok(())
    }
}

impl Regressor for DecisionTreeRegressor {
    fn fit(
        &mut self,
        features: ArrayView2<f64>,
        targets: ArrayView1<f64>,
        _parallelism: Parallelism,
    ) -> Result<(), FitError> {
        let weights = vec![1.0; features.nrows()];
        self.fit_weighted(features, targets, &weights)
    }

    fn predict(&self, features: ArrayView2<f64>) -> Result<Array1<f64>, FitError> {
        check_predict_input(features, self.n_features)?;
        let tree = self.tree.as_ref().ok_or(FitError::NotFitted)?;
        Ok(tree.predict_rows(features))
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }
}

// =============================================================================
// Tests
// =============================================================================
