//! The ordered set of named estimators a selection run compares.

use crate::estimators::{
    AdaBoostRegressor, DecisionTreeRegressor, Estimator, GradientBoostingRegressor,
    KNeighborsRegressor, LinearRegression, RandomForestRegressor, XGBRegressor,
};

/// Display names of the default candidates, in tie-break order.
pub const DEFAULT_CANDIDATE_NAMES: [&str; 7] = [
    "Linear Regression",
    "K-Neighbors Regressor",
    "Decision Tree",
    "Random Forest Regressor",
    "XGBRegressor",
    "AdaBoost Regressor",
    "Gradient Boosting Regressor",
];

/// One named, default-configured estimator.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub estimator: Estimator,
}

/// A candidate name was registered twice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate candidate name: {0:?}")]
pub struct DuplicateCandidate(pub String);

/// Uniquely named candidates in insertion order.
///
/// Order matters only for tie-breaking: when scores are equal, the candidate
/// inserted first wins.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The seven default estimators. Stochastic ones are seeded with `seed`.
    pub fn defaults(seed: u64) -> Self {
        let estimators: [Estimator; 7] = [
            LinearRegression::default().into(),
            KNeighborsRegressor::default().into(),
            DecisionTreeRegressor::default().into(),
            RandomForestRegressor::new(seed).into(),
            XGBRegressor::default().into(),
            AdaBoostRegressor::new(seed).into(),
            GradientBoostingRegressor::default().into(),
        ];
        Self {
            candidates: DEFAULT_CANDIDATE_NAMES
                .iter()
                .zip(estimators)
                .map(|(name, estimator)| Candidate {
                    name: (*name).to_string(),
                    estimator,
                })
                .collect(),
        }
    }

    /// Append a candidate. Names must be unique.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        estimator: impl Into<Estimator>,
    ) -> Result<(), DuplicateCandidate> {
        let name = name.into();
        if self.contains(&name) {
            return Err(DuplicateCandidate(name));
        }
        self.candidates.push(Candidate {
            name,
            estimator: estimator.into(),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.candidates.iter().any(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Estimator> {
        self.candidates
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.estimator)
    }

    /// Names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Candidate> {
        self.candidates.iter_mut()
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Candidate] {
        &mut self.candidates
    }

    /// Remove and return the named estimator, dropping it from the set.
    pub fn take(&mut self, name: &str) -> Option<Estimator> {
        let idx = self.candidates.iter().position(|c| c.name == name)?;
        Some(self.candidates.remove(idx).estimator)
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_ordered_and_named() {
        let set = CandidateSet::defaults(42);
        assert_eq!(set.len(), 7);
        assert_eq!(set.names().collect::<Vec<_>>(), DEFAULT_CANDIDATE_NAMES);

        let kinds: Vec<_> = set.iter().map(|c| c.estimator.kind()).collect();
        assert_eq!(
            kinds,
            [
                "linear_regression",
                "k_neighbors",
                "decision_tree",
                "random_forest",
                "xgboost",
                "adaboost",
                "gradient_boosting",
            ]
        );
    }

    #[test]
    fn seed_reaches_stochastic_estimators() {
        let set = CandidateSet::defaults(7);
        match set.get("Random Forest Regressor") {
            Some(Estimator::RandomForest(rf)) => assert_eq!(rf.seed, 7),
            other => panic!("unexpected candidate: {other:?}"),
        }
        match set.get("AdaBoost Regressor") {
            Some(Estimator::AdaBoost(ada)) => assert_eq!(ada.seed, 7),
            other => panic!("unexpected candidate: {other:?}"),
        }
    }

    #[test]
    fn push_rejects_duplicates() {
        let mut set = CandidateSet::new();
        set.push("a", LinearRegression::default()).unwrap();
        assert_eq!(
            set.push("a", KNeighborsRegressor::default()),
            Err(DuplicateCandidate("a".into()))
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn take_removes_the_candidate() {
        let mut set = CandidateSet::defaults(0);
        let tree = set.take("Decision Tree").unwrap();
        assert_eq!(tree.kind(), "decision_tree");
        assert!(!set.contains("Decision Tree"));
        assert_eq!(set.len(), 6);
        assert!(set.take("Decision Tree").is_none());
    }
}
