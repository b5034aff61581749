//! Fitting and scoring candidates on a held-out split.
//!
//! The selector talks to an [`Evaluator`] and only ever sees the resulting
//! [`ScoreReport`]. [`HoldoutEvaluator`] is the default: fit on the training
//! rows, predict the test rows, score with R².

use crate::candidates::CandidateSet;
use crate::data::SplitData;
use crate::estimators::{FitError, Regressor};
use crate::metrics::r2_score;
use crate::utils::{run_with_threads, Parallelism};

// =============================================================================
// Errors
// =============================================================================

/// Errors raised while evaluating candidates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// A candidate failed to fit or predict.
    #[error("candidate {name:?} failed: {source}")]
    Candidate {
        name: String,
        #[source]
        source: FitError,
    },

    /// The report does not cover exactly the candidate names.
    #[error("score report does not match candidates (missing: {missing:?}, unexpected: {unexpected:?})")]
    ReportMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// There were no candidates to evaluate.
    #[error("no candidates to evaluate")]
    NoCandidates,
}

// =============================================================================
// ScoreReport
// =============================================================================

/// Held-out score per candidate name, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreReport {
    scores: Vec<(String, f64)>,
}

impl ScoreReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, score: f64) {
        self.scores.push((name.into(), score));
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.scores.iter().find(|(n, _)| n == name).map(|&(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scores.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores.iter().map(|(n, s)| (n.as_str(), *s))
    }

    /// Check that the report scores every candidate exactly once.
    pub fn check_matches(&self, candidates: &CandidateSet) -> Result<(), EvaluationError> {
        let missing: Vec<String> = candidates
            .names()
            .filter(|n| self.get(n).is_none())
            .map(str::to_string)
            .collect();
        let mut unexpected: Vec<String> = Vec::new();
        for (i, name) in self.names().enumerate() {
            let duplicate = self.names().take(i).any(|n| n == name);
            if duplicate || !candidates.contains(name) {
                unexpected.push(name.to_string());
            }
        }
        if missing.is_empty() && unexpected.is_empty() {
            Ok(())
        } else {
            Err(EvaluationError::ReportMismatch { missing, unexpected })
        }
    }

    /// The highest-scoring candidate.
    ///
    /// Candidates are visited in `candidates` insertion order and only a
    /// strictly greater score replaces the current best, so the earliest
    /// candidate wins a tie. NaN scores never win.
    pub fn best<'a>(&self, candidates: &'a CandidateSet) -> Option<(&'a str, f64)> {
        let mut best: Option<(&'a str, f64)> = None;
        for name in candidates.names() {
            let Some(score) = self.get(name) else { continue };
            if score.is_nan() {
                continue;
            }
            match best {
                Some((_, current)) if score <= current => {}
                _ => best = Some((name, score)),
            }
        }
        best
    }
}

impl FromIterator<(String, f64)> for ScoreReport {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Evaluator
// =============================================================================

/// Fits every candidate and scores it on the held-out rows.
///
/// Implementations must return one score per candidate, keyed by name.
/// Candidates are left fitted so the winner can be persisted directly.
pub trait Evaluator {
    fn evaluate(
        &self,
        data: &SplitData<'_>,
        candidates: &mut CandidateSet,
    ) -> Result<ScoreReport, EvaluationError>;
}

/// Train-on-train, score-on-test evaluator using R².
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldoutEvaluator {
    /// `0` = all cores, `1` = sequential, `n` = exactly `n` threads.
    pub n_threads: usize,
}

impl HoldoutEvaluator {
    pub fn new(n_threads: usize) -> Self {
        Self { n_threads }
    }
}

impl Evaluator for HoldoutEvaluator {
    fn evaluate(
        &self,
        data: &SplitData<'_>,
        candidates: &mut CandidateSet,
    ) -> Result<ScoreReport, EvaluationError> {
        if candidates.is_empty() {
            return Err(EvaluationError::NoCandidates);
        }

        let results = run_with_threads(self.n_threads, |parallelism| {
            parallelism.maybe_par_map(candidates.as_mut_slice(), |candidate| {
                let score = fit_and_score(&mut candidate.estimator, data, parallelism)
                    .map_err(|source| EvaluationError::Candidate {
                        name: candidate.name.clone(),
                        source,
                    })?;
                tracing::debug!(model = %candidate.name, score, "candidate scored");
                Ok((candidate.name.clone(), score))
            })
        });

        results.into_iter().collect()
    }
}

fn fit_and_score<R: Regressor + ?Sized>(
    model: &mut R,
    data: &SplitData<'_>,
    parallelism: Parallelism,
) -> Result<f64, FitError> {
    model.fit(data.x_train, data.y_train, parallelism)?;
    let predictions = model.predict(data.x_test)?;
    Ok(r2_score(data.y_test, predictions.view()))
}
