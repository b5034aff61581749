//! Model selection: evaluate the default candidates, gate on quality,
//! persist the winner.
//!
//! # Example
//!
//! ```ignore
//! use regselect::{ModelSelector, SelectorConfig};
//!
//! let config = SelectorConfig::builder()
//!     .artifact_path("out/model.json")
//!     .min_score(0.7)
//!     .build()?;
//! let outcome = ModelSelector::new(config).run(train.view(), test.view())?;
//! println!("{} scored {:.3}", outcome.model_name, outcome.score);
//! ```

use std::path::PathBuf;

use bon::Builder;
use ndarray::ArrayView2;

use crate::candidates::CandidateSet;
use crate::data::SplitData;
use crate::error::{ErrorKind, SelectionError};
use crate::estimators::Regressor;
use crate::evaluate::{EvaluationError, Evaluator, HoldoutEvaluator, ScoreReport};
use crate::metrics::r2_score;
use crate::persist::{Artifact, ArtifactFormat, FileStore, ModelStore};

/// Default location of the persisted winner.
pub const DEFAULT_ARTIFACT_PATH: &str = "artifacts/model.json";

/// Default quality gate.
pub const DEFAULT_MIN_SCORE: f64 = 0.6;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The quality gate must be a finite number.
    InvalidMinScore(f64),
    /// The artifact path must not be empty.
    EmptyArtifactPath,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMinScore(v) => write!(f, "min_score must be finite, got {}", v),
            Self::EmptyArtifactPath => write!(f, "artifact_path must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// SelectorConfig
// =============================================================================

/// Which score [`ModelSelector::run`] returns for the winner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FinalScore {
    /// The score from the evaluator's report.
    #[default]
    Reported,
    /// Re-predict the test rows with the winner and score again. A mismatch
    /// with the reported score is logged as a warning.
    Recomputed,
}

/// Selection run configuration.
///
/// # Example
///
/// ```
/// use regselect::SelectorConfig;
///
/// let config = SelectorConfig::builder().build().unwrap();
/// assert_eq!(config.min_score, 0.6);
/// assert_eq!(config.seed, 42);
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct SelectorConfig {
    // === Output ===
    /// Where the winner is written. Default: `artifacts/model.json`.
    #[builder(into, default = PathBuf::from(DEFAULT_ARTIFACT_PATH))]
    pub artifact_path: PathBuf,

    /// Artifact encoding. Default: JSON.
    #[builder(default)]
    pub format: ArtifactFormat,

    // === Selection ===
    /// Minimum acceptable held-out R². Default: 0.6.
    #[builder(default = DEFAULT_MIN_SCORE)]
    pub min_score: f64,

    /// Source of the returned score. Default: [`FinalScore::Reported`].
    #[builder(default)]
    pub final_score: FinalScore,

    // === Resource control ===
    /// Number of threads. `0` uses all available cores.
    #[builder(default = 0)]
    pub n_threads: usize,

    // === Reproducibility ===
    /// Seed for the stochastic estimators. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,
}

impl<S: selector_config_builder::IsComplete> SelectorConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `min_score` is not finite or
    /// `artifact_path` is empty.
    pub fn build(self) -> Result<SelectorConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl SelectorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_score.is_finite() {
            return Err(ConfigError::InvalidMinScore(self.min_score));
        }
        if self.artifact_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyArtifactPath);
        }
        Ok(())
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        // Every default passes `validate`.
        Self::builder().__build_internal()
    }
}

// =============================================================================
// Observer
// =============================================================================

/// Emitted once the input arrays are split into features and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataSplitEvent {
    pub train_rows: usize,
    pub test_rows: usize,
    pub n_features: usize,
}

/// Emitted once a winner has passed the quality gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestModelEvent<'a> {
    pub model_name: &'a str,
    pub score: f64,
}

/// Receives the informational events of a selection run.
pub trait SelectionObserver {
    fn data_split(&self, _event: &DataSplitEvent) {}

    fn best_model_found(&self, _event: &BestModelEvent<'_>) {}
}

/// Forwards events to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SelectionObserver for TracingObserver {
    fn data_split(&self, event: &DataSplitEvent) {
        tracing::info!(
            train_rows = event.train_rows,
            test_rows = event.test_rows,
            n_features = event.n_features,
            "split training and test input data"
        );
    }

    fn best_model_found(&self, event: &BestModelEvent<'_>) {
        tracing::info!(
            model = event.model_name,
            score = event.score,
            "best model found on training and test data"
        );
    }
}

// =============================================================================
// ModelSelector
// =============================================================================

/// Result of a successful selection run.
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    /// Name of the winning candidate.
    pub model_name: String,
    /// The returned held-out score (see [`FinalScore`]).
    pub score: f64,
    /// Every candidate's reported score.
    pub report: ScoreReport,
    /// Where the winner was written.
    pub artifact_path: PathBuf,
}

/// Fits the default candidates, keeps the best one, and persists it.
///
/// The evaluator, store, and observer are pluggable; [`ModelSelector::new`]
/// wires the defaults from the config.
#[derive(Debug, Clone)]
pub struct ModelSelector<E = HoldoutEvaluator, S = FileStore, O = TracingObserver> {
    config: SelectorConfig,
    evaluator: E,
    store: S,
    observer: O,
}

impl ModelSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self {
            evaluator: HoldoutEvaluator::new(config.n_threads),
            store: FileStore::new(config.format),
            observer: TracingObserver,
            config,
        }
    }
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::new(SelectorConfig::default())
    }
}

impl<E, S, O> ModelSelector<E, S, O> {
    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn with_evaluator<E2: Evaluator>(self, evaluator: E2) -> ModelSelector<E2, S, O> {
        ModelSelector {
            config: self.config,
            evaluator,
            store: self.store,
            observer: self.observer,
        }
    }

    pub fn with_store<S2: ModelStore>(self, store: S2) -> ModelSelector<E, S2, O> {
        ModelSelector {
            config: self.config,
            evaluator: self.evaluator,
            store,
            observer: self.observer,
        }
    }

    pub fn with_observer<O2: SelectionObserver>(self, observer: O2) -> ModelSelector<E, S, O2> {
        ModelSelector {
            config: self.config,
            evaluator: self.evaluator,
            store: self.store,
            observer,
        }
    }
}

impl<E: Evaluator, S: ModelStore, O: SelectionObserver> ModelSelector<E, S, O> {
    /// Run one selection over pre-split arrays.
    ///
    /// Each array holds the features followed by the target in its last
    /// column. On success exactly one artifact is written; on any error
    /// nothing is.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::EvaluationFailed`]: malformed arrays, a candidate that
    ///   fails to fit or predict, or a report that does not match the
    ///   candidates
    /// - [`ErrorKind::QualityGateFailed`]: the best score is below
    ///   `min_score`, or no score is a number
    /// - [`ErrorKind::PersistenceFailed`]: the artifact could not be written
    pub fn run<'a>(
        &self,
        train: ArrayView2<'a, f64>,
        test: ArrayView2<'a, f64>,
    ) -> Result<SelectionOutcome, SelectionError> {
        let data = SplitData::from_arrays(train, test)?;
        self.observer.data_split(&DataSplitEvent {
            train_rows: data.n_train(),
            test_rows: data.n_test(),
            n_features: data.n_features(),
        });

        let mut candidates = CandidateSet::defaults(self.config.seed);
        let report = self.evaluator.evaluate(&data, &mut candidates)?;
        report.check_matches(&candidates)?;

        let (name, reported) = report.best(&candidates).ok_or_else(|| {
            SelectionError::new(ErrorKind::QualityGateFailed, "no candidate produced a valid score")
        })?;
        if reported < self.config.min_score {
            return Err(SelectionError::new(
                ErrorKind::QualityGateFailed,
                format!(
                    "best model {name:?} scored {reported:.4}, below the minimum {}",
                    self.config.min_score
                ),
            ));
        }
        let name = name.to_string();
        self.observer.best_model_found(&BestModelEvent {
            model_name: &name,
            score: reported,
        });

        let estimator = candidates.take(&name).ok_or_else(|| {
            SelectionError::new(ErrorKind::EvaluationFailed, format!("winner {name:?} vanished"))
        })?;

        let score = match self.config.final_score {
            FinalScore::Reported => reported,
            FinalScore::Recomputed => {
                let predictions = estimator.predict(data.x_test).map_err(|source| {
                    EvaluationError::Candidate {
                        name: name.clone(),
                        source,
                    }
                })?;
                let recomputed = r2_score(data.y_test, predictions.view());
                if (recomputed - reported).abs() > f64::EPSILON * reported.abs().max(1.0) {
                    tracing::warn!(
                        model = %name,
                        reported,
                        recomputed,
                        "recomputed score differs from reported score"
                    );
                }
                recomputed
            }
        };

        let artifact = Artifact::new(name.clone(), score, estimator);
        self.store.save(&self.config.artifact_path, &artifact)?;

        Ok(SelectionOutcome {
            model_name: name,
            score,
            report,
            artifact_path: self.config.artifact_path.clone(),
        })
    }

    /// [`run`](Self::run), returning only the winner's score.
    pub fn select_and_persist<'a>(
        &self,
        train: ArrayView2<'a, f64>,
        test: ArrayView2<'a, f64>,
    ) -> Result<f64, SelectionError> {
        self.run(train, test).map(|outcome| outcome.score)
    }
}

/// Select and persist with the default configuration.
///
/// Writes the winner to `artifacts/model.json` relative to the working
/// directory and returns its held-out R².
pub fn select_and_persist<'a>(
    train: ArrayView2<'a, f64>,
    test: ArrayView2<'a, f64>,
) -> Result<f64, SelectionError> {
    ModelSelector::default().select_and_persist(train, test)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SelectorConfig::builder().build().unwrap();
        assert_eq!(config.artifact_path, PathBuf::from("artifacts/model.json"));
        assert_eq!(config.min_score, 0.6);
        assert_eq!(config.format, ArtifactFormat::Json);
        assert_eq!(config.final_score, FinalScore::Reported);
        assert_eq!(config.n_threads, 0);
        assert_eq!(config.seed, 42);

        let default = SelectorConfig::default();
        assert_eq!(default.artifact_path, config.artifact_path);
        assert_eq!(default.min_score, config.min_score);
    }

    #[test]
    fn test_invalid_min_score() {
        let result = SelectorConfig::builder().min_score(f64::NAN).build();
        assert!(matches!(result, Err(ConfigError::InvalidMinScore(_))));

        let result = SelectorConfig::builder().min_score(f64::INFINITY).build();
        assert!(matches!(result, Err(ConfigError::InvalidMinScore(_))));
    }

    #[test]
    fn test_negative_min_score_is_valid() {
        assert!(SelectorConfig::builder().min_score(-1.0).build().is_ok());
    }

    #[test]
    fn test_empty_artifact_path() {
        let result = SelectorConfig::builder().artifact_path("").build();
        assert_eq!(result.unwrap_err(), ConfigError::EmptyArtifactPath);
    }

    #[test]
    fn test_selector_wires_config() {
        let config = SelectorConfig::builder()
            .n_threads(1)
            .format(ArtifactFormat::Binary)
            .build()
            .unwrap();
        let selector = ModelSelector::new(config);
        assert_eq!(selector.evaluator.n_threads, 1);
        assert_eq!(selector.store.format, ArtifactFormat::Binary);
    }
}
