//! regselect: pick the best default regression model on a held-out split.
//!
//! Given training and test arrays (features followed by the target column),
//! the selector fits seven default-configured regressors, scores each on the
//! test rows with R², keeps the best one, rejects it if it scores below a
//! quality gate, and writes it to disk.
//!
//! # Key Types
//!
//! - [`ModelSelector`] / [`SelectorConfig`] - Orchestration and its configuration
//! - [`Evaluator`] / [`HoldoutEvaluator`] - Fitting and scoring candidates
//! - [`ModelStore`] / [`FileStore`] - Persisting the winner
//! - [`Estimator`] / [`Regressor`] - The candidate models
//! - [`SelectionError`] - The failure of a run, with an [`ErrorKind`]
//!
//! # Quick start
//!
//! ```ignore
//! let score = regselect::select_and_persist(train.view(), test.view())?;
//! ```
//!
//! The winner is written to `artifacts/model.json`. Use
//! [`SelectorConfig::builder`] to change the path, the gate, the artifact
//! format, or the thread count.

pub mod candidates;
pub mod data;
pub mod error;
pub mod estimators;
pub mod evaluate;
pub mod metrics;
pub mod persist;
pub mod selector;
pub mod testing;
pub mod utils;

// =============================================================================
// Convenience re-exports
// =============================================================================

pub use candidates::{Candidate, CandidateSet, DEFAULT_CANDIDATE_NAMES};
pub use data::{DataError, SplitData};
pub use error::{ErrorKind, SelectionError};
pub use estimators::{Estimator, FitError, Regressor};
pub use evaluate::{EvaluationError, Evaluator, HoldoutEvaluator, ScoreReport};
pub use metrics::r2_score;
pub use persist::{Artifact, ArtifactFormat, FileStore, ModelStore, PersistError};
pub use selector::{
    select_and_persist, BestModelEvent, ConfigError, DataSplitEvent, FinalScore, ModelSelector,
    SelectionObserver, SelectionOutcome, SelectorConfig, TracingObserver,
};
pub use utils::{run_with_threads, Parallelism};
