//! The error returned by a selection run.

use std::error::Error as StdError;
use std::fmt;

use crate::data::DataError;
use crate::evaluate::EvaluationError;
use crate::persist::PersistError;

/// Which stage of a selection run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No candidate reached the minimum score. Nothing was persisted.
    QualityGateFailed,
    /// Input slicing, fitting, prediction, or scoring failed.
    EvaluationFailed,
    /// Writing the winning model failed.
    PersistenceFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::QualityGateFailed => "quality gate failed",
            Self::EvaluationFailed => "evaluation failed",
            Self::PersistenceFailed => "persistence failed",
        })
    }
}

/// Failure of [`ModelSelector::run`](crate::ModelSelector::run).
///
/// Carries the failing stage, a human-readable message, and the underlying
/// cause (if any) as its [`source`](StdError::source).
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct SelectionError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl SelectionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_quality_gate(&self) -> bool {
        self.kind == ErrorKind::QualityGateFailed
    }
}

impl From<DataError> for SelectionError {
    fn from(err: DataError) -> Self {
        Self::with_source(ErrorKind::EvaluationFailed, "invalid input arrays", err)
    }
}

impl From<EvaluationError> for SelectionError {
    fn from(err: EvaluationError) -> Self {
        let message = match &err {
            EvaluationError::Candidate { name, .. } => format!("candidate {name:?} failed"),
            EvaluationError::ReportMismatch { .. } => "score report does not match candidates".into(),
            EvaluationError::NoCandidates => "no candidates".into(),
        };
        Self::with_source(ErrorKind::EvaluationFailed, message, err)
    }
}

impl From<PersistError> for SelectionError {
    fn from(err: PersistError) -> Self {
        Self::with_source(ErrorKind::PersistenceFailed, "could not write model artifact", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::FitError;

    #[test]
    fn display_includes_kind_and_message() {
        let err = SelectionError::new(ErrorKind::QualityGateFailed, "best score 0.41 < 0.6");
        assert_eq!(err.to_string(), "quality gate failed: best score 0.41 < 0.6");
        assert!(err.source().is_none());
        assert!(err.is_quality_gate());
    }

    #[test]
    fn evaluation_errors_keep_their_cause() {
        let err: SelectionError = EvaluationError::Candidate {
            name: "K-Neighbors Regressor".into(),
            source: FitError::TooFewSamples { required: 5, got: 2 },
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::EvaluationFailed);

        let cause = err.source().unwrap();
        assert!(cause.to_string().contains("K-Neighbors Regressor"));
        assert_eq!(
            cause.source().unwrap().to_string(),
            "need at least 5 samples, got 2"
        );
    }

    #[test]
    fn data_and_persist_errors_map_to_kinds() {
        let data: SelectionError = DataError::NoRows { which: "train" }.into();
        assert_eq!(data.kind(), ErrorKind::EvaluationFailed);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let persist: SelectionError = PersistError::from(io).into();
        assert_eq!(persist.kind(), ErrorKind::PersistenceFailed);
        assert!(persist.source().unwrap().to_string().contains("read-only"));
    }
}
