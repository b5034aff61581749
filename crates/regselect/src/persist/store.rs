//! Artifact storage backends.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use super::{Artifact, ArtifactFormat, PersistError};

/// Writes and reads artifacts at a path.
pub trait ModelStore {
    /// Write `artifact` to `path`, replacing any existing file. Artifacts that
    /// would not pass validation on load are rejected before anything is written.
    fn save(&self, path: &Path, artifact: &Artifact) -> Result<(), PersistError>;

    /// Read and validate the artifact at `path`.
    fn load(&self, path: &Path) -> Result<Artifact, PersistError>;
}

/// Local filesystem store.
///
/// Saves are atomic: the artifact is written to a temporary file in the
/// destination directory and renamed over the target. A failed save leaves
/// the previous file, if any, untouched. Loading detects the encoding from
/// the file contents, so `format` only affects saves.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore {
    pub format: ArtifactFormat,
}

impl FileStore {
    pub fn new(format: ArtifactFormat) -> Self {
        Self { format }
    }
}

impl ModelStore for FileStore {
    fn save(&self, path: &Path, artifact: &Artifact) -> Result<(), PersistError> {
        artifact.validate()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            artifact.write(self.format, &mut writer)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| PersistError::Io(e.error))?;

        tracing::debug!(path = %path.display(), format = ?self.format, "artifact written");
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<Artifact, PersistError> {
        let bytes = fs::read(path)?;
        Artifact::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::{KNeighborsRegressor, Regressor};
    use crate::utils::Parallelism;
    use ndarray::Array2;
    use rstest::rstest;

    fn fitted_artifact() -> Artifact {
        let x = Array2::from_shape_fn((6, 2), |(r, c)| (r * 2 + c) as f64);
        let y = x.column(0).to_owned();
        let mut model = KNeighborsRegressor::default();
        model.fit(x.view(), y.view(), Parallelism::Sequential).unwrap();
        Artifact::new("K-Neighbors Regressor", 0.75, model.into())
    }

    #[rstest]
    #[case(ArtifactFormat::Json)]
    #[case(ArtifactFormat::Binary)]
    fn save_creates_parent_dirs_and_loads_back(#[case] format: ArtifactFormat) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/model.bin");
        let store = FileStore::new(format);

        store.save(&path, &fitted_artifact()).unwrap();
        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded.model_name, "K-Neighbors Regressor");
        assert_eq!(loaded.estimator.kind(), "k_neighbors");
    }

    #[test]
    fn save_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, b"old contents").unwrap();

        FileStore::default().save(&path, &fitted_artifact()).unwrap();
        assert_ne!(fs::read(&path).unwrap(), b"old contents");

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[rstest]
    #[case(f64::INFINITY)]
    #[case(f64::NAN)]
    fn invalid_artifact_is_rejected_before_writing(#[case] score: f64) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, b"old contents").unwrap();

        let mut artifact = fitted_artifact();
        artifact.test_score = score;
        let err = FileStore::default().save(&path, &artifact).unwrap_err();
        assert!(matches!(err, PersistError::Validation(_)), "got: {err:?}");

        assert_eq!(fs::read(&path).unwrap(), b"old contents");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn unfitted_estimator_is_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let artifact = Artifact::new("K-Neighbors Regressor", 0.75, KNeighborsRegressor::default().into());

        let err = FileStore::default().save(&path, &artifact).unwrap_err();
        assert!(matches!(err, PersistError::Validation(_)), "got: {err:?}");
        assert!(!path.exists());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileStore::default().load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, PersistError::Io(_)));
    }
}
