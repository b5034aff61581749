//! The persisted artifact envelope and its two encodings.
//!
//! JSON is the default: a single object
//! `{ "format_version", "model_name", "test_score", "estimator" }`. The binary
//! encoding is the 4-byte magic `RSEL` followed by the same envelope as a
//! postcard payload.
//!
//! Both readers check `format_version` before decoding the estimator and
//! validate the estimator's structure afterwards.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use super::PersistError;
use crate::estimators::Estimator;

/// Current artifact format version.
pub const FORMAT_VERSION: u32 = 1;

/// Leading bytes of a binary artifact.
pub const MAGIC: [u8; 4] = *b"RSEL";

/// On-disk encoding of an [`Artifact`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// Magic bytes followed by a postcard payload.
    Binary,
}

/// A fitted winning model together with how it was chosen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub format_version: u32,
    /// Candidate name the model was selected under.
    pub model_name: String,
    /// Held-out R² at selection time.
    pub test_score: f64,
    pub estimator: Estimator,
}

/// Only the version field, decoded before the rest of a JSON artifact.
#[derive(Deserialize)]
struct VersionProbe {
    format_version: u32,
}

impl Artifact {
    pub fn new(model_name: impl Into<String>, test_score: f64, estimator: Estimator) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            model_name: model_name.into(),
            test_score,
            estimator,
        }
    }

    /// Check version and structure of a decoded artifact.
    pub fn validate(&self) -> Result<(), PersistError> {
        check_version(self.format_version)?;
        if self.model_name.is_empty() {
            return Err(PersistError::Validation("empty model name".into()));
        }
        if !self.test_score.is_finite() {
            return Err(PersistError::Validation(format!(
                "non-finite test score {}",
                self.test_score
            )));
        }
        self.estimator.validate().map_err(PersistError::Validation)
    }

    pub fn write<W: Write>(&self, format: ArtifactFormat, writer: W) -> Result<(), PersistError> {
        match format {
            ArtifactFormat::Json => self.write_json(writer),
            ArtifactFormat::Binary => self.write_binary(writer),
        }
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), PersistError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn write_binary<W: Write>(&self, mut writer: W) -> Result<(), PersistError> {
        let payload = postcard::to_allocvec(self).map_err(PersistError::Postcard)?;
        writer.write_all(&MAGIC)?;
        writer.write_all(&payload)?;
        Ok(())
    }

    /// Decode either encoding, detected by the leading magic bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistError> {
        if bytes.starts_with(&MAGIC) {
            Self::from_binary(bytes)
        } else {
            Self::from_json(bytes)
        }
    }

    pub fn read_json<R: Read>(mut reader: R) -> Result<Self, PersistError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_json(&bytes)
    }

    pub fn read_binary<R: Read>(mut reader: R) -> Result<Self, PersistError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_binary(&bytes)
    }

    fn from_json(bytes: &[u8]) -> Result<Self, PersistError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        let probe: VersionProbe = serde_json::from_value(value.clone())?;
        check_version(probe.format_version)?;

        let artifact: Self = serde_json::from_value(value)?;
        artifact.validate()?;
        Ok(artifact)
    }

    fn from_binary(bytes: &[u8]) -> Result<Self, PersistError> {
        let Some(payload) = bytes.strip_prefix(&MAGIC[..]) else {
            return Err(PersistError::BadMagic {
                found: bytes.iter().take(MAGIC.len()).copied().collect(),
            });
        };
        // `format_version` is the first field, so it decodes on its own.
        let (version, _) = postcard::take_from_bytes::<u32>(payload).map_err(PersistError::Postcard)?;
        check_version(version)?;

        let artifact: Self = postcard::from_bytes(payload).map_err(PersistError::Postcard)?;
        artifact.validate()?;
        Ok(artifact)
    }
}

fn check_version(found: u32) -> Result<(), PersistError> {
    if found != FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion {
            found,
            supported: FORMAT_VERSION,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::{LinearRegression, Regressor};
    use crate::utils::Parallelism;
    use ndarray::array;

    fn fitted_artifact() -> Artifact {
        let mut model = LinearRegression::default();
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![1.0, 3.0, 5.0];
        model.fit(x.view(), y.view(), Parallelism::Sequential).unwrap();
        Artifact::new("Linear Regression", 0.97, model.into())
    }

    #[test]
    fn json_envelope_fields() {
        let mut bytes = Vec::new();
        fitted_artifact().write_json(&mut bytes).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["format_version"], 1);
        assert_eq!(value["model_name"], "Linear Regression");
        assert_eq!(value["test_score"], 0.97);
        assert!(value["estimator"]["linear"].is_object());
    }

    #[test]
    fn binary_starts_with_magic() {
        let mut bytes = Vec::new();
        fitted_artifact().write_binary(&mut bytes).unwrap();
        assert_eq!(&bytes[..4], b"RSEL");
        let loaded = Artifact::from_bytes(&bytes).unwrap();
        assert_eq!(loaded.model_name, "Linear Regression");
    }

    #[test]
    fn rejects_future_version() {
        let mut artifact = fitted_artifact();
        artifact.format_version = 2;

        let mut json = Vec::new();
        artifact.write_json(&mut json).unwrap();
        assert!(matches!(
            Artifact::read_json(json.as_slice()),
            Err(PersistError::UnsupportedVersion { found: 2, supported: 1 })
        ));

        let mut binary = Vec::new();
        artifact.write_binary(&mut binary).unwrap();
        assert!(matches!(
            Artifact::read_binary(binary.as_slice()),
            Err(PersistError::UnsupportedVersion { found: 2, supported: 1 })
        ));
    }

    #[test]
    fn rejects_bad_magic() {
        let err = Artifact::read_binary(&b"NOPE\x01"[..]).unwrap_err();
        assert!(matches!(err, PersistError::BadMagic { ref found } if found == b"NOPE"));
    }

    #[test]
    fn rejects_unfitted_estimator() {
        let artifact = Artifact::new("Linear Regression", 0.9, LinearRegression::default().into());
        let mut bytes = Vec::new();
        artifact.write_json(&mut bytes).unwrap();
        assert!(matches!(Artifact::from_bytes(&bytes), Err(PersistError::Validation(_))));
    }
}
