//! Persistence errors.

/// Error reading or writing a model artifact.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON artifact.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed binary payload.
    #[error("binary payload error: {0}")]
    Postcard(postcard::Error),

    /// A binary artifact did not start with the expected magic bytes.
    #[error("not a regselect artifact (bad magic {found:?})")]
    BadMagic { found: Vec<u8> },

    /// The artifact was written by an incompatible format version.
    #[error("unsupported artifact format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The artifact decoded but its contents are inconsistent.
    #[error("validation error: {0}")]
    Validation(String),
}
