//! Persistence of the selected model.
//!
//! The selector hands the winner to a [`ModelStore`] wrapped in an
//! [`Artifact`] envelope. [`FileStore`] is the filesystem implementation and
//! supports JSON and a compact binary encoding.
//!
//! # Example
//!
//! ```ignore
//! use regselect::persist::{FileStore, ModelStore};
//!
//! let artifact = FileStore::default().load("artifacts/model.json".as_ref())?;
//! let predictions = artifact.estimator.predict(features)?;
//! ```

mod error;
mod schema;
mod store;

pub use error::PersistError;
pub use schema::{Artifact, ArtifactFormat, FORMAT_VERSION, MAGIC};
pub use store::{FileStore, ModelStore};
