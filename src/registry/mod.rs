//! Model registry: identifiers, metadata documents and on-disk artifacts
//!
//! Each model owns one `<model_id>_metadata.json` document plus one bincode
//! artifact per fitted pipeline and, for classification, a label encoder.

mod id;
mod metadata;
mod store;

pub use id::{generate_model_id, is_valid_model_id};
pub use metadata::{ClassificationRecord, ModelMetadata, ModelRecord, RegressionRecord};
pub use store::{LoadedClassifier, LoadedModel, ModelRegistry};
