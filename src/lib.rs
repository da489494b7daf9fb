//! modelhub - train, persist and serve tabular models
//!
//! This crate turns a cleaned table into a fitted regression or classification
//! pipeline, stores it under a generated identifier, and reproduces its
//! predictions later from that identifier.
//!
//! # Modules
//!
//! - [`table`] - Column-name normalization and typed column access
//! - [`preprocessing`] - Feature classification, imputation, scaling, encoding
//! - [`training`] - Algorithm registry, estimators and training pipelines
//! - [`registry`] - Metadata documents and on-disk artifacts
//! - [`inference`] - Feature-row validation and prediction dispatch
//! - [`service`] - Service facade used by front ends
//!
//! # Example
//!
//! ```no_run
//! use modelhub::prelude::*;
//! use polars::prelude::*;
//!
//! # fn main() -> modelhub::Result<()> {
//! let df = df!(
//!     "price" => &[10.0, 12.0, 30.0, 33.0, 15.0, 40.0],
//!     "city" => &["NYC", "LA", "NYC", "LA", "SF", "SF"],
//!     "delivered" => &[false, false, true, true, false, true]
//! )?;
//!
//! let service = ModelService::new(ServiceConfig::new("models"))?;
//! let metadata = service.train(&df, &TrainRequest::classification("delivered").with_algorithm("logreg"))?;
//!
//! let row: FeatureRow = [
//!     ("price".to_string(), serde_json::json!(31.0)),
//!     ("city".to_string(), serde_json::json!("NYC")),
//! ]
//! .into_iter()
//! .collect();
//! let prediction = service.predict(metadata.model_id(), &row, None)?;
//! # let _ = prediction;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod inference;
pub mod preprocessing;
pub mod registry;
pub mod service;
pub mod table;
pub mod training;

pub use error::{ErrorCategory, ModelHubError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{ErrorCategory, ModelHubError, Result};
    pub use crate::inference::{FeatureListing, FeatureRow, InferenceEngine, Prediction};
    pub use crate::preprocessing::{FeaturePreprocessor, FeatureSet, LabelEncoder};
    pub use crate::registry::{LoadedModel, ModelMetadata, ModelRecord, ModelRegistry};
    pub use crate::service::{DualTrainRequest, ModelService, ServiceConfig, TrainRequest};
    pub use crate::training::{
        train_both, train_classification, train_regression, AlgorithmKind, DualTrainingConfig,
        FallbackPolicy, Hyperparams, TaskType, TrainingConfig,
    };
}
