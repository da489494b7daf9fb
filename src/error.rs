//! Error types for modelhub

use thiserror::Error;

/// Result type alias for modelhub operations
pub type Result<T> = std::result::Result<T, ModelHubError>;

/// Coarse error classes a caller maps to user-visible statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad target column, unsupported algorithm, bad parameters, empty data
    Configuration,
    /// Unknown model id or a missing artifact
    NotFound,
    /// Malformed or ambiguous inference request
    Validation,
    /// Failure inside a fit step
    Training,
    /// Failure inside a transform or predict step
    Inference,
    /// IO, serialization and other plumbing failures
    Internal,
}

/// Main error type for modelhub
#[derive(Error, Debug)]
pub enum ModelHubError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unsupported algorithm '{kind}' for {task}; supported: {supported}")]
    UnsupportedAlgorithm {
        kind: String,
        task: String,
        supported: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Training error: {context}: {source}")]
    Training {
        context: String,
        #[source]
        source: Box<ModelHubError>,
    },

    #[error("Inference error: {context}: {source}")]
    Inference {
        context: String,
        #[source]
        source: Box<ModelHubError>,
    },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl ModelHubError {
    /// Wrap a fit-step failure, keeping the original error as the source
    pub fn training(context: impl Into<String>, source: ModelHubError) -> Self {
        ModelHubError::Training {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a transform/predict failure, keeping the original error as the source
    pub fn inference(context: impl Into<String>, source: ModelHubError) -> Self {
        ModelHubError::Inference {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Taxonomy class of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            ModelHubError::ConfigError(_) | ModelHubError::UnsupportedAlgorithm { .. } => {
                ErrorCategory::Configuration
            }
            ModelHubError::NotFound(_) => ErrorCategory::NotFound,
            ModelHubError::ValidationError(_) => ErrorCategory::Validation,
            ModelHubError::Training { .. } => ErrorCategory::Training,
            ModelHubError::Inference { .. } => ErrorCategory::Inference,
            ModelHubError::DataError(_)
            | ModelHubError::IoError(_)
            | ModelHubError::SerializationError(_)
            | ModelHubError::ShapeError { .. }
            | ModelHubError::ModelNotFitted
            | ModelHubError::ComputationError(_) => ErrorCategory::Internal,
        }
    }
}

impl From<polars::error::PolarsError> for ModelHubError {
    fn from(err: polars::error::PolarsError) -> Self {
        ModelHubError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ModelHubError {
    fn from(err: serde_json::Error) -> Self {
        ModelHubError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for ModelHubError {
    fn from(err: bincode::Error) -> Self {
        ModelHubError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ModelHubError {
    fn from(err: ndarray::ShapeError) -> Self {
        ModelHubError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
