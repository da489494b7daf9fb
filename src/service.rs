//! Service facade: train, persist, reload and predict
//!
//! `ModelService` is the entry point the HTTP or CLI layer talks to. It holds
//! no dataset state; every training call receives its table explicitly.

use crate::error::{ModelHubError, Result};
use crate::inference::{FeatureListing, FeatureRow, InferenceEngine, Prediction};
use crate::preprocessing::DEFAULT_MISSING_CATEGORY;
use crate::registry::{LoadedModel, ModelMetadata, ModelRegistry};
use crate::training::{
    train_both, train_classification, train_regression, DualTrainingConfig, Hyperparams, TaskType,
    TrainingConfig,
};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Service-wide defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Directory holding metadata documents and artifacts
    pub registry_dir: PathBuf,
    pub test_size: f64,
    pub random_state: u64,
    /// Bound on retained inspection samples
    pub sample_size: usize,
    /// Bound on column names quoted in configuration errors
    pub max_listed_columns: usize,
    /// Categorical imputation sentinel
    pub missing_category: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            registry_dir: PathBuf::from("models"),
            test_size: 0.2,
            random_state: 42,
            sample_size: 10,
            max_listed_columns: 10,
            missing_category: DEFAULT_MISSING_CATEGORY.to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn new(registry_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry_dir: registry_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn with_max_listed_columns(mut self, limit: usize) -> Self {
        self.max_listed_columns = limit;
        self
    }

    pub fn with_missing_category(mut self, category: impl Into<String>) -> Self {
        self.missing_category = category.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.registry_dir.as_os_str().is_empty() {
            return Err(ModelHubError::ConfigError("registry_dir must not be empty".to_string()));
        }
        self.training_config("target", "rf", None, None, None).validate()
    }

    /// Load from a JSON file; absent fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: ServiceConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn training_config(
        &self,
        target: &str,
        algorithm: &str,
        params: Option<Hyperparams>,
        test_size: Option<f64>,
        random_state: Option<u64>,
    ) -> TrainingConfig {
        TrainingConfig {
            target_column: target.to_string(),
            algorithm: algorithm.to_string(),
            params,
            test_size: test_size.unwrap_or(self.test_size),
            random_state: random_state.unwrap_or(self.random_state),
            sample_size: self.sample_size,
            missing_category: self.missing_category.clone(),
            max_listed_columns: self.max_listed_columns,
        }
    }
}

fn default_algorithm() -> String {
    "rf".to_string()
}

/// A single-task training request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainRequest {
    pub model_type: TaskType,
    pub target_col: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default)]
    pub params: Option<Hyperparams>,
    /// Overrides `ServiceConfig::test_size`
    #[serde(default)]
    pub test_size: Option<f64>,
    /// Overrides `ServiceConfig::random_state`
    #[serde(default)]
    pub random_state: Option<u64>,
}

impl TrainRequest {
    pub fn new(model_type: TaskType, target_col: impl Into<String>) -> Self {
        Self {
            model_type,
            target_col: target_col.into(),
            algorithm: default_algorithm(),
            params: None,
            test_size: None,
            random_state: None,
        }
    }

    pub fn regression(target_col: impl Into<String>) -> Self {
        Self::new(TaskType::Regression, target_col)
    }

    pub fn classification(target_col: impl Into<String>) -> Self {
        Self::new(TaskType::Classification, target_col)
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    pub fn with_params(mut self, params: Hyperparams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = Some(test_size);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }
}

/// A dual training request: one regression and one classification target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualTrainRequest {
    pub target_regression: String,
    pub target_classification: String,
    #[serde(default = "default_algorithm")]
    pub regression_algorithm: String,
    #[serde(default = "default_algorithm")]
    pub classification_algorithm: String,
    #[serde(default)]
    pub regression_params: Option<Hyperparams>,
    #[serde(default)]
    pub classification_params: Option<Hyperparams>,
    #[serde(default)]
    pub test_size: Option<f64>,
    #[serde(default)]
    pub random_state: Option<u64>,
}

impl DualTrainRequest {
    pub fn new(target_regression: impl Into<String>, target_classification: impl Into<String>) -> Self {
        Self {
            target_regression: target_regression.into(),
            target_classification: target_classification.into(),
            regression_algorithm: default_algorithm(),
            classification_algorithm: default_algorithm(),
            regression_params: None,
            classification_params: None,
            test_size: None,
            random_state: None,
        }
    }

    pub fn with_algorithms(mut self, regression: impl Into<String>, classification: impl Into<String>) -> Self {
        self.regression_algorithm = regression.into();
        self.classification_algorithm = classification.into();
        self
    }

    pub fn with_regression_params(mut self, params: Hyperparams) -> Self {
        self.regression_params = Some(params);
        self
    }

    pub fn with_classification_params(mut self, params: Hyperparams) -> Self {
        self.classification_params = Some(params);
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = Some(test_size);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }
}

/// Train, persist and serve models from one registry directory
#[derive(Debug, Clone)]
pub struct ModelService {
    config: ServiceConfig,
    engine: InferenceEngine,
}

impl ModelService {
    /// Validate `config` and open its registry directory
    pub fn new(config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        let registry = ModelRegistry::open(&config.registry_dir)?;
        Ok(Self {
            config,
            engine: InferenceEngine::new(registry),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        self.engine.registry()
    }

    /// Train one pipeline on `df` and persist it under a new identifier
    pub fn train(&self, df: &DataFrame, request: &TrainRequest) -> Result<ModelMetadata> {
        let config = self.config.training_config(
            &request.target_col,
            &request.algorithm,
            request.params.clone(),
            request.test_size,
            request.random_state,
        );

        let metadata = match request.model_type {
            TaskType::Regression => {
                let result = train_regression(df, &config)?;
                self.registry().persist_regression(&result)?
            }
            TaskType::Classification => {
                let result = train_classification(df, &config)?;
                self.registry().persist_classification(&result)?
            }
        };

        info!(
            model_id = %metadata.model_id(),
            task = %request.model_type,
            "Model trained and stored"
        );
        Ok(metadata)
    }

    /// Train a regression and a classification pipeline on `df` under one identifier
    pub fn train_both(&self, df: &DataFrame, request: &DualTrainRequest) -> Result<ModelMetadata> {
        let base = self.config.training_config(
            &request.target_regression,
            &request.regression_algorithm,
            None,
            request.test_size,
            request.random_state,
        );
        let config = DualTrainingConfig {
            target_regression: request.target_regression.clone(),
            target_classification: request.target_classification.clone(),
            regression_algorithm: request.regression_algorithm.clone(),
            classification_algorithm: request.classification_algorithm.clone(),
            regression_params: request.regression_params.clone(),
            classification_params: request.classification_params.clone(),
            base,
        };

        let result = train_both(df, &config)?;
        let metadata = self.registry().persist_dual(&result)?;
        info!(model_id = %metadata.model_id(), "Dual model trained and stored");
        Ok(metadata)
    }

    pub fn predict(&self, model_id: &str, row: &FeatureRow, model_type: Option<TaskType>) -> Result<Prediction> {
        self.engine.predict(model_id, row, model_type)
    }

    pub fn predict_rows(
        &self,
        model_id: &str,
        rows: &[FeatureRow],
        model_type: Option<TaskType>,
    ) -> Result<Prediction> {
        self.engine.predict_rows(model_id, rows, model_type)
    }

    pub fn features(&self, model_id: &str, model_type: Option<TaskType>) -> Result<FeatureListing> {
        self.engine.features(model_id, model_type)
    }

    pub fn load(&self, model_id: &str) -> Result<LoadedModel> {
        self.registry().load(model_id)
    }

    pub fn list_all(&self) -> Result<Vec<ModelMetadata>> {
        self.registry().list_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("service.json");
        let config = ServiceConfig::new(dir.path().join("models"))
            .with_test_size(0.25)
            .with_random_state(7);
        config.save(&path).unwrap();
        assert_eq!(ServiceConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_config_takes_defaults() {
        let config: ServiceConfig = serde_json::from_str(r#"{"registry_dir": "/tmp/m"}"#).unwrap();
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.random_state, 42);
        assert_eq!(config.missing_category, "missing");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(ModelService::new(ServiceConfig::new(dir.path()).with_test_size(1.5)).is_err());
        assert!(ServiceConfig::new("").validate().is_err());
    }

    #[test]
    fn test_request_defaults() {
        let request: TrainRequest =
            serde_json::from_str(r#"{"model_type": "classification", "target_col": "delivered"}"#).unwrap();
        assert_eq!(request, TrainRequest::classification("delivered"));
        assert_eq!(request.algorithm, "rf");
    }
}
