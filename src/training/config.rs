//! Training configuration

use super::algorithms::Hyperparams;
use crate::error::{ModelHubError, Result};
use crate::preprocessing::DEFAULT_MISSING_CATEGORY;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of ML task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Regression,
    Classification,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Regression => "regression",
            TaskType::Classification => "classification",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = ModelHubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "regression" => Ok(TaskType::Regression),
            "classification" => Ok(TaskType::Classification),
            other => Err(ModelHubError::ValidationError(format!(
                "model_type must be 'regression' or 'classification', got '{}'",
                other
            ))),
        }
    }
}

/// Configuration for one training pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Raw target column name; normalized before lookup
    pub target_column: String,

    /// Algorithm key or alias (`rf`, `linreg`, `logreg`, `knn`, ...)
    pub algorithm: String,

    /// Hyperparameters replacing the algorithm defaults when present
    pub params: Option<Hyperparams>,

    /// Fraction of rows held out for evaluation, in (0, 1)
    pub test_size: f64,

    /// Seed for the split and for seeded estimators
    pub random_state: u64,

    /// Bound on retained inspection samples
    pub sample_size: usize,

    /// Category substituted for missing categorical values
    pub missing_category: String,

    /// Bound on column names quoted in error messages
    pub max_listed_columns: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: "target".to_string(),
            algorithm: "rf".to_string(),
            params: None,
            test_size: 0.2,
            random_state: 42,
            sample_size: 10,
            missing_category: DEFAULT_MISSING_CATEGORY.to_string(),
            max_listed_columns: 10,
        }
    }
}

impl TrainingConfig {
    pub fn new(target_column: impl Into<String>) -> Self {
        Self {
            target_column: target_column.into(),
            ..Default::default()
        }
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

    pub fn with_missing_category(mut self, category: impl Into<String>) -> Self {
        self.missing_category = category.into();
        self
    }

    pub fn with_max_listed_columns(mut self, limit: usize) -> Self {
        self.max_listed_columns = limit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ModelHubError::ConfigError(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.target_column.trim().is_empty() {
            return Err(ModelHubError::ConfigError(
                "target column must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_parse() {
        assert_eq!("Regression".parse::<TaskType>().unwrap(), TaskType::Regression);
        assert_eq!(" classification ".parse::<TaskType>().unwrap(), TaskType::Classification);
        assert!(matches!(
            "clustering".parse::<TaskType>(),
            Err(ModelHubError::ValidationError(_))
        ));
        assert_eq!(
            serde_json::to_string(&TaskType::Classification).unwrap(),
            "\"classification\""
        );
    }

    #[test]
    fn test_validate_test_size() {
        let config = TrainingConfig::new("price");
        assert!(config.validate().is_ok());
        assert!(config.clone().with_test_size(0.0).validate().is_err());
        assert!(config.clone().with_test_size(1.0).validate().is_err());
        assert!(config.with_test_size(f64::NAN).validate().is_err());
    }
}
