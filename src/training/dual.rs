//! Dual-model orchestration: one regression and one classification pipeline
//! trained from the same table

use super::algorithms::{resolve, FallbackPolicy, Hyperparams};
use super::classification::{train_classification_with_policy, ClassificationResult};
use super::config::{TaskType, TrainingConfig};
use super::regression::{train_regression, RegressionResult};
use crate::error::{ModelHubError, Result};
use crate::table;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Parameters of a dual training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DualTrainingConfig {
    pub target_regression: String,
    pub target_classification: String,
    pub regression_algorithm: String,
    pub classification_algorithm: String,
    pub regression_params: Option<Hyperparams>,
    pub classification_params: Option<Hyperparams>,
    /// Shared split, seed, sampling and imputation settings; its
    /// `target_column`, `algorithm` and `params` are ignored
    pub base: TrainingConfig,
}

impl DualTrainingConfig {
    pub fn new(target_regression: impl Into<String>, target_classification: impl Into<String>) -> Self {
        Self {
            target_regression: target_regression.into(),
            target_classification: target_classification.into(),
            regression_algorithm: "rf".to_string(),
            classification_algorithm: "rf".to_string(),
            regression_params: None,
            classification_params: None,
            base: TrainingConfig::default(),
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

    pub fn with_base(mut self, base: TrainingConfig) -> Self {
        self.base = base;
        self
    }
}

/// Both pipelines of a dual training run
#[derive(Debug, Clone)]
pub struct DualTrainingResult {
    pub regression: RegressionResult,
    pub classification: ClassificationResult,
}

/// Train a regression and a classification pipeline on `df`.
///
/// Both targets and both algorithm choices are checked before any fitting
/// starts. Each pipeline computes its own feature set, so either target may
/// appear as a feature of the other.
/// An unsupported classification algorithm falls back to `rf`; the regression
/// side stays strict.
pub fn train_both(df: &DataFrame, config: &DualTrainingConfig) -> Result<DualTrainingResult> {
    table::ensure_trainable(df)?;
    let limit = config.base.max_listed_columns;

    let missing: Vec<String> = [&config.target_regression, &config.target_classification]
        .iter()
        .filter(|raw| table::resolve_column(df, raw, "target", limit).is_err())
        .map(|raw| format!("'{}' (normalized: '{}')", raw, table::normalize_column_name(raw)))
        .collect();
    if !missing.is_empty() {
        return Err(ModelHubError::ConfigError(format!(
            "target column(s) {} not found; available columns: {}",
            missing.join(", "),
            table::available_columns_hint(df, limit)
        )));
    }

    let regression_config = TrainingConfig {
        target_column: config.target_regression.clone(),
        algorithm: config.regression_algorithm.clone(),
        params: config.regression_params.clone(),
        ..config.base.clone()
    };
    let classification_config = TrainingConfig {
        target_column: config.target_classification.clone(),
        algorithm: config.classification_algorithm.clone(),
        params: config.classification_params.clone(),
        ..config.base.clone()
    };
    regression_config.validate()?;
    resolve(
        &regression_config.algorithm,
        TaskType::Regression,
        regression_config.params.as_ref(),
        FallbackPolicy::Strict,
    )?;
    resolve(
        &classification_config.algorithm,
        TaskType::Classification,
        classification_config.params.as_ref(),
        FallbackPolicy::DefaultToRandomForest,
    )?;

    info!(
        target_regression = %config.target_regression,
        target_classification = %config.target_classification,
        "Training dual model"
    );

    let regression = train_regression(df, &regression_config)?;
    let classification = train_classification_with_policy(
        df,
        &classification_config,
        FallbackPolicy::DefaultToRandomForest,
    )?;

    Ok(DualTrainingResult {
        regression,
        classification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::AlgorithmKind;

    fn orders() -> DataFrame {
        let amount: Vec<f64> = (0..30).map(|i| 10.0 + i as f64).collect();
        let distance: Vec<f64> = (0..30).map(|i| (i % 7) as f64).collect();
        let city: Vec<&str> = (0..30).map(|i| if i % 2 == 0 { "NYC" } else { "LA" }).collect();
        let late: Vec<bool> = (0..30).map(|i| i % 7 > 3).collect();
        df!("amount" => amount, "distance" => distance, "city" => city, "late" => late).unwrap()
    }

    #[test]
    fn test_feature_sets_are_per_target() {
        let config = DualTrainingConfig::new("amount", "late").with_algorithms("linreg", "logreg");
        let result = train_both(&orders(), &config).unwrap();

        assert_eq!(result.regression.feature_set.numeric_features, vec!["distance"]);
        assert_eq!(result.regression.feature_set.categorical_features, vec!["city", "late"]);
        assert_eq!(result.classification.feature_set.numeric_features, vec!["amount", "distance"]);
        assert_eq!(result.classification.feature_set.categorical_features, vec!["city"]);
    }

    #[test]
    fn test_missing_target_fails_before_training() {
        let config = DualTrainingConfig::new("amount", "on_time");
        let err = train_both(&orders(), &config).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, ModelHubError::ConfigError(_)));
        assert!(msg.contains("on_time"));
        assert!(msg.contains("amount"));
    }

    #[test]
    fn test_classification_side_falls_back_to_rf() {
        let config = DualTrainingConfig::new("amount", "late").with_algorithms("linreg", "svm");
        let result = train_both(&orders(), &config).unwrap();
        assert_eq!(result.classification.algorithm, AlgorithmKind::RandomForest);
    }

    #[test]
    fn test_bad_classifier_params_fail_before_training() {
        let params: Hyperparams = [("n_neighbors".to_string(), serde_json::json!(0))].into_iter().collect();
        let config = DualTrainingConfig::new("amount", "late")
            .with_algorithms("rf", "knn")
            .with_classification_params(params);
        let err = train_both(&orders(), &config).unwrap_err();
        assert!(matches!(err, ModelHubError::ConfigError(_)), "got {:?}", err);
        assert!(err.to_string().contains("n_neighbors"));
    }

    #[test]
    fn test_regression_side_stays_strict() {
        let config = DualTrainingConfig::new("amount", "late").with_algorithms("knn", "rf");
        assert!(matches!(
            train_both(&orders(), &config),
            Err(ModelHubError::UnsupportedAlgorithm { .. })
        ));
    }
}
