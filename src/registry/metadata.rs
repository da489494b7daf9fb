//! Persisted metadata documents

use crate::preprocessing::FeatureSet;
use crate::training::{
    AlgorithmKind, ClassificationMetrics, ClassificationResult, Hyperparams, RegressionMetrics,
    RegressionResult, TaskType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything recorded about a trained regression pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionRecord {
    pub target_col: String,
    pub algorithm: AlgorithmKind,
    pub hyperparameters: Hyperparams,
    pub metrics: RegressionMetrics,
    #[serde(flatten)]
    pub feature_set: FeatureSet,
    pub n_samples_train: usize,
    pub n_samples_test: usize,
    /// Artifact file, relative to the registry root
    pub artifact_path: String,
    #[serde(default)]
    pub y_test_sample: Vec<f64>,
    #[serde(default)]
    pub y_pred_sample: Vec<f64>,
}

impl RegressionRecord {
    pub fn from_result(result: &RegressionResult, artifact_path: impl Into<String>) -> Self {
        Self {
            target_col: result.target_col.clone(),
            algorithm: result.algorithm,
            hyperparameters: result.hyperparameters.clone(),
            metrics: result.metrics,
            feature_set: result.feature_set.clone(),
            n_samples_train: result.n_samples_train,
            n_samples_test: result.n_samples_test,
            artifact_path: artifact_path.into(),
            y_test_sample: result.y_test_sample.clone(),
            y_pred_sample: result.y_pred_sample.clone(),
        }
    }

    fn first_non_finite(&self) -> Option<&'static str> {
        let m = &self.metrics;
        if ![m.mae, m.mse, m.rmse, m.r2].iter().all(|v| v.is_finite()) {
            return Some("metrics");
        }
        if !self.y_test_sample.iter().chain(&self.y_pred_sample).all(|v| v.is_finite()) {
            return Some("samples");
        }
        None
    }
}

/// Everything recorded about a trained classification pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub target_col: String,
    pub algorithm: AlgorithmKind,
    pub hyperparameters: Hyperparams,
    pub metrics: ClassificationMetrics,
    #[serde(flatten)]
    pub feature_set: FeatureSet,
    pub n_samples_train: usize,
    pub n_samples_test: usize,
    pub classes: Vec<String>,
    pub n_classes: usize,
    pub artifact_path: String,
    pub encoder_path: String,
    #[serde(default)]
    pub y_test_sample: Vec<String>,
    #[serde(default)]
    pub y_pred_sample: Vec<String>,
    #[serde(default)]
    pub y_proba_sample: Option<Vec<Vec<f64>>>,
}

impl ClassificationRecord {
    pub fn from_result(
        result: &ClassificationResult,
        artifact_path: impl Into<String>,
        encoder_path: impl Into<String>,
    ) -> Self {
        Self {
            target_col: result.target_col.clone(),
            algorithm: result.algorithm,
            hyperparameters: result.hyperparameters.clone(),
            metrics: result.metrics,
            feature_set: result.feature_set.clone(),
            n_samples_train: result.n_samples_train,
            n_samples_test: result.n_samples_test,
            classes: result.classes.clone(),
            n_classes: result.n_classes(),
            artifact_path: artifact_path.into(),
            encoder_path: encoder_path.into(),
            y_test_sample: result.y_test_sample.clone(),
            y_pred_sample: result.y_pred_sample.clone(),
            y_proba_sample: result.y_proba_sample.clone(),
        }
    }

    fn first_non_finite(&self) -> Option<&'static str> {
        let m = &self.metrics;
        if ![m.accuracy, m.precision_macro, m.recall_macro, m.f1_macro].iter().all(|v| v.is_finite()) {
            return Some("metrics");
        }
        let proba_ok = self
            .y_proba_sample
            .iter()
            .flatten()
            .flatten()
            .all(|v| v.is_finite());
        if !proba_ok {
            return Some("probability samples");
        }
        None
    }
}

/// The model of a single-task document, tagged by `model_type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model_type", rename_all = "snake_case")]
pub enum ModelRecord {
    Regression(RegressionRecord),
    Classification(ClassificationRecord),
}

impl ModelRecord {
    pub fn task(&self) -> TaskType {
        match self {
            ModelRecord::Regression(_) => TaskType::Regression,
            ModelRecord::Classification(_) => TaskType::Classification,
        }
    }

    pub fn feature_set(&self) -> &FeatureSet {
        match self {
            ModelRecord::Regression(r) => &r.feature_set,
            ModelRecord::Classification(c) => &c.feature_set,
        }
    }
}

/// The authoritative record of a stored model.
///
/// The `shape` tag is the only discriminator between single-task and dual
/// documents. A single document carries its record's fields (`model_type`,
/// `numeric_features`, ...) at the top level; a dual document nests them under
/// `regression` and `classification`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ModelMetadata {
    Single {
        model_id: String,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
        #[serde(flatten)]
        model: ModelRecord,
    },
    Dual {
        model_id: String,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
        regression: RegressionRecord,
        classification: ClassificationRecord,
    },
}

impl ModelMetadata {
    pub fn model_id(&self) -> &str {
        match self {
            ModelMetadata::Single { model_id, .. } | ModelMetadata::Dual { model_id, .. } => model_id,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            ModelMetadata::Single { timestamp, .. } | ModelMetadata::Dual { timestamp, .. } => *timestamp,
        }
    }

    pub fn is_dual(&self) -> bool {
        matches!(self, ModelMetadata::Dual { .. })
    }

    /// Tasks this document holds a pipeline for
    pub fn tasks(&self) -> Vec<TaskType> {
        match self {
            ModelMetadata::Single { model, .. } => vec![model.task()],
            ModelMetadata::Dual { .. } => vec![TaskType::Regression, TaskType::Classification],
        }
    }

    /// Recorded feature set of the pipeline serving `task`
    pub fn feature_set(&self, task: TaskType) -> Option<&FeatureSet> {
        match (self, task) {
            (ModelMetadata::Single { model, .. }, t) if model.task() == t => Some(model.feature_set()),
            (ModelMetadata::Dual { regression, .. }, TaskType::Regression) => Some(&regression.feature_set),
            (ModelMetadata::Dual { classification, .. }, TaskType::Classification) => {
                Some(&classification.feature_set)
            }
            _ => None,
        }
    }

    /// First recorded float that JSON cannot carry, as "<task> <field>".
    ///
    /// JSON has no NaN or infinity, so such a document would not read back.
    pub fn first_non_finite(&self) -> Option<String> {
        let regression = match self {
            ModelMetadata::Single { model: ModelRecord::Regression(r), .. } => Some(r),
            ModelMetadata::Dual { regression, .. } => Some(regression),
            _ => None,
        };
        let classification = match self {
            ModelMetadata::Single { model: ModelRecord::Classification(c), .. } => Some(c),
            ModelMetadata::Dual { classification, .. } => Some(classification),
            _ => None,
        };
        regression
            .and_then(|r| r.first_non_finite())
            .map(|field| format!("regression {}", field))
            .or_else(|| {
                classification
                    .and_then(|c| c.first_non_finite())
                    .map(|field| format!("classification {}", field))
            })
    }

    /// Every artifact file the document references, relative to the registry root
    pub fn artifact_paths(&self) -> Vec<&str> {
        match self {
            ModelMetadata::Single { model: ModelRecord::Regression(r), .. } => vec![r.artifact_path.as_str()],
            ModelMetadata::Single { model: ModelRecord::Classification(c), .. } => {
                vec![c.artifact_path.as_str(), c.encoder_path.as_str()]
            }
            ModelMetadata::Dual { regression, classification, .. } => vec![
                regression.artifact_path.as_str(),
                classification.artifact_path.as_str(),
                classification.encoder_path.as_str(),
            ],
        }
    }
}
