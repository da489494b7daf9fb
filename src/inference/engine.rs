//! Inference engine: reloads stored models and dispatches predictions
//!
//! Every call re-reads the registry; no fitted pipeline is cached in-process.

use super::row::{rows_to_frame, FeatureRow};
use crate::error::{ModelHubError, Result};
use crate::preprocessing::{FeatureFrame, FeatureSet};
use crate::registry::{LoadedModel, ModelMetadata, ModelRecord, ModelRegistry};
use crate::training::TaskType;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of an inference call, tagged by `model_type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model_type", rename_all = "snake_case")]
pub enum Prediction {
    Regression {
        model_id: String,
        predictions: Vec<f64>,
    },
    Classification {
        model_id: String,
        /// Decoded labels
        predictions: Vec<String>,
        /// One probability row per prediction, aligned with `classes`
        probabilities: Option<Vec<Vec<f64>>>,
        /// Class labels as recorded at training time
        classes: Vec<String>,
    },
}

impl Prediction {
    pub fn model_id(&self) -> &str {
        match self {
            Prediction::Regression { model_id, .. } | Prediction::Classification { model_id, .. } => model_id,
        }
    }

    pub fn task(&self) -> TaskType {
        match self {
            Prediction::Regression { .. } => TaskType::Regression,
            Prediction::Classification { .. } => TaskType::Classification,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Prediction::Regression { predictions, .. } => predictions.len(),
            Prediction::Classification { predictions, .. } => predictions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Feature contract of a stored pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureListing {
    pub model_id: String,
    pub model_type: TaskType,
    pub numeric_features: Vec<String>,
    pub categorical_features: Vec<String>,
    pub all_features: Vec<String>,
}

/// Pick the pipeline a request targets.
///
/// Single documents accept an omitted `model_type` but reject a mismatching
/// one; dual documents require it.
pub fn resolve_task(metadata: &ModelMetadata, requested: Option<TaskType>) -> Result<TaskType> {
    match (metadata, requested) {
        (ModelMetadata::Single { model, .. }, None) => Ok(model.task()),
        (ModelMetadata::Single { model, model_id, .. }, Some(task)) => {
            if model.task() == task {
                Ok(task)
            } else {
                Err(ModelHubError::ValidationError(format!(
                    "model '{}' is a {} model, but model_type '{}' was requested",
                    model_id,
                    model.task(),
                    task
                )))
            }
        }
        (ModelMetadata::Dual { model_id, .. }, None) => Err(ModelHubError::ValidationError(format!(
            "model '{}' is a dual model; model_type must be 'regression' or 'classification'",
            model_id
        ))),
        (ModelMetadata::Dual { .. }, Some(task)) => Ok(task),
    }
}

/// Predicts against models held in a `ModelRegistry`
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    registry: ModelRegistry,
}

impl InferenceEngine {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Predict one row
    pub fn predict(&self, model_id: &str, row: &FeatureRow, model_type: Option<TaskType>) -> Result<Prediction> {
        self.predict_rows(model_id, std::slice::from_ref(row), model_type)
    }

    /// Predict several rows with the same model.
    ///
    /// The request is validated against the recorded feature set before any
    /// artifact is read.
    pub fn predict_rows(
        &self,
        model_id: &str,
        rows: &[FeatureRow],
        model_type: Option<TaskType>,
    ) -> Result<Prediction> {
        let metadata = self.registry.read_metadata(model_id)?;
        let task = resolve_task(&metadata, model_type)?;
        let frame = rows_to_frame(rows, recorded_features(&metadata, task)?)?;

        let loaded = self.registry.load(model_id)?;
        debug!(model_id = %model_id, task = %task, n_rows = frame.n_rows(), "Dispatching prediction");
        predict_loaded(&loaded, task, &frame)
    }

    /// Feature contract of the pipeline `model_type` resolves to
    pub fn features(&self, model_id: &str, model_type: Option<TaskType>) -> Result<FeatureListing> {
        let metadata = self.registry.read_metadata(model_id)?;
        let task = resolve_task(&metadata, model_type)?;
        let feature_set = recorded_features(&metadata, task)?;
        Ok(FeatureListing {
            model_id: model_id.to_string(),
            model_type: task,
            numeric_features: feature_set.numeric_features.clone(),
            categorical_features: feature_set.categorical_features.clone(),
            all_features: feature_set.all_features(),
        })
    }
}

fn recorded_features(metadata: &ModelMetadata, task: TaskType) -> Result<&FeatureSet> {
    metadata.feature_set(task).ok_or_else(|| {
        ModelHubError::ValidationError(format!(
            "model '{}' has no {} pipeline",
            metadata.model_id(),
            task
        ))
    })
}

/// Run `frame` through the `task` pipeline of an already loaded model
pub fn predict_loaded(loaded: &LoadedModel, task: TaskType, frame: &FeatureFrame) -> Result<Prediction> {
    let model_id = loaded.metadata.model_id().to_string();
    let context = format!("predicting with model '{}'", model_id);

    match task {
        TaskType::Regression => {
            let pipeline = loaded.regression.as_ref().ok_or_else(|| {
                ModelHubError::ValidationError(format!("model '{}' has no regression pipeline", model_id))
            })?;
            let predictions = pipeline
                .predict(frame)
                .map_err(|e| ModelHubError::inference(context, e))?
                .to_vec();
            Ok(Prediction::Regression {
                model_id,
                predictions,
            })
        }
        TaskType::Classification => {
            let classifier = loaded.classification.as_ref().ok_or_else(|| {
                ModelHubError::ValidationError(format!("model '{}' has no classification pipeline", model_id))
            })?;
            let codes: Vec<usize> = classifier
                .pipeline
                .predict(frame)
                .map_err(|e| ModelHubError::inference(context.clone(), e))?
                .iter()
                .map(|&c| c as usize)
                .collect();
            let predictions = classifier
                .encoder
                .decode(&codes)
                .map_err(|e| ModelHubError::inference(context.clone(), e))?;
            let probabilities = classifier
                .pipeline
                .predict_proba(frame)
                .map_err(|e| ModelHubError::inference(context, e))?
                .map(|p| p.rows().into_iter().map(|row| row.to_vec()).collect());

            Ok(Prediction::Classification {
                model_id,
                predictions,
                probabilities,
                classes: recorded_classes(&loaded.metadata),
            })
        }
    }
}

fn recorded_classes(metadata: &ModelMetadata) -> Vec<String> {
    match metadata {
        ModelMetadata::Single { model: ModelRecord::Classification(c), .. } => c.classes.clone(),
        ModelMetadata::Dual { classification, .. } => classification.classes.clone(),
        ModelMetadata::Single { .. } => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{train_classification, TrainingConfig};
    use polars::prelude::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn engine_with_classifier(dir: &TempDir) -> (InferenceEngine, String) {
        let df = df!(
            "price" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
            "city" => &["a", "b", "a", "b", "a", "b", "a", "b", "a", "b"],
            "label" => &["lo", "lo", "lo", "lo", "lo", "hi", "hi", "hi", "hi", "hi"]
        )
        .unwrap();
        let result = train_classification(&df, &TrainingConfig::new("label").with_algorithm("knn")).unwrap();
        let registry = ModelRegistry::open(dir.path()).unwrap();
        let id = registry.persist_classification(&result).unwrap().model_id().to_string();
        (InferenceEngine::new(registry), id)
    }

    fn row(price: serde_json::Value, city: &str) -> FeatureRow {
        [("price".to_string(), price), ("city".to_string(), json!(city))]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_single_classifier_prediction() {
        let dir = TempDir::new().unwrap();
        let (engine, id) = engine_with_classifier(&dir);

        match engine.predict(&id, &row(json!(9.5), "a"), None).unwrap() {
            Prediction::Classification { predictions, probabilities, classes, .. } => {
                assert_eq!(predictions, vec!["hi"]);
                assert_eq!(classes, vec!["hi", "lo"]);
                let p = &probabilities.unwrap()[0];
                assert_eq!(p.len(), 2);
                assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            }
            other => panic!("unexpected prediction {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_model_type_rejected() {
        let dir = TempDir::new().unwrap();
        let (engine, id) = engine_with_classifier(&dir);
        let err = engine
            .predict(&id, &row(json!(1.0), "a"), Some(TaskType::Regression))
            .unwrap_err();
        assert!(matches!(err, ModelHubError::ValidationError(_)));
    }

    #[test]
    fn test_unknown_category_still_predicts() {
        let dir = TempDir::new().unwrap();
        let (engine, id) = engine_with_classifier(&dir);
        let prediction = engine.predict(&id, &row(json!(2.0), "zzz"), None).unwrap();
        assert_eq!(prediction.len(), 1);
    }

    #[test]
    fn test_feature_listing() {
        let dir = TempDir::new().unwrap();
        let (engine, id) = engine_with_classifier(&dir);
        let listing = engine.features(&id, None).unwrap();
        assert_eq!(listing.model_type, TaskType::Classification);
        assert_eq!(listing.all_features, vec!["price", "city"]);
    }
}
