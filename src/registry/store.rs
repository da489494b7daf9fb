//! Filesystem-backed model registry

use super::id::{generate_model_id, is_valid_model_id};
use super::metadata::{ClassificationRecord, ModelMetadata, ModelRecord, RegressionRecord};
use crate::error::{ModelHubError, Result};
use crate::preprocessing::LabelEncoder;
use crate::training::{ClassificationResult, DualTrainingResult, RegressionResult, TaskType, TrainedPipeline};
use chrono::Utc;
use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

const METADATA_SUFFIX: &str = "_metadata.json";

fn metadata_file(model_id: &str) -> String {
    format!("{}{}", model_id, METADATA_SUFFIX)
}

fn pipeline_file(model_id: &str, task: TaskType) -> String {
    format!("{}_{}.bin", model_id, task.as_str())
}

fn encoder_file(model_id: &str) -> String {
    format!("{}_encoder.bin", model_id)
}

/// A classification pipeline with the label encoder it was trained with
#[derive(Debug, Clone)]
pub struct LoadedClassifier {
    pub pipeline: TrainedPipeline,
    pub encoder: LabelEncoder,
}

/// A stored model reconstructed from disk
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub metadata: ModelMetadata,
    pub regression: Option<TrainedPipeline>,
    pub classification: Option<LoadedClassifier>,
}

/// Directory of metadata documents and their binary artifacts.
///
/// Documents are written once and never updated in place.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    root: PathBuf,
}

impl ModelRegistry {
    /// Open the registry at `path`, creating the directory if needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist a single regression pipeline under a fresh identifier
    pub fn persist_regression(&self, result: &RegressionResult) -> Result<ModelMetadata> {
        let now = Utc::now();
        let model_id = generate_model_id(now);
        let artifact = pipeline_file(&model_id, TaskType::Regression);

        let metadata = ModelMetadata::Single {
            model_id: model_id.clone(),
            timestamp: Some(now),
            model: ModelRecord::Regression(RegressionRecord::from_result(result, artifact.clone())),
        };
        self.persist(&metadata, vec![(artifact, result.pipeline.to_bytes()?)])?;
        Ok(metadata)
    }

    /// Persist a single classification pipeline and its label encoder
    pub fn persist_classification(&self, result: &ClassificationResult) -> Result<ModelMetadata> {
        let now = Utc::now();
        let model_id = generate_model_id(now);
        let artifact = pipeline_file(&model_id, TaskType::Classification);
        let encoder = encoder_file(&model_id);

        let metadata = ModelMetadata::Single {
            model_id: model_id.clone(),
            timestamp: Some(now),
            model: ModelRecord::Classification(ClassificationRecord::from_result(
                result,
                artifact.clone(),
                encoder.clone(),
            )),
        };
        self.persist(
            &metadata,
            vec![
                (artifact, result.pipeline.to_bytes()?),
                (encoder, bincode::serialize(&result.label_encoder)?),
            ],
        )?;
        Ok(metadata)
    }

    /// Persist both pipelines of a dual run under one identifier
    pub fn persist_dual(&self, result: &DualTrainingResult) -> Result<ModelMetadata> {
        let now = Utc::now();
        let model_id = generate_model_id(now);
        let reg_artifact = pipeline_file(&model_id, TaskType::Regression);
        let clf_artifact = pipeline_file(&model_id, TaskType::Classification);
        let encoder = encoder_file(&model_id);

        let metadata = ModelMetadata::Dual {
            model_id: model_id.clone(),
            timestamp: Some(now),
            regression: RegressionRecord::from_result(&result.regression, reg_artifact.clone()),
            classification: ClassificationRecord::from_result(
                &result.classification,
                clf_artifact.clone(),
                encoder.clone(),
            ),
        };
        self.persist(
            &metadata,
            vec![
                (reg_artifact, result.regression.pipeline.to_bytes()?),
                (clf_artifact, result.classification.pipeline.to_bytes()?),
                (encoder, bincode::serialize(&result.classification.label_encoder)?),
            ],
        )?;
        Ok(metadata)
    }

    /// Write artifacts, then the metadata document that makes them visible
    fn persist(&self, metadata: &ModelMetadata, artifacts: Vec<(String, Vec<u8>)>) -> Result<()> {
        let model_id = metadata.model_id();
        let metadata_path = self.root.join(metadata_file(model_id));
        if metadata_path.exists() {
            return Err(ModelHubError::ConfigError(format!(
                "model '{}' already exists in the registry",
                model_id
            )));
        }
        if let Some(field) = metadata.first_non_finite() {
            return Err(ModelHubError::training(
                format!("persisting model '{}'", model_id),
                ModelHubError::ComputationError(format!("{} contains NaN or infinity", field)),
            ));
        }

        for (name, bytes) in &artifacts {
            self.write_atomic(name, bytes)?;
            debug!(model_id = %model_id, file = %name, bytes = bytes.len(), "Wrote artifact");
        }
        self.write_atomic(&metadata_file(model_id), &serde_json::to_vec_pretty(metadata)?)?;

        info!(model_id = %model_id, dual = metadata.is_dual(), "Persisted model");
        Ok(())
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let target = self.root.join(name);
        let tmp = self.root.join(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()));

        let write = || -> io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::rename(&tmp, &target)
        };
        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Read the metadata document of `model_id`
    pub fn read_metadata(&self, model_id: &str) -> Result<ModelMetadata> {
        if !is_valid_model_id(model_id) {
            return Err(ModelHubError::NotFound(format!("model '{}' not found", model_id)));
        }
        let path = self.root.join(metadata_file(model_id));
        let file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ModelHubError::NotFound(format!("model '{}' not found", model_id)),
            _ => e.into(),
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Reconstruct every pipeline and encoder `model_id` owns.
    ///
    /// A document whose artifacts are missing is reported as not found.
    pub fn load(&self, model_id: &str) -> Result<LoadedModel> {
        let metadata = self.read_metadata(model_id)?;
        for rel in metadata.artifact_paths() {
            if !self.root.join(rel).is_file() {
                return Err(ModelHubError::NotFound(format!(
                    "artifact '{}' of model '{}' is missing",
                    rel, model_id
                )));
            }
        }

        let (regression, classification) = match &metadata {
            ModelMetadata::Single { model: ModelRecord::Regression(r), .. } => {
                (Some(self.read_pipeline(&r.artifact_path, TaskType::Regression)?), None)
            }
            ModelMetadata::Single { model: ModelRecord::Classification(c), .. } => {
                (None, Some(self.read_classifier(c)?))
            }
            ModelMetadata::Dual { regression, classification, .. } => (
                Some(self.read_pipeline(&regression.artifact_path, TaskType::Regression)?),
                Some(self.read_classifier(classification)?),
            ),
        };

        debug!(model_id = %model_id, dual = metadata.is_dual(), "Loaded model");
        Ok(LoadedModel {
            metadata,
            regression,
            classification,
        })
    }

    fn read_pipeline(&self, rel: &str, task: TaskType) -> Result<TrainedPipeline> {
        let pipeline = TrainedPipeline::from_bytes(&fs::read(self.root.join(rel))?)?;
        if pipeline.task != task {
            return Err(ModelHubError::SerializationError(format!(
                "artifact '{}' holds a {} pipeline, expected {}",
                rel, pipeline.task, task
            )));
        }
        Ok(pipeline)
    }

    fn read_classifier(&self, record: &ClassificationRecord) -> Result<LoadedClassifier> {
        let pipeline = self.read_pipeline(&record.artifact_path, TaskType::Classification)?;
        let encoder: LabelEncoder = bincode::deserialize(&fs::read(self.root.join(&record.encoder_path))?)?;
        Ok(LoadedClassifier { pipeline, encoder })
    }

    /// Every readable metadata document, newest first; undated documents last.
    ///
    /// Documents that fail to parse are skipped with a warning.
    pub fn list_all(&self) -> Result<Vec<ModelMetadata>> {
        let mut documents = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_metadata = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.ends_with(METADATA_SUFFIX) && !n.starts_with('.'));
            if !is_metadata {
                continue;
            }

            match read_document(&path) {
                Ok(doc) => documents.push(doc),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable metadata"),
            }
        }

        documents.sort_by(|a, b| match (a.timestamp(), b.timestamp()) {
            (Some(ta), Some(tb)) => tb.cmp(&ta).then_with(|| b.model_id().cmp(a.model_id())),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.model_id().cmp(b.model_id()),
        });
        Ok(documents)
    }
}

fn read_document(path: &Path) -> Result<ModelMetadata> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{train_regression, TrainingConfig};
    use polars::prelude::*;
    use tempfile::TempDir;

    fn trained() -> RegressionResult {
        let df = df!(
            "size" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
            "price" => &[2.0, 4.1, 6.0, 8.2, 9.9, 12.0, 14.1, 16.0, 18.2, 20.0]
        )
        .unwrap();
        train_regression(&df, &TrainingConfig::new("price").with_algorithm("linreg")).unwrap()
    }

    fn write_doc(dir: &Path, id: &str, timestamp: Option<&str>) {
        let mut doc = serde_json::to_value(ModelMetadata::Single {
            model_id: id.to_string(),
            timestamp: None,
            model: ModelRecord::Regression(RegressionRecord::from_result(&trained(), "x.bin")),
        })
        .unwrap();
        if let Some(ts) = timestamp {
            doc["timestamp"] = serde_json::json!(ts);
        }
        fs::write(dir.join(metadata_file(id)), serde_json::to_vec(&doc).unwrap()).unwrap();
    }

    #[test]
    fn test_persist_then_load() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::open(dir.path()).unwrap();
        let result = trained();

        let metadata = registry.persist_regression(&result).unwrap();
        let id = metadata.model_id().to_string();
        assert!(dir.path().join(format!("{}_metadata.json", id)).is_file());
        assert!(dir.path().join(format!("{}_regression.bin", id)).is_file());

        let loaded = registry.load(&id).unwrap();
        assert_eq!(loaded.metadata, metadata);
        assert!(loaded.regression.is_some());
        assert!(loaded.classification.is_none());
    }

    #[test]
    fn test_non_finite_metrics_never_persisted() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::open(dir.path()).unwrap();
        let mut result = trained();
        result.metrics.r2 = f64::NAN;

        let err = registry.persist_regression(&result).unwrap_err();
        assert!(matches!(err, ModelHubError::Training { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unknown_id_not_found() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::open(dir.path()).unwrap();
        assert!(matches!(registry.load("nonexistent_id"), Err(ModelHubError::NotFound(_))));
        assert!(matches!(registry.load("../escape"), Err(ModelHubError::NotFound(_))));
    }

    #[test]
    fn test_missing_artifact_not_found() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::open(dir.path()).unwrap();
        let metadata = registry.persist_regression(&trained()).unwrap();
        fs::remove_file(dir.path().join(pipeline_file(metadata.model_id(), TaskType::Regression))).unwrap();

        let err = registry.load(metadata.model_id()).unwrap_err();
        assert!(matches!(err, ModelHubError::NotFound(_)));
        assert!(err.to_string().contains("_regression.bin"));
    }

    #[test]
    fn test_existing_document_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::open(dir.path()).unwrap();
        let metadata = registry.persist_regression(&trained()).unwrap();
        assert!(matches!(registry.persist(&metadata, vec![]), Err(ModelHubError::ConfigError(_))));
    }

    #[test]
    fn test_list_orders_newest_first_and_skips_garbage() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::open(dir.path()).unwrap();
        write_doc(dir.path(), "old", Some("2023-01-01T00:00:00Z"));
        write_doc(dir.path(), "undated", None);
        write_doc(dir.path(), "new", Some("2024-06-01T12:00:00Z"));
        fs::write(dir.path().join("broken_metadata.json"), b"{ not json").unwrap();

        let ids: Vec<String> = registry
            .list_all()
            .unwrap()
            .iter()
            .map(|m| m.model_id().to_string())
            .collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);
    }
}
