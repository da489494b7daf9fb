//! Classification training pipeline

use super::algorithms::{resolve, AlgorithmKind, FallbackPolicy, Hyperparams};
use super::config::{TaskType, TrainingConfig};
use super::metrics::ClassificationMetrics;
use super::pipeline::TrainedPipeline;
use super::split::train_test_split;
use crate::error::{ModelHubError, Result};
use crate::preprocessing::{FeatureFrame, FeatureSet, LabelEncoder};
use crate::table;
use ndarray::Array1;
use polars::prelude::*;
use tracing::info;

/// Outcome of a classification training run
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub target_col: String,
    pub algorithm: AlgorithmKind,
    pub hyperparameters: Hyperparams,
    pub feature_set: FeatureSet,
    pub metrics: ClassificationMetrics,
    /// Every observed label, in encoder order
    pub classes: Vec<String>,
    pub n_samples_train: usize,
    pub n_samples_test: usize,
    pub y_test_sample: Vec<String>,
    pub y_pred_sample: Vec<String>,
    /// Probability rows for the sampled test rows, when the estimator has them
    pub y_proba_sample: Option<Vec<Vec<f64>>>,
    pub label_encoder: LabelEncoder,
    pub pipeline: TrainedPipeline,
}

impl ClassificationResult {
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

/// Train a classification pipeline, failing on unsupported algorithms
pub fn train_classification(df: &DataFrame, config: &TrainingConfig) -> Result<ClassificationResult> {
    train_classification_with_policy(df, config, FallbackPolicy::Strict)
}

/// Train a classification pipeline, resolving the algorithm under `policy`.
///
/// Target values are stringified; the label encoder is fit on all of them
/// before the split so train and test share one label space.
pub fn train_classification_with_policy(
    df: &DataFrame,
    config: &TrainingConfig,
    policy: FallbackPolicy,
) -> Result<ClassificationResult> {
    config.validate()?;
    table::ensure_trainable(df)?;
    let target = table::resolve_column(df, &config.target_column, "target", config.max_listed_columns)?;
    let spec = resolve(&config.algorithm, TaskType::Classification, config.params.as_ref(), policy)?;

    let labels = classification_target(df, &target)?;
    let label_encoder = LabelEncoder::fit(&labels)?;
    let codes = label_encoder.encode(&labels)?;
    let n_classes = label_encoder.n_classes();

    let feature_set = FeatureSet::from_table(df, &target)?;
    let frame = FeatureFrame::from_table(df, &feature_set)?;
    let split = train_test_split(df.height(), config.test_size, config.random_state)?;

    info!(
        task = "classification",
        algorithm = %spec.kind,
        target = %target,
        n_classes,
        n_train = split.train.len(),
        n_test = split.test.len(),
        "Training pipeline"
    );

    let train_frame = frame.take(&split.train)?;
    let test_frame = frame.take(&split.test)?;
    let y_train: Array1<f64> = split.train.iter().map(|&i| codes[i] as f64).collect();
    let y_test: Vec<usize> = split.test.iter().map(|&i| codes[i]).collect();

    let pipeline = TrainedPipeline::fit(&spec, feature_set.clone(), &train_frame, &y_train, n_classes, config)
        .map_err(|e| ModelHubError::training(format!("fitting {} classifier", spec.kind), e))?;

    let (y_pred, y_proba) = evaluate(&pipeline, &test_frame)
        .map_err(|e| ModelHubError::training("evaluating on the test split", e))?;
    let metrics = ClassificationMetrics::compute(&y_test, &y_pred, n_classes);

    info!(
        task = "classification",
        algorithm = %spec.kind,
        accuracy = metrics.accuracy,
        f1_macro = metrics.f1_macro,
        "Training finished"
    );

    let n = config.sample_size;
    let sample_test: Vec<usize> = y_test.iter().take(n).copied().collect();
    let sample_pred: Vec<usize> = y_pred.iter().take(n).copied().collect();
    let y_proba_sample = y_proba.map(|p| p.into_iter().take(n).collect());

    Ok(ClassificationResult {
        target_col: target,
        algorithm: spec.kind,
        hyperparameters: spec.hyperparameters,
        feature_set,
        metrics,
        classes: label_encoder.classes().to_vec(),
        n_samples_train: split.train.len(),
        n_samples_test: split.test.len(),
        y_test_sample: label_encoder.decode(&sample_test)?,
        y_pred_sample: label_encoder.decode(&sample_pred)?,
        y_proba_sample,
        label_encoder,
        pipeline,
    })
}

/// Predicted codes and, when available, probability rows
fn evaluate(pipeline: &TrainedPipeline, frame: &FeatureFrame) -> Result<(Vec<usize>, Option<Vec<Vec<f64>>>)> {
    let codes = pipeline.predict(frame)?.iter().map(|&c| c as usize).collect();
    let proba = pipeline
        .predict_proba(frame)?
        .map(|p| p.rows().into_iter().map(|row| row.to_vec()).collect());
    Ok((codes, proba))
}

fn classification_target(df: &DataFrame, target: &str) -> Result<Vec<String>> {
    // NaN renders as text, so numeric labels are checked on their numeric form
    let finite = if table::is_numeric_dtype(df.column(target)?.dtype()) {
        Some(table::numeric_values(df, target)?)
    } else {
        None
    };
    table::text_values(df, target)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.filter(|_| finite.as_ref().map_or(true, |f| f[row].is_some()))
                .ok_or_else(|| {
                    ModelHubError::ConfigError(format!(
                        "classification target '{}' has a missing value at row {}",
                        target, row
                    ))
                })
        })
        .collect()
}
