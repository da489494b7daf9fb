//! Regression training pipeline

use super::algorithms::{resolve, AlgorithmKind, FallbackPolicy, Hyperparams};
use super::config::{TaskType, TrainingConfig};
use super::metrics::RegressionMetrics;
use super::pipeline::TrainedPipeline;
use super::split::train_test_split;
use crate::error::{ModelHubError, Result};
use crate::preprocessing::{FeatureFrame, FeatureSet};
use crate::table;
use ndarray::Array1;
use polars::prelude::*;
use tracing::info;

/// Outcome of a regression training run
#[derive(Debug, Clone)]
pub struct RegressionResult {
    pub target_col: String,
    pub algorithm: AlgorithmKind,
    pub hyperparameters: Hyperparams,
    pub feature_set: FeatureSet,
    pub metrics: RegressionMetrics,
    pub n_samples_train: usize,
    pub n_samples_test: usize,
    /// First test targets, bounded by the configured sample size
    pub y_test_sample: Vec<f64>,
    pub y_pred_sample: Vec<f64>,
    pub pipeline: TrainedPipeline,
}

/// Train a regression pipeline on `df` and evaluate it on a held-out split.
///
/// The target must be a numeric column without nulls, NaN or infinities.
pub fn train_regression(df: &DataFrame, config: &TrainingConfig) -> Result<RegressionResult> {
    config.validate()?;
    table::ensure_trainable(df)?;
    let target = table::resolve_column(df, &config.target_column, "target", config.max_listed_columns)?;
    let spec = resolve(
        &config.algorithm,
        TaskType::Regression,
        config.params.as_ref(),
        FallbackPolicy::Strict,
    )?;

    let y_all = regression_target(df, &target)?;
    let feature_set = FeatureSet::from_table(df, &target)?;
    let frame = FeatureFrame::from_table(df, &feature_set)?;
    let split = train_test_split(df.height(), config.test_size, config.random_state)?;

    info!(
        task = "regression",
        algorithm = %spec.kind,
        target = %target,
        n_train = split.train.len(),
        n_test = split.test.len(),
        "Training pipeline"
    );

    let train_frame = frame.take(&split.train)?;
    let test_frame = frame.take(&split.test)?;
    let y_train: Array1<f64> = split.train.iter().map(|&i| y_all[i]).collect();
    let y_test: Array1<f64> = split.test.iter().map(|&i| y_all[i]).collect();

    let pipeline = TrainedPipeline::fit(&spec, feature_set.clone(), &train_frame, &y_train, 0, config)
        .map_err(|e| ModelHubError::training(format!("fitting {} regressor", spec.kind), e))?;

    let y_pred = pipeline
        .predict(&test_frame)
        .map_err(|e| ModelHubError::training("evaluating on the test split", e))?;
    let metrics = RegressionMetrics::compute(&y_test, &y_pred);

    info!(
        task = "regression",
        algorithm = %spec.kind,
        r2 = metrics.r2,
        rmse = metrics.rmse,
        "Training finished"
    );

    Ok(RegressionResult {
        target_col: target,
        algorithm: spec.kind,
        hyperparameters: spec.hyperparameters,
        feature_set,
        metrics,
        n_samples_train: split.train.len(),
        n_samples_test: split.test.len(),
        y_test_sample: y_test.iter().take(config.sample_size).copied().collect(),
        y_pred_sample: y_pred.iter().take(config.sample_size).copied().collect(),
        pipeline,
    })
}

fn regression_target(df: &DataFrame, target: &str) -> Result<Vec<f64>> {
    let column = df.column(target)?;
    if !table::is_numeric_dtype(column.dtype()) {
        return Err(ModelHubError::ConfigError(format!(
            "regression target '{}' must be numeric, found type {}",
            target,
            column.dtype()
        )));
    }
    table::numeric_values(df, target)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                ModelHubError::ConfigError(format!(
                    "regression target '{}' has a missing or non-finite value at row {}",
                    target, row
                ))
            })
        })
        .collect()
}
