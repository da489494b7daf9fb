//! Fitted preprocessing + estimator unit, the persisted artifact

use super::algorithms::AlgorithmSpec;
use super::config::{TaskType, TrainingConfig};
use super::estimator::Estimator;
use crate::error::Result;
use crate::preprocessing::{FeatureFrame, FeaturePreprocessor, FeatureSet};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A preprocessor and the estimator fitted on its output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedPipeline {
    pub task: TaskType,
    pub preprocessor: FeaturePreprocessor,
    pub estimator: Estimator,
}

impl TrainedPipeline {
    pub fn new(task: TaskType, preprocessor: FeaturePreprocessor, estimator: Estimator) -> Self {
        Self {
            task,
            preprocessor,
            estimator,
        }
    }

    /// Fit a fresh preprocessor on `train_frame`, then the estimator built from
    /// `spec` on the transformed rows.
    pub fn fit(
        spec: &AlgorithmSpec,
        feature_set: FeatureSet,
        train_frame: &FeatureFrame,
        y_train: &Array1<f64>,
        n_classes: usize,
        config: &TrainingConfig,
    ) -> Result<Self> {
        let mut preprocessor =
            FeaturePreprocessor::with_missing_category(feature_set, &config.missing_category);
        let x_train = preprocessor.fit_transform(train_frame)?;

        let mut estimator = spec.build(n_classes, config.random_state);
        estimator.fit(&x_train, y_train)?;

        debug!(
            estimator = estimator.name(),
            n_rows = x_train.nrows(),
            n_features = x_train.ncols(),
            "Fitted estimator"
        );
        Ok(Self::new(spec.task, preprocessor, estimator))
    }

    pub fn feature_set(&self) -> &FeatureSet {
        self.preprocessor.feature_set()
    }

    /// Transform and predict. Classifiers return class codes.
    pub fn predict(&self, frame: &FeatureFrame) -> Result<Array1<f64>> {
        let x = self.preprocessor.transform(frame)?;
        self.estimator.predict(&x)
    }

    /// Transform and return class probabilities when the estimator has them
    pub fn predict_proba(&self, frame: &FeatureFrame) -> Result<Option<Array2<f64>>> {
        let x = self.preprocessor.transform(frame)?;
        self.estimator.predict_proba(&x)
    }

    /// Serialize with bincode
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bincode
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::linear_models::LinearRegression;
    use polars::prelude::*;

    #[test]
    fn test_pipeline_bytes_preserve_predictions() {
        let df = df!(
            "size" => &[1.0, 2.0, 3.0, 4.0, 5.0],
            "zone" => &["a", "b", "a", "b", "a"],
            "price" => &[10.0, 25.0, 30.0, 45.0, 50.0]
        )
        .unwrap();
        let fs = FeatureSet::from_table(&df, "price").unwrap();
        let frame = FeatureFrame::from_table(&df, &fs).unwrap();

        let mut pre = FeaturePreprocessor::new(fs);
        let x = pre.fit_transform(&frame).unwrap();
        let mut est = Estimator::LinearRegression(LinearRegression::new());
        est.fit(&x, &Array1::from_vec(vec![10.0, 25.0, 30.0, 45.0, 50.0])).unwrap();

        let pipeline = TrainedPipeline::new(TaskType::Regression, pre, est);
        let restored = TrainedPipeline::from_bytes(&pipeline.to_bytes().unwrap()).unwrap();

        assert_eq!(restored.task, TaskType::Regression);
        assert_eq!(pipeline.predict(&frame).unwrap(), restored.predict(&frame).unwrap());
    }

    #[test]
    fn test_corrupt_bytes_are_serialization_errors() {
        let err = TrainedPipeline::from_bytes(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, crate::error::ModelHubError::SerializationError(_)));
    }
}
