//! Fitted feature preprocessing: impute, scale, one-hot encode

use super::{
    ColumnData, FeatureFrame, FeatureSet, ImputeStrategy, Imputer, OneHotEncoder, Scaler,
    DEFAULT_MISSING_CATEGORY,
};
use crate::error::{ModelHubError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Preprocessing transform bound to the feature set it was built for.
///
/// Output columns are the scaled numeric features in feature-set order,
/// followed by one block of one-hot columns per categorical feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePreprocessor {
    feature_set: FeatureSet,
    numeric_imputer: Imputer,
    categorical_imputer: Imputer,
    scaler: Scaler,
    encoder: OneHotEncoder,
    is_fitted: bool,
}

impl FeaturePreprocessor {
    /// Create an unfitted preprocessor with the default missing-category sentinel
    pub fn new(feature_set: FeatureSet) -> Self {
        Self::with_missing_category(feature_set, DEFAULT_MISSING_CATEGORY)
    }

    pub fn with_missing_category(feature_set: FeatureSet, missing_category: &str) -> Self {
        Self {
            feature_set,
            numeric_imputer: Imputer::new(ImputeStrategy::Median),
            categorical_imputer: Imputer::new(ImputeStrategy::ConstantString(
                missing_category.to_string(),
            )),
            scaler: Scaler::new(),
            encoder: OneHotEncoder::new(),
            is_fitted: false,
        }
    }

    /// Fit on the training rows
    pub fn fit(&mut self, frame: &FeatureFrame) -> Result<&mut Self> {
        self.numeric_imputer
            .fit(frame, &self.feature_set.numeric_features)?;
        self.categorical_imputer
            .fit(frame, &self.feature_set.categorical_features)?;

        for name in &self.feature_set.numeric_features {
            let values = Self::numeric_column(frame, name)?;
            let imputed = self.numeric_imputer.fill_numeric(name, values)?;
            self.scaler.fit_column(name, &imputed);
        }
        for name in &self.feature_set.categorical_features {
            let values = Self::categorical_column(frame, name)?;
            let imputed = self.categorical_imputer.fill_categorical(name, values)?;
            self.encoder.fit_column(name, &imputed);
        }

        self.is_fitted = true;
        debug!(
            n_rows = frame.n_rows(),
            n_outputs = self.n_output_features(),
            "Fitted feature preprocessor"
        );
        Ok(self)
    }

    /// Transform rows into the model matrix
    pub fn transform(&self, frame: &FeatureFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ModelHubError::ModelNotFitted);
        }

        let n_rows = frame.n_rows();
        let n_cols = self.n_output_features();
        let mut out = Array2::<f64>::zeros((n_rows, n_cols));
        let mut offset = 0;

        for name in &self.feature_set.numeric_features {
            let values = Self::numeric_column(frame, name)?;
            let mut filled = self.numeric_imputer.fill_numeric(name, values)?;
            self.scaler.transform_column(name, &mut filled)?;
            for (i, v) in filled.into_iter().enumerate() {
                out[[i, offset]] = v;
            }
            offset += 1;
        }

        for name in &self.feature_set.categorical_features {
            let values = Self::categorical_column(frame, name)?;
            let filled = self.categorical_imputer.fill_categorical(name, values)?;
            let hot = self.encoder.transform_column(name, &filled)?;
            for (i, idx) in hot.into_iter().enumerate() {
                if let Some(j) = idx {
                    out[[i, offset + j]] = 1.0;
                }
            }
            offset += self.encoder.width(name);
        }

        Ok(out)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, frame: &FeatureFrame) -> Result<Array2<f64>> {
        self.fit(frame)?;
        self.transform(frame)
    }

    fn numeric_column<'a>(frame: &'a FeatureFrame, name: &str) -> Result<&'a [Option<f64>]> {
        match frame.column(name) {
            Some(ColumnData::Numeric(v)) => Ok(v),
            Some(ColumnData::Categorical(_)) => Err(ModelHubError::DataError(format!(
                "feature '{}' must be numeric",
                name
            ))),
            None => Err(ModelHubError::DataError(format!("feature '{}' not found", name))),
        }
    }

    fn categorical_column<'a>(frame: &'a FeatureFrame, name: &str) -> Result<&'a [Option<String>]> {
        match frame.column(name) {
            Some(ColumnData::Categorical(v)) => Ok(v),
            Some(ColumnData::Numeric(_)) => Err(ModelHubError::DataError(format!(
                "feature '{}' must be categorical",
                name
            ))),
            None => Err(ModelHubError::DataError(format!("feature '{}' not found", name))),
        }
    }

    pub fn feature_set(&self) -> &FeatureSet {
        &self.feature_set
    }

    /// Names of the output columns
    pub fn output_feature_names(&self) -> Vec<String> {
        let mut names = self.feature_set.numeric_features.clone();
        for name in &self.feature_set.categorical_features {
            names.extend(self.encoder.feature_names(name));
        }
        names
    }

    pub fn n_output_features(&self) -> usize {
        self.feature_set.numeric_features.len()
            + self
                .feature_set
                .categorical_features
                .iter()
                .map(|c| self.encoder.width(c))
                .sum::<usize>()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn train_df() -> DataFrame {
        df!(
            "price" => &[Some(10.0), Some(20.0), None, Some(30.0)],
            "city" => &[Some("NYC"), Some("LA"), Some("NYC"), None],
            "delivered" => &[true, false, true, true]
        )
        .unwrap()
    }

    fn fitted() -> (FeaturePreprocessor, FeatureSet) {
        let df = train_df();
        let fs = FeatureSet::from_table(&df, "delivered").unwrap();
        let frame = FeatureFrame::from_table(&df, &fs).unwrap();
        let mut pre = FeaturePreprocessor::new(fs.clone());
        pre.fit(&frame).unwrap();
        (pre, fs)
    }

    #[test]
    fn test_output_layout() {
        let (pre, _) = fitted();
        assert_eq!(
            pre.output_feature_names(),
            vec!["price", "city_LA", "city_NYC", "city_missing"]
        );
        assert_eq!(pre.n_output_features(), 4);
    }

    #[test]
    fn test_transform_training_rows() {
        let (pre, fs) = fitted();
        let frame = FeatureFrame::from_table(&train_df(), &fs).unwrap();
        let x = pre.transform(&frame).unwrap();

        assert_eq!(x.dim(), (4, 4));
        // Scaled price column has zero mean
        assert!(x.column(0).sum().abs() < 1e-9);
        // Null price imputed to the median, which equals the mean here
        assert!(x[[2, 0]].abs() < 1e-9);
        // Null city goes to the sentinel block
        assert_eq!(x.row(3).to_vec()[1..], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_unknown_category_is_all_zero() {
        let (pre, fs) = fitted();
        let df = df!(
            "price" => &[15.0],
            "city" => &["Boston"],
            "delivered" => &[true]
        )
        .unwrap();
        let frame = FeatureFrame::from_table(&df, &fs).unwrap();
        let x = pre.transform(&frame).unwrap();
        assert_eq!(x.row(0).to_vec()[1..], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unfitted_transform_fails() {
        let df = train_df();
        let fs = FeatureSet::from_table(&df, "delivered").unwrap();
        let frame = FeatureFrame::from_table(&df, &fs).unwrap();
        let pre = FeaturePreprocessor::new(fs);
        assert!(matches!(pre.transform(&frame), Err(ModelHubError::ModelNotFitted)));
    }
}
