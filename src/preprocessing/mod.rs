//! Feature classification and preprocessing
//!
//! Provides the training-time preprocessing contract:
//! - Splitting non-target columns into numeric and categorical features
//! - Median imputation + standard scaling for numeric features
//! - Constant-sentinel imputation + one-hot encoding for categorical features
//!   (unknown categories encode to all zeros)
//! - Label encoding for classification targets

mod encoder;
mod frame;
mod imputer;
mod pipeline;
mod scaler;

pub use encoder::{LabelEncoder, OneHotEncoder};
pub use frame::{ColumnData, FeatureFrame};
pub use imputer::{ImputeStrategy, ImputeValue, Imputer};
pub use pipeline::FeaturePreprocessor;
pub use scaler::Scaler;

use crate::error::{ModelHubError, Result};
use crate::table;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Sentinel category used for missing categorical values
pub const DEFAULT_MISSING_CATEGORY: &str = "missing";

/// Column data type for preprocessing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Categorical,
}

impl ColumnType {
    /// Classify a polars dtype. Integer and float storage is numeric,
    /// everything else (booleans, strings, dates) is categorical.
    pub fn of(dtype: &DataType) -> Self {
        if table::is_numeric_dtype(dtype) {
            ColumnType::Numeric
        } else {
            ColumnType::Categorical
        }
    }
}

/// Partition of the non-target columns recorded at training time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FeatureSet {
    pub numeric_features: Vec<String>,
    pub categorical_features: Vec<String>,
}

impl FeatureSet {
    /// Derive the feature set of `df` excluding `target_col`, in table order
    pub fn from_table(df: &DataFrame, target_col: &str) -> Result<Self> {
        if df.column(target_col).is_err() {
            return Err(ModelHubError::ConfigError(format!(
                "target column '{}' not found; available columns: {}",
                target_col,
                table::available_columns_hint(df, 10)
            )));
        }

        let mut feature_set = FeatureSet::default();
        for column in df.get_columns() {
            let name = column.name().to_string();
            if name == target_col {
                continue;
            }
            match ColumnType::of(column.dtype()) {
                ColumnType::Numeric => feature_set.numeric_features.push(name),
                ColumnType::Categorical => feature_set.categorical_features.push(name),
            }
        }

        if feature_set.is_empty() {
            return Err(ModelHubError::ConfigError(format!(
                "no feature columns left after excluding target '{}'",
                target_col
            )));
        }
        Ok(feature_set)
    }

    /// All feature names, numeric first then categorical
    pub fn all_features(&self) -> Vec<String> {
        self.numeric_features
            .iter()
            .chain(self.categorical_features.iter())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.numeric_features.len() + self.categorical_features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Declared type of a feature, if it belongs to this set
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        if self.numeric_features.iter().any(|c| c == name) {
            Some(ColumnType::Numeric)
        } else if self.categorical_features.iter().any(|c| c == name) {
            Some(ColumnType::Categorical)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn create_test_dataframe() -> DataFrame {
        df!(
            "price" => &[10.5, 20.0, 30.25, 12.0],
            "quantity" => &[1i64, 2, 3, 4],
            "city" => &["NYC", "LA", "NYC", "SF"],
            "express" => &[true, false, false, true],
            "delivered" => &[true, false, true, true]
        )
        .unwrap()
    }

    #[test]
    fn test_feature_set_partitions_columns() {
        let df = create_test_dataframe();
        let fs = FeatureSet::from_table(&df, "delivered").unwrap();

        assert_eq!(fs.numeric_features, vec!["price", "quantity"]);
        assert_eq!(fs.categorical_features, vec!["city", "express"]);

        let numeric: HashSet<_> = fs.numeric_features.iter().collect();
        let categorical: HashSet<_> = fs.categorical_features.iter().collect();
        assert!(numeric.is_disjoint(&categorical));

        let union: HashSet<String> = fs.all_features().into_iter().collect();
        let expected: HashSet<String> = ["price", "quantity", "city", "express"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(union, expected);
    }

    #[test]
    fn test_target_may_be_numeric() {
        let df = create_test_dataframe();
        let fs = FeatureSet::from_table(&df, "price").unwrap();
        assert_eq!(fs.numeric_features, vec!["quantity"]);
        assert_eq!(fs.categorical_features, vec!["city", "express", "delivered"]);
    }

    #[test]
    fn test_missing_target_is_config_error() {
        let df = create_test_dataframe();
        let err = FeatureSet::from_table(&df, "weight").unwrap_err();
        assert!(matches!(err, ModelHubError::ConfigError(_)));
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn test_column_type_serialize() {
        let json = serde_json::to_string(&ColumnType::Numeric).unwrap();
        assert_eq!(json, "\"numeric\"");
    }
}
