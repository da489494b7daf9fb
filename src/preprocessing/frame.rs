//! Typed view over the feature columns of a table

use super::FeatureSet;
use crate::error::{ModelHubError, Result};
use crate::table;
use polars::prelude::*;

/// Values of one feature column, nulls preserved
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, indices: &[usize]) -> Self {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Categorical(v) => {
                ColumnData::Categorical(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

/// Feature columns extracted from a table according to a `FeatureSet`.
///
/// Numeric features come first, then categorical ones, each in feature-set order.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    n_rows: usize,
    columns: Vec<(String, ColumnData)>,
}

impl FeatureFrame {
    /// Extract the features of `feature_set` from `df`.
    ///
    /// Numeric features must have numeric storage; categorical features are
    /// rendered as text.
    pub fn from_table(df: &DataFrame, feature_set: &FeatureSet) -> Result<Self> {
        let mut columns = Vec::with_capacity(feature_set.len());

        for name in &feature_set.numeric_features {
            columns.push((name.clone(), ColumnData::Numeric(table::numeric_values(df, name)?)));
        }
        for name in &feature_set.categorical_features {
            columns.push((name.clone(), ColumnData::Categorical(table::text_values(df, name)?)));
        }

        Ok(Self {
            n_rows: df.height(),
            columns,
        })
    }

    /// Assemble a frame from prebuilt columns of equal length
    pub fn from_columns(columns: Vec<(String, ColumnData)>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, |(_, data)| data.len());
        if let Some((name, data)) = columns.iter().find(|(_, data)| data.len() != n_rows) {
            return Err(ModelHubError::ShapeError {
                expected: format!("{} rows", n_rows),
                actual: format!("{} rows in column '{}'", data.len(), name),
            });
        }
        Ok(Self { n_rows, columns })
    }

    /// Rows at `indices`, in that order
    pub fn take(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_rows) {
            return Err(ModelHubError::DataError(format!(
                "row index {} out of bounds for {} rows",
                bad, self.n_rows
            )));
        }
        Ok(Self {
            n_rows: indices.len(),
            columns: self
                .columns
                .iter()
                .map(|(name, data)| (name.clone(), data.take(indices)))
                .collect(),
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn columns(&self) -> &[(String, ColumnData)] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
        match self.column(name) {
            Some(ColumnData::Numeric(v)) => Some(v),
            _ => None,
        }
    }

    pub fn categorical(&self, name: &str) -> Option<&[Option<String>]> {
        match self.column(name) {
            Some(ColumnData::Categorical(v)) => Some(v),
            _ => None,
        }
    }
}
