//! Missing value imputation

use super::{ColumnData, FeatureFrame};
use crate::error::{ModelHubError, Result};
use serde::{Deserialize, Serialize};

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the training median (numeric only)
    Median,
    /// Replace with a constant string (categorical only)
    ConstantString(String),
}

/// Learned fill value for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeValue {
    Numeric(f64),
    String(String),
}

/// Imputer for handling missing values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: Vec<(String, ImputeValue)>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: Vec::new(),
            is_fitted: false,
        }
    }

    /// Learn one fill value per named column of `frame`
    pub fn fit(&mut self, frame: &FeatureFrame, columns: &[String]) -> Result<&mut Self> {
        self.fill_values.clear();
        for name in columns {
            let data = frame
                .column(name)
                .ok_or_else(|| ModelHubError::DataError(format!("column '{}' not found", name)))?;
            let fill = self.compute_fill_value(name, data)?;
            self.fill_values.push((name.clone(), fill));
        }
        self.is_fitted = true;
        Ok(self)
    }

    fn compute_fill_value(&self, name: &str, data: &ColumnData) -> Result<ImputeValue> {
        match (&self.strategy, data) {
            (ImputeStrategy::Median, ColumnData::Numeric(values)) => {
                let present: Vec<f64> = values.iter().flatten().copied().collect();
                // An all-null training column imputes to zero
                Ok(ImputeValue::Numeric(median(present).unwrap_or(0.0)))
            }
            (ImputeStrategy::ConstantString(s), ColumnData::Categorical(_)) => {
                Ok(ImputeValue::String(s.clone()))
            }
            (strategy, _) => Err(ModelHubError::DataError(format!(
                "imputation strategy {:?} does not apply to column '{}'",
                strategy, name
            ))),
        }
    }

    /// Fill value learned for `name`
    pub fn fill_value(&self, name: &str) -> Option<&ImputeValue> {
        self.fill_values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Numeric column with nulls replaced
    pub fn fill_numeric(&self, name: &str, values: &[Option<f64>]) -> Result<Vec<f64>> {
        if !self.is_fitted {
            return Err(ModelHubError::ModelNotFitted);
        }
        match self.fill_value(name) {
            Some(ImputeValue::Numeric(fill)) => {
                Ok(values.iter().map(|v| v.unwrap_or(*fill)).collect())
            }
            _ => Err(ModelHubError::DataError(format!(
                "no numeric fill value for column '{}'",
                name
            ))),
        }
    }

    /// Categorical column with nulls replaced
    pub fn fill_categorical(&self, name: &str, values: &[Option<String>]) -> Result<Vec<String>> {
        if !self.is_fitted {
            return Err(ModelHubError::ModelNotFitted);
        }
        match self.fill_value(name) {
            Some(ImputeValue::String(fill)) => Ok(values
                .iter()
                .map(|v| v.clone().unwrap_or_else(|| fill.clone()))
                .collect()),
            _ => Err(ModelHubError::DataError(format!(
                "no categorical fill value for column '{}'",
                name
            ))),
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::FeatureSet;
    use polars::prelude::*;

    fn frame() -> FeatureFrame {
        let df = df!(
            "a" => &[Some(1.0), None, Some(3.0), Some(10.0)],
            "c" => &[Some("x"), None, Some("y"), Some("x")],
            "t" => &[1.0, 2.0, 3.0, 4.0]
        )
        .unwrap();
        let fs = FeatureSet::from_table(&df, "t").unwrap();
        FeatureFrame::from_table(&df, &fs).unwrap()
    }

    #[test]
    fn test_median_imputation() {
        let frame = frame();
        let mut imputer = Imputer::new(ImputeStrategy::Median);
        imputer.fit(&frame, &["a".to_string()]).unwrap();

        assert_eq!(imputer.fill_value("a"), Some(&ImputeValue::Numeric(3.0)));
        let filled = imputer.fill_numeric("a", frame.numeric("a").unwrap()).unwrap();
        assert_eq!(filled, vec![1.0, 3.0, 3.0, 10.0]);
    }

    #[test]
    fn test_constant_string_imputation() {
        let frame = frame();
        let mut imputer = Imputer::new(ImputeStrategy::ConstantString("missing".to_string()));
        imputer.fit(&frame, &["c".to_string()]).unwrap();

        let filled = imputer.fill_categorical("c", frame.categorical("c").unwrap()).unwrap();
        assert_eq!(filled, vec!["x", "missing", "y", "x"]);
    }

    #[test]
    fn test_strategy_mismatch() {
        let frame = frame();
        let mut imputer = Imputer::new(ImputeStrategy::Median);
        assert!(imputer.fit(&frame, &["c".to_string()]).is_err());
    }

    #[test]
    fn test_unfitted() {
        let imputer = Imputer::new(ImputeStrategy::Median);
        assert!(matches!(
            imputer.fill_numeric("a", &[None]),
            Err(ModelHubError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_median_helper() {
        assert_eq!(median(vec![]), None);
        assert_eq!(median(vec![4.0, 1.0]), Some(2.5));
    }
}
