//! Categorical encoding: one-hot for features, label encoding for targets

use crate::error::{ModelHubError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// One-hot encoder over string columns.
///
/// Categories are learned per column and kept sorted; a value not seen during
/// fitting encodes to an all-zero block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: Vec<(String, Vec<String>)>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn the categories of one column. Values must already be imputed.
    pub fn fit_column(&mut self, name: &str, values: &[String]) -> &mut Self {
        let cats: Vec<String> = values
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        match self.categories.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = cats,
            None => self.categories.push((name.to_string(), cats)),
        }
        self.is_fitted = true;
        self
    }

    /// Categories learned for `name`, sorted
    pub fn categories(&self, name: &str) -> Option<&[String]> {
        self.categories
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.as_slice())
    }

    /// Width of the encoded block for `name`
    pub fn width(&self, name: &str) -> usize {
        self.categories(name).map(|c| c.len()).unwrap_or(0)
    }

    /// Index of the hot position for each value; `None` for unknown categories
    pub fn transform_column(&self, name: &str, values: &[String]) -> Result<Vec<Option<usize>>> {
        if !self.is_fitted {
            return Err(ModelHubError::ModelNotFitted);
        }
        let cats = self.categories(name).ok_or_else(|| {
            ModelHubError::DataError(format!("encoder not fitted for column '{}'", name))
        })?;
        Ok(values
            .iter()
            .map(|v| cats.binary_search(v).ok())
            .collect())
    }

    /// Output names `<column>_<category>` for one column
    pub fn feature_names(&self, name: &str) -> Vec<String> {
        self.categories(name)
            .map(|cats| cats.iter().map(|c| format!("{}_{}", name, c)).collect())
            .unwrap_or_default()
    }
}

/// Maps class labels to contiguous integer codes and back.
///
/// Classes are sorted numerically when every label parses as a number,
/// lexicographically otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on every observed label
    pub fn fit(labels: &[String]) -> Result<Self> {
        if labels.is_empty() {
            return Err(ModelHubError::DataError(
                "cannot fit a label encoder on zero labels".to_string(),
            ));
        }
        let mut classes: Vec<String> = labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let numeric: Option<Vec<f64>> = classes.iter().map(|c| c.parse::<f64>().ok()).collect();
        if let Some(keys) = numeric {
            let mut paired: Vec<(f64, String)> = keys.into_iter().zip(classes).collect();
            paired.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            classes = paired.into_iter().map(|(_, c)| c).collect();
        }

        Ok(Self { classes })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Integer code of each label; unseen labels are an error
    pub fn encode(&self, labels: &[String]) -> Result<Vec<usize>> {
        labels
            .iter()
            .map(|label| {
                self.classes
                    .iter()
                    .position(|c| c == label)
                    .ok_or_else(|| ModelHubError::DataError(format!("unseen label '{}'", label)))
            })
            .collect()
    }

    /// Original label of each code
    pub fn decode(&self, codes: &[usize]) -> Result<Vec<String>> {
        codes
            .iter()
            .map(|&code| {
                self.classes.get(code).cloned().ok_or_else(|| {
                    ModelHubError::DataError(format!(
                        "class code {} out of range for {} classes",
                        code,
                        self.classes.len()
                    ))
                })
            })
            .collect()
    }
}
