//! Feature rows supplied at inference time

use crate::error::{ModelHubError, Result};
use crate::preprocessing::{ColumnData, FeatureFrame, FeatureSet};
use serde_json::Value;
use std::collections::BTreeMap;

/// One inference row: feature name to scalar value.
///
/// `null` marks a missing value and goes through the fitted imputers.
pub type FeatureRow = BTreeMap<String, Value>;

/// Check `rows` against the recorded feature set and assemble the frame the
/// stored preprocessor expects.
///
/// Missing or unexpected columns and non-scalar values are validation errors.
/// A non-numeric value for a numeric feature is an inference error.
pub fn rows_to_frame(rows: &[FeatureRow], feature_set: &FeatureSet) -> Result<FeatureFrame> {
    if rows.is_empty() {
        return Err(ModelHubError::ValidationError(
            "at least one feature row is required".to_string(),
        ));
    }
    for (i, row) in rows.iter().enumerate() {
        check_columns(i, row, feature_set)?;
    }

    let mut columns = Vec::with_capacity(feature_set.len());
    for name in &feature_set.numeric_features {
        let values = rows
            .iter()
            .enumerate()
            .map(|(i, row)| numeric_cell(i, name, &row[name]))
            .collect::<Result<Vec<_>>>()?;
        columns.push((name.clone(), ColumnData::Numeric(values)));
    }
    for name in &feature_set.categorical_features {
        let values = rows
            .iter()
            .map(|row| categorical_cell(&row[name]))
            .collect();
        columns.push((name.clone(), ColumnData::Categorical(values)));
    }

    FeatureFrame::from_columns(columns)
}

fn check_columns(index: usize, row: &FeatureRow, feature_set: &FeatureSet) -> Result<()> {
    let expected = feature_set.all_features();
    let missing: Vec<&str> = expected
        .iter()
        .filter(|name| !row.contains_key(name.as_str()))
        .map(String::as_str)
        .collect();
    let extra: Vec<&str> = row
        .keys()
        .filter(|key| feature_set.column_type(key).is_none())
        .map(String::as_str)
        .collect();

    if !missing.is_empty() || !extra.is_empty() {
        let mut problems = Vec::new();
        if !missing.is_empty() {
            problems.push(format!("missing features [{}]", missing.join(", ")));
        }
        if !extra.is_empty() {
            problems.push(format!("unexpected features [{}]", extra.join(", ")));
        }
        return Err(ModelHubError::ValidationError(format!(
            "row {}: {}; expected [{}]",
            index,
            problems.join(", "),
            expected.join(", ")
        )));
    }

    if let Some((name, _)) = row
        .iter()
        .find(|(_, v)| matches!(v, Value::Array(_) | Value::Object(_)))
    {
        return Err(ModelHubError::ValidationError(format!(
            "row {}: feature '{}' must be a scalar value",
            index, name
        )));
    }
    Ok(())
}

fn numeric_cell(index: usize, name: &str, value: &Value) -> Result<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v.is_finite() => Ok(Some(v)),
            Some(_) => Ok(None),
            None => Err(ModelHubError::inference(
                format!("row {}", index),
                ModelHubError::DataError(format!("feature '{}' is not representable as f64", name)),
            )),
        },
        other => Err(ModelHubError::inference(
            format!("row {}", index),
            ModelHubError::DataError(format!(
                "numeric feature '{}' received non-numeric value {}",
                name, other
            )),
        )),
    }
}

fn categorical_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use serde_json::json;

    fn feature_set() -> FeatureSet {
        FeatureSet {
            numeric_features: vec!["price".to_string()],
            categorical_features: vec!["city".to_string()],
        }
    }

    fn row(pairs: &[(&str, Value)]) -> FeatureRow {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_valid_rows() {
        let rows = vec![
            row(&[("price", json!(12.5)), ("city", json!("NYC"))]),
            row(&[("price", Value::Null), ("city", json!(true))]),
        ];
        let frame = rows_to_frame(&rows, &feature_set()).unwrap();
        assert_eq!(frame.n_rows(), 2);
        assert_eq!(frame.numeric("price").unwrap(), &[Some(12.5), None]);
        assert_eq!(
            frame.categorical("city").unwrap(),
            &[Some("NYC".to_string()), Some("true".to_string())]
        );
    }

    #[test]
    fn test_missing_and_extra_columns() {
        let rows = vec![row(&[("price", json!(1.0)), ("color", json!("red"))])];
        let err = rows_to_frame(&rows, &feature_set()).unwrap_err();
        let msg = err.to_string();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(msg.contains("missing features [city]"));
        assert!(msg.contains("unexpected features [color]"));
    }

    #[test]
    fn test_non_scalar_rejected() {
        let rows = vec![row(&[("price", json!([1, 2])), ("city", json!("LA"))])];
        let err = rows_to_frame(&rows, &feature_set()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_text_in_numeric_feature_is_inference_error() {
        let rows = vec![row(&[("price", json!("cheap")), ("city", json!("LA"))])];
        let err = rows_to_frame(&rows, &feature_set()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Inference);
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert!(rows_to_frame(&[], &feature_set()).is_err());
    }
}
