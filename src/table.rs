//! Helpers over the cleaned input table
//!
//! The ingestion layer hands the core a `DataFrame` whose headers are already
//! normalized. Raw column names coming from callers (target columns) are
//! normalized here with the same rule before they are looked up.

use crate::error::{ModelHubError, Result};
use polars::prelude::*;

/// Normalize a raw column name the way ingestion normalizes headers:
/// trim, spaces and hyphens to underscores, punctuation stripped, lower-case.
pub fn normalize_column_name(raw: &str) -> String {
    raw.trim()
        .replace(' ', "_")
        .replace('-', "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Column names of the table, in table order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Render up to `limit` column names for an error message, with a trailing
/// ellipsis when the table has more.
pub fn available_columns_hint(df: &DataFrame, limit: usize) -> String {
    let names = column_names(df);
    let shown = names.iter().take(limit).cloned().collect::<Vec<_>>().join(", ");
    if names.len() > limit {
        format!("{}...", shown)
    } else {
        shown
    }
}

/// Normalize `raw` and make sure the table has that column.
///
/// `role` names the column in the error ("target", "regression target", ...).
pub fn resolve_column(df: &DataFrame, raw: &str, role: &str, hint_limit: usize) -> Result<String> {
    let normalized = normalize_column_name(raw);
    if df.column(&normalized).is_ok() {
        return Ok(normalized);
    }
    Err(ModelHubError::ConfigError(format!(
        "{} column '{}' (normalized: '{}') not found; available columns: {}",
        role,
        raw,
        normalized,
        available_columns_hint(df, hint_limit)
    )))
}

/// Reject tables the pipelines cannot learn from
pub fn ensure_trainable(df: &DataFrame) -> Result<()> {
    if df.height() == 0 {
        return Err(ModelHubError::ConfigError(
            "dataset is empty after cleaning".to_string(),
        ));
    }
    if df.width() < 2 {
        return Err(ModelHubError::ConfigError(format!(
            "dataset needs a target and at least one feature column, got {} column(s)",
            df.width()
        )));
    }
    Ok(())
}

/// A column counts as numeric when its storage type is integer or floating point
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    dtype.is_integer() || dtype.is_float()
}

/// Numeric column values as `f64`.
///
/// Nulls, NaN and infinities all come back as `None` so the imputers treat
/// them as missing.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| ModelHubError::DataError(format!("column '{}' not found", name)))?;
    if !is_numeric_dtype(column.dtype()) && *column.dtype() != DataType::Null {
        return Err(ModelHubError::DataError(format!(
            "column '{}' has type {} but a numeric type is required",
            name,
            column.dtype()
        )));
    }
    let casted = column.cast(&DataType::Float64)?;
    let values = casted
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    Ok(values)
}

/// Any column rendered as text, nulls preserved.
///
/// Booleans render as `true`/`false`, numbers with their display form.
pub fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| ModelHubError::DataError(format!("column '{}' not found", name)))?;
    let casted = column.cast(&DataType::String)?;
    let values = casted
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_df() -> DataFrame {
        df!(
            "price" => &[10.0, 20.0, 30.0],
            "city" => &["NYC", "LA", "SF"],
            "delivered" => &[true, false, true]
        )
        .unwrap()
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("  Delivery Time-Days "), "delivery_time_days");
        assert_eq!(normalize_column_name("Price ($)"), "price_");
        assert_eq!(normalize_column_name("already_ok"), "already_ok");
    }

    #[test]
    fn test_resolve_column_normalizes() {
        let df = sample_df();
        assert_eq!(resolve_column(&df, "Delivered", "target", 10).unwrap(), "delivered");
    }

    #[test]
    fn test_resolve_column_lists_available() {
        let df = sample_df();
        let err = resolve_column(&df, "weight", "target", 10).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, ModelHubError::ConfigError(_)));
        assert!(msg.contains("price"));
        assert!(msg.contains("city"));
    }

    #[test]
    fn test_hint_truncates() {
        let df = sample_df();
        assert_eq!(available_columns_hint(&df, 2), "price, city...");
        assert_eq!(available_columns_hint(&df, 5), "price, city, delivered");
    }

    #[test]
    fn test_non_finite_values_read_as_missing() {
        let df = df!("x" => &[Some(1.0), Some(f64::NAN), None, Some(f64::INFINITY)]).unwrap();
        assert_eq!(numeric_values(&df, "x").unwrap(), vec![Some(1.0), None, None, None]);
    }

    #[test]
    fn test_ensure_trainable_rejects_empty() {
        let df = df!("a" => Vec::<f64>::new(), "b" => Vec::<f64>::new()).unwrap();
        assert!(matches!(ensure_trainable(&df), Err(ModelHubError::ConfigError(_))));
    }

    #[test]
    fn test_value_extraction() {
        let df = sample_df();
        assert_eq!(numeric_values(&df, "price").unwrap(), vec![Some(10.0), Some(20.0), Some(30.0)]);
        assert!(numeric_values(&df, "city").is_err());
        assert_eq!(
            text_values(&df, "delivered").unwrap(),
            vec![Some("true".to_string()), Some("false".to_string()), Some("true".to_string())]
        );
    }
}
