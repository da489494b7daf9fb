//! Integration test: feature classification and preprocessing end-to-end

use modelhub::preprocessing::{FeatureFrame, FeaturePreprocessor, FeatureSet};
use polars::prelude::*;

fn sample_df() -> DataFrame {
    df!(
        "age" => &[Some(25.0), Some(30.0), None, Some(40.0), Some(45.0), Some(50.0)],
        "rooms" => &[1i64, 2, 3, 2, 4, 3],
        "segment" => &[Some("retail"), Some("b2b"), Some("retail"), None, Some("b2b"), Some("retail")],
        "active" => &[true, false, true, true, false, true],
        "spend" => &[100.0, 250.0, 180.0, 300.0, 420.0, 390.0]
    )
    .unwrap()
}

#[test]
fn test_column_typing() {
    let fs = FeatureSet::from_table(&sample_df(), "spend").unwrap();
    assert_eq!(fs.numeric_features, vec!["age", "rooms"]);
    assert_eq!(fs.categorical_features, vec!["segment", "active"]);
}

#[test]
fn test_fit_on_train_rows_only() {
    let df = sample_df();
    let fs = FeatureSet::from_table(&df, "spend").unwrap();
    let frame = FeatureFrame::from_table(&df, &fs).unwrap();
    let train = frame.take(&[0, 1, 2]).unwrap();
    let test = frame.take(&[3, 4, 5]).unwrap();

    let mut pre = FeaturePreprocessor::new(fs);
    let x_train = pre.fit_transform(&train).unwrap();
    assert_eq!(x_train.nrows(), 3);

    // age: train rows 25, 30, null -> median 27.5
    let x_null = pre.transform(&train.take(&[2]).unwrap()).unwrap();
    let x_median = pre
        .transform(&FeatureFrame::from_table(&df!(
            "age" => &[27.5],
            "rooms" => &[3i64],
            "segment" => &["retail"],
            "active" => &[true]
        )
        .unwrap(), pre.feature_set())
        .unwrap())
        .unwrap();
    assert_eq!(x_null, x_median);

    // Test rows see only train categories; segment has no "missing" column
    let x_test = pre.transform(&test).unwrap();
    assert_eq!(x_test.ncols(), x_train.ncols());
    assert!(!pre.output_feature_names().contains(&"segment_missing".to_string()));
}

#[test]
fn test_training_nulls_become_sentinel_category() {
    let df = sample_df();
    let fs = FeatureSet::from_table(&df, "spend").unwrap();
    let frame = FeatureFrame::from_table(&df, &fs).unwrap();

    let mut pre = FeaturePreprocessor::with_missing_category(fs, "unknown");
    pre.fit(&frame).unwrap();
    assert_eq!(
        pre.output_feature_names(),
        vec![
            "age",
            "rooms",
            "segment_b2b",
            "segment_retail",
            "segment_unknown",
            "active_false",
            "active_true",
        ]
    );
}

#[test]
fn test_transform_before_fit_fails() {
    let df = sample_df();
    let fs = FeatureSet::from_table(&df, "spend").unwrap();
    let frame = FeatureFrame::from_table(&df, &fs).unwrap();
    assert!(FeaturePreprocessor::new(fs).transform(&frame).is_err());
}
