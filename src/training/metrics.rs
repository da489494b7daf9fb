//! Held-out evaluation metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Regression scores on the test split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    /// Coefficient of determination; 0.0 when the test targets are constant
    pub r2: f64,
}

impl RegressionMetrics {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n = y_true.len().max(1) as f64;
        let errors: Vec<f64> = y_true.iter().zip(y_pred.iter()).map(|(t, p)| t - p).collect();

        let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        let y_mean = y_true.sum() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e.powi(2)).sum();
        let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

        Self {
            mae,
            mse,
            rmse: mse.sqrt(),
            r2,
        }
    }
}

/// Classification scores on the test split.
///
/// Precision, recall and F1 are macro averages over the classes present in
/// either the true or the predicted codes; an undefined ratio counts as 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision_macro: f64,
    pub recall_macro: f64,
    pub f1_macro: f64,
}

impl ClassificationMetrics {
    pub fn compute(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Self {
        let n = y_true.len();
        if n == 0 {
            return Self {
                accuracy: 0.0,
                precision_macro: 0.0,
                recall_macro: 0.0,
                f1_macro: 0.0,
            };
        }

        let size = n_classes
            .max(y_true.iter().chain(y_pred.iter()).max().map_or(0, |m| m + 1));
        let mut tp = vec![0usize; size];
        let mut fp = vec![0usize; size];
        let mut fn_ = vec![0usize; size];
        let mut present = vec![false; size];

        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            present[t] = true;
            present[p] = true;
            if t == p {
                tp[t] += 1;
            } else {
                fp[p] += 1;
                fn_[t] += 1;
            }
        }

        let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };
        let mut precision_sum = 0.0;
        let mut recall_sum = 0.0;
        let mut f1_sum = 0.0;
        let mut n_present = 0usize;

        for c in (0..size).filter(|&c| present[c]) {
            let precision = ratio(tp[c], tp[c] + fp[c]);
            let recall = ratio(tp[c], tp[c] + fn_[c]);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            precision_sum += precision;
            recall_sum += recall;
            f1_sum += f1;
            n_present += 1;
        }

        let classes = n_present.max(1) as f64;
        Self {
            accuracy: tp.iter().sum::<usize>() as f64 / n as f64,
            precision_macro: precision_sum / classes,
            recall_macro: recall_sum / classes,
            f1_macro: f1_sum / classes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regression_metrics() {
        let y_true = array![3.0, -0.5, 2.0, 7.0];
        let y_pred = array![2.5, 0.0, 2.0, 8.0];
        let m = RegressionMetrics::compute(&y_true, &y_pred);

        assert!((m.mae - 0.5).abs() < 1e-12);
        assert!((m.mse - 0.375).abs() < 1e-12);
        assert!((m.rmse - 0.375f64.sqrt()).abs() < 1e-12);
        assert!((m.r2 - 0.948_608_137_044_967_9).abs() < 1e-9);
    }

    #[test]
    fn test_r2_constant_targets() {
        let m = RegressionMetrics::compute(&array![1.0, 1.0], &array![1.0, 2.0]);
        assert_eq!(m.r2, 0.0);
    }

    #[test]
    fn test_classification_metrics() {
        let y_true = [0, 1, 2, 0, 1, 2];
        let y_pred = [0, 2, 1, 0, 0, 1];
        let m = ClassificationMetrics::compute(&y_true, &y_pred, 3);

        assert!((m.accuracy - 2.0 / 6.0).abs() < 1e-12);
        // Class 0: p = 2/3, r = 1; classes 1 and 2 score 0
        assert!((m.precision_macro - 2.0 / 9.0).abs() < 1e-12);
        assert!((m.recall_macro - 1.0 / 3.0).abs() < 1e-12);
        assert!((m.f1_macro - 0.8 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_classification() {
        let m = ClassificationMetrics::compute(&[0, 1, 1], &[0, 1, 1], 2);
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.f1_macro, 1.0);
    }
}
