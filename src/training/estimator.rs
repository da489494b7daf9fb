//! Fitted estimator dispatch

use super::knn::KNNClassifier;
use super::linear_models::{LinearRegression, LogisticRegression};
use super::random_forest::RandomForest;
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Any estimator the registry can build.
///
/// Classifiers predict class codes `0..n_classes` as `f64`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    RandomForest(RandomForest),
    LinearRegression(LinearRegression),
    LogisticRegression(LogisticRegression),
    Knn(KNNClassifier),
}

impl Estimator {
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Estimator::RandomForest(m) => m.fit(x, y).map(|_| ()),
            Estimator::LinearRegression(m) => m.fit(x, y).map(|_| ()),
            Estimator::LogisticRegression(m) => m.fit(x, y).map(|_| ()),
            Estimator::Knn(m) => m.fit(x, y).map(|_| ()),
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Estimator::RandomForest(m) => m.predict(x),
            Estimator::LinearRegression(m) => m.predict(x),
            Estimator::LogisticRegression(m) => m.predict(x),
            Estimator::Knn(m) => m.predict(x),
        }
    }

    /// Per-class probabilities, `None` for estimators without them
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        match self {
            Estimator::RandomForest(m) if self.supports_proba() => m.predict_proba(x).map(Some),
            Estimator::LogisticRegression(m) => m.predict_proba(x).map(Some),
            Estimator::Knn(m) => m.predict_proba(x).map(Some),
            _ => Ok(None),
        }
    }

    pub fn supports_proba(&self) -> bool {
        match self {
            Estimator::RandomForest(m) => m.is_classifier(),
            Estimator::LinearRegression(_) => false,
            Estimator::LogisticRegression(_) | Estimator::Knn(_) => true,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Estimator::RandomForest(m) if m.is_classifier() => "RandomForestClassifier",
            Estimator::RandomForest(_) => "RandomForestRegressor",
            Estimator::LinearRegression(_) => "LinearRegression",
            Estimator::LogisticRegression(_) => "LogisticRegression",
            Estimator::Knn(_) => "KNNClassifier",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_dispatch_and_proba_support() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];

        let mut reg = Estimator::LinearRegression(LinearRegression::new());
        reg.fit(&x, &array![1.0, 3.0, 5.0, 7.0]).unwrap();
        assert!(!reg.supports_proba());
        assert!(reg.predict_proba(&x).unwrap().is_none());
        assert!((reg.predict(&array![[4.0]]).unwrap()[0] - 9.0).abs() < 1e-9);

        let mut clf = Estimator::Knn(KNNClassifier::new(1, 2));
        clf.fit(&x, &array![0.0, 0.0, 1.0, 1.0]).unwrap();
        assert_eq!(clf.name(), "KNNClassifier");
        let proba = clf.predict_proba(&x).unwrap().unwrap();
        assert_eq!(proba.dim(), (4, 2));
    }

    #[test]
    fn test_forest_names() {
        assert_eq!(
            Estimator::RandomForest(RandomForest::new_regressor(2)).name(),
            "RandomForestRegressor"
        );
        let clf = Estimator::RandomForest(RandomForest::new_classifier(2, 3));
        assert_eq!(clf.name(), "RandomForestClassifier");
        assert!(clf.supports_proba());
    }
}
