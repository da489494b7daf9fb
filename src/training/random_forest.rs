//! Random Forest implementation

use super::decision_tree::DecisionTree;
use crate::error::{ModelHubError, Result};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy for features considered at each split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub random_state: u64,
    /// Class count for classification, 0 for regression
    n_classes: usize,
    n_features: usize,
}

impl RandomForest {
    /// Create a new classifier forest
    pub fn new_classifier(n_estimators: usize, n_classes: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            random_state: 42,
            n_classes,
            n_features: 0,
        }
    }

    /// Create a new regressor forest
    pub fn new_regressor(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            random_state: 42,
            n_classes: 0,
            n_features: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    fn is_classification(&self) -> bool {
        self.n_classes > 0
    }

    /// Whether this forest votes over classes
    pub fn is_classifier(&self) -> bool {
        self.is_classification()
    }

    fn compute_max_features(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(ModelHubError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(ModelHubError::ValidationError(
                "cannot fit a forest on zero samples".to_string(),
            ));
        }
        if self.n_estimators == 0 {
            return Err(ModelHubError::ConfigError(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        self.n_features = x.ncols();
        let max_features = self.compute_max_features(self.n_features);
        let base_seed = self.random_state;

        // Each tree owns its RNG, so the result does not depend on thread scheduling
        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<DecisionTree> {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = if self.is_classification() {
                    DecisionTree::new_classifier(self.n_classes)
                } else {
                    DecisionTree::new_regressor()
                }
                .with_max_depth(self.max_depth)
                .with_min_samples_split(self.min_samples_split)
                .with_min_samples_leaf(self.min_samples_leaf)
                .with_max_features(Some(max_features));

                tree.fit_rows(x, y, sample_indices, &mut rng)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        Ok(self)
    }

    /// Make predictions: mean for regression, majority vote for classification
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(ModelHubError::ModelNotFitted);
        }

        if self.is_classification() {
            let votes = self.vote_counts(x)?;
            // Ties go to the lowest class code
            let predictions = votes
                .rows()
                .into_iter()
                .map(|row| {
                    row.iter()
                        .enumerate()
                        .fold((0usize, f64::MIN), |best, (class, &v)| {
                            if v > best.1 {
                                (class, v)
                            } else {
                                best
                            }
                        })
                        .0 as f64
                })
                .collect();
            return Ok(Array1::from_vec(predictions));
        }

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut sum = Array1::<f64>::zeros(x.nrows());
        for preds in &all_predictions {
            sum += preds;
        }
        Ok(sum / all_predictions.len() as f64)
    }

    /// Fraction of trees voting for each class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(ModelHubError::ModelNotFitted);
        }
        if !self.is_classification() {
            return Err(ModelHubError::ValidationError(
                "predict_proba is only available for classification".to_string(),
            ));
        }
        let votes = self.vote_counts(x)?;
        Ok(votes / self.trees.len() as f64)
    }

    fn vote_counts(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut votes = Array2::<f64>::zeros((x.nrows(), self.n_classes));
        for preds in &all_predictions {
            for (i, &class) in preds.iter().enumerate() {
                votes[[i, class as usize]] += 1.0;
            }
        }
        Ok(votes)
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut rf = RandomForest::new_classifier(25, 2).with_random_state(42);
        rf.fit(&x, &y).unwrap();
        assert_eq!(rf.n_trees(), 25);

        let proba = rf.predict_proba(&array![[0.05, 0.05], [1.15, 1.15]]).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        let preds = rf.predict(&array![[0.05, 0.05], [1.15, 1.15]]).unwrap();
        assert_eq!(preds, array![0.0, 1.0]);
    }

    #[test]
    fn test_regressor() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = array![2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0];

        let mut rf = RandomForest::new_regressor(20).with_random_state(7);
        rf.fit(&x, &y).unwrap();

        let pred = rf.predict(&array![[1.0], [8.0]]).unwrap();
        assert!(pred[0] < pred[1]);
        assert!(pred[0] >= 2.0 && pred[1] <= 16.0);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [0.5, 0.5], [0.2, 0.9], [0.9, 0.1], [0.4, 0.3]];
        let y = array![0.0, 1.0, 1.0, 0.0, 1.0, 0.0];

        let mut a = RandomForest::new_classifier(10, 2).with_random_state(3);
        let mut b = RandomForest::new_classifier(10, 2).with_random_state(3);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_unfitted() {
        let rf = RandomForest::new_regressor(5);
        assert!(matches!(rf.predict(&array![[1.0]]), Err(ModelHubError::ModelNotFitted)));
    }
}
