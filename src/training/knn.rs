//! K-Nearest Neighbors classifier
//!
//! Euclidean distance over the preprocessed feature matrix; targets are class
//! codes `0..n_classes`.

use crate::error::{ModelHubError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::linear_models::argmax;

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Closer neighbors have more weight (inverse distance)
    Distance,
}

/// K-Nearest Neighbors Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNClassifier {
    pub n_neighbors: usize,
    pub weights: WeightScheme,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
    n_classes: usize,
}

impl KNNClassifier {
    pub fn new(n_neighbors: usize, n_classes: usize) -> Self {
        Self {
            n_neighbors,
            weights: WeightScheme::Uniform,
            x_train: None,
            y_train: None,
            n_classes,
        }
    }

    pub fn with_weights(mut self, weights: WeightScheme) -> Self {
        self.weights = weights;
        self
    }

    /// Fit the classifier (stores training data)
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(ModelHubError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(ModelHubError::ValidationError(
                "cannot fit knn on zero samples".to_string(),
            ));
        }
        if self.n_neighbors == 0 {
            return Err(ModelHubError::ConfigError(
                "n_neighbors must be at least 1".to_string(),
            ));
        }
        if let Some(bad) = y.iter().find(|&&v| v < 0.0 || v as usize >= self.n_classes) {
            return Err(ModelHubError::ValidationError(format!(
                "class code {} out of range for {} classes",
                bad, self.n_classes
            )));
        }

        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(self)
    }

    /// Weighted neighbor votes per class, normalized to sum to one
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(x), Some(y)) => (x, y),
            _ => return Err(ModelHubError::ModelNotFitted),
        };
        if x.ncols() != x_train.ncols() {
            return Err(ModelHubError::ShapeError {
                expected: format!("{} features", x_train.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let k = self.n_neighbors.min(x_train.nrows());
        let probs: Vec<Vec<f64>> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let neighbors = find_k_nearest(x.row(i), x_train, y_train, k);
                class_probs_from(&neighbors, self.n_classes, self.weights)
            })
            .collect();

        let flat: Vec<f64> = probs.into_iter().flatten().collect();
        Ok(Array2::from_shape_vec((x.nrows(), self.n_classes), flat)?)
    }

    /// Predict class codes
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| argmax(row.iter().copied()) as f64)
            .collect())
    }
}

/// Max-heap entry for partial sort (keeps k smallest distances)
#[derive(PartialEq)]
struct DistLabel(f64, f64);

impl Eq for DistLabel {}
impl PartialOrd for DistLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Find k nearest neighbors using a max-heap, O(n log k)
fn find_k_nearest(
    point: ArrayView1<f64>,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    k: usize,
) -> Vec<(f64, f64)> {
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for (row, &label) in x_train.rows().into_iter().zip(y_train.iter()) {
        let dist = euclidean(point, row);
        if heap.len() < k {
            heap.push(DistLabel(dist, label));
        } else if let Some(top) = heap.peek() {
            if dist < top.0 {
                heap.pop();
                heap.push(DistLabel(dist, label));
            }
        }
    }

    heap.into_iter().map(|dl| (dl.0, dl.1)).collect()
}

fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(ai, bi)| (ai - bi) * (ai - bi))
        .sum::<f64>()
        .sqrt()
}

fn class_probs_from(neighbors: &[(f64, f64)], n_classes: usize, weights: WeightScheme) -> Vec<f64> {
    let mut counts = vec![0.0; n_classes];
    let mut total = 0.0;
    for &(dist, label) in neighbors {
        let weight = match weights {
            WeightScheme::Uniform => 1.0,
            WeightScheme::Distance => 1.0 / (dist + 1e-10),
        };
        counts[label as usize] += weight;
        total += weight;
    }
    if total > 0.0 {
        counts.iter_mut().for_each(|c| *c /= total);
    }
    counts
}
