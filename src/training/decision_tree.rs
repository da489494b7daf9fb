//! Decision tree implementation

use crate::error::{ModelHubError, Result};
use ndarray::{Array1, Array2};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        /// Class fractions at this leaf (classification only)
        distribution: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Mean squared error (regression)
    MSE,
}

/// Decision tree model.
///
/// Classification targets are class codes `0..n_classes` stored as `f64`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn at random for every split; all features when `None`
    pub max_features: Option<usize>,
    pub criterion: Criterion,
    n_features: usize,
    n_classes: usize,
}

/// Sufficient statistics of the targets reaching a node
#[derive(Debug, Clone)]
enum NodeStats {
    Classes(Vec<usize>),
    Moments { sum: f64, sq_sum: f64 },
}

impl DecisionTree {
    /// Create a new classifier tree over `n_classes` class codes
    pub fn new_classifier(n_classes: usize) -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            n_features: 0,
            n_classes,
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::MSE,
            n_features: 0,
            n_classes: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    fn is_classification(&self) -> bool {
        self.criterion == Criterion::Gini
    }

    /// Fit the tree on every row, seed 0 for feature subsampling
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let indices: Vec<usize> = (0..x.nrows()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        self.fit_rows(x, y, indices, &mut rng)
    }

    /// Fit the tree on the rows at `indices` (duplicates allowed, as in a bootstrap sample)
    pub fn fit_rows(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
        rng: &mut ChaCha8Rng,
    ) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(ModelHubError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if indices.is_empty() {
            return Err(ModelHubError::ValidationError(
                "cannot fit a tree on zero samples".to_string(),
            ));
        }
        if self.is_classification() {
            if self.n_classes == 0 {
                return Err(ModelHubError::ValidationError(
                    "classifier tree needs at least one class".to_string(),
                ));
            }
            if let Some(bad) = y.iter().find(|&&v| v < 0.0 || v as usize >= self.n_classes) {
                return Err(ModelHubError::ValidationError(format!(
                    "class code {} out of range for {} classes",
                    bad, self.n_classes
                )));
            }
        }

        self.n_features = x.ncols();
        self.root = Some(self.build_tree(x, y, indices, 0, rng));
        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let stats = self.stats(y, &indices);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || self.impurity(&stats, n_samples) <= 1e-12;

        if should_stop {
            return self.make_leaf(&stats, n_samples);
        }

        let features = self.candidate_features(rng);
        match self.find_best_split(x, y, &indices, &features, &stats) {
            Some((feature_idx, threshold)) => {
                let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| x[[i, feature_idx]] <= threshold);

                let left = Box::new(self.build_tree(x, y, left_indices, depth + 1, rng));
                let right = Box::new(self.build_tree(x, y, right_indices, depth + 1, rng));

                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    n_samples,
                }
            }
            None => self.make_leaf(&stats, n_samples),
        }
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < self.n_features => {
                let mut picked = index::sample(rng, self.n_features, k.max(1)).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..self.n_features).collect(),
        }
    }

    /// Best (feature, threshold) by impurity decrease, scanning each candidate
    /// feature in sorted order
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        features: &[usize],
        parent: &NodeStats,
    ) -> Option<(usize, f64)> {
        let n = indices.len();
        let parent_impurity = self.impurity(parent, n);

        let feature_results: Vec<(usize, f64, f64)> = features
            .par_iter()
            .filter_map(|&feature_idx| {
                let mut pairs: Vec<(f64, f64)> =
                    indices.iter().map(|&i| (x[[i, feature_idx]], y[i])).collect();
                pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

                let mut left = self.empty_stats();
                let mut best: Option<(f64, f64)> = None;

                for k in 0..n - 1 {
                    Self::push(&mut left, pairs[k].1);
                    if pairs[k].0 == pairs[k + 1].0 {
                        continue;
                    }
                    let n_left = k + 1;
                    let n_right = n - n_left;
                    if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                        continue;
                    }

                    let right = Self::subtract(parent, &left);
                    let weighted = (n_left as f64 * self.impurity(&left, n_left)
                        + n_right as f64 * self.impurity(&right, n_right))
                        / n as f64;
                    let gain = parent_impurity - weighted;

                    if gain > 1e-12 && best.map_or(true, |(g, _)| gain > g) {
                        best = Some((gain, (pairs[k].0 + pairs[k + 1].0) / 2.0));
                    }
                }

                best.map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        feature_results
            .into_iter()
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal))
            .map(|(feature_idx, threshold, _)| (feature_idx, threshold))
    }

    fn empty_stats(&self) -> NodeStats {
        if self.is_classification() {
            NodeStats::Classes(vec![0; self.n_classes])
        } else {
            NodeStats::Moments { sum: 0.0, sq_sum: 0.0 }
        }
    }

    fn stats(&self, y: &Array1<f64>, indices: &[usize]) -> NodeStats {
        let mut stats = self.empty_stats();
        for &i in indices {
            Self::push(&mut stats, y[i]);
        }
        stats
    }

    fn push(stats: &mut NodeStats, yi: f64) {
        match stats {
            NodeStats::Classes(counts) => counts[yi as usize] += 1,
            NodeStats::Moments { sum, sq_sum } => {
                *sum += yi;
                *sq_sum += yi * yi;
            }
        }
    }

    fn subtract(total: &NodeStats, part: &NodeStats) -> NodeStats {
        match (total, part) {
            (NodeStats::Classes(t), NodeStats::Classes(p)) => {
                NodeStats::Classes(t.iter().zip(p).map(|(a, b)| a - b).collect())
            }
            (
                NodeStats::Moments { sum: ts, sq_sum: tq },
                NodeStats::Moments { sum: ps, sq_sum: pq },
            ) => NodeStats::Moments {
                sum: ts - ps,
                sq_sum: tq - pq,
            },
            _ => total.clone(),
        }
    }

    fn impurity(&self, stats: &NodeStats, count: usize) -> f64 {
        if count == 0 {
            return 0.0;
        }
        let n = count as f64;
        match stats {
            NodeStats::Classes(counts) => {
                1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
            }
            // Var = E[X²] - E[X]²
            NodeStats::Moments { sum, sq_sum } => (sq_sum / n - (sum / n).powi(2)).max(0.0),
        }
    }

    fn make_leaf(&self, stats: &NodeStats, n_samples: usize) -> TreeNode {
        match stats {
            NodeStats::Classes(counts) => {
                let n = n_samples.max(1) as f64;
                let distribution: Vec<f64> = counts.iter().map(|&c| c as f64 / n).collect();
                // Ties go to the lowest class code
                let value = counts
                    .iter()
                    .enumerate()
                    .fold((0usize, 0usize), |best, (class, &c)| {
                        if c > best.1 {
                            (class, c)
                        } else {
                            best
                        }
                    })
                    .0 as f64;
                TreeNode::Leaf {
                    value,
                    distribution,
                    n_samples,
                }
            }
            NodeStats::Moments { sum, .. } => TreeNode::Leaf {
                value: sum / n_samples.max(1) as f64,
                distribution: Vec::new(),
                n_samples,
            },
        }
    }

    fn leaf_for<'a>(&'a self, root: &'a TreeNode, sample: &[f64]) -> &'a TreeNode {
        let mut node = root;
        loop {
            match node {
                TreeNode::Leaf { .. } => return node,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if sample[*feature_idx] <= *threshold {
                        &**left
                    } else {
                        &**right
                    };
                }
            }
        }
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<&TreeNode> {
        let root = self.root.as_ref().ok_or(ModelHubError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(ModelHubError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(root)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.check_input(x)?;
        let predictions: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| match self.leaf_for(root, &row.to_vec()) {
                TreeNode::Leaf { value, .. } => *value,
                TreeNode::Split { .. } => 0.0,
            })
            .collect();
        Ok(Array1::from_vec(predictions))
    }

    /// Leaf class fractions, one row per sample
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_classification() {
            return Err(ModelHubError::ValidationError(
                "predict_proba is only available for classification".to_string(),
            ));
        }
        let root = self.check_input(x)?;
        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            if let TreeNode::Leaf { distribution, .. } = self.leaf_for(root, &row.to_vec()) {
                for (j, p) in distribution.iter().enumerate() {
                    proba[[i, j]] = *p;
                }
            }
        }
        Ok(proba)
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}
