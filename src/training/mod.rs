//! Model training module
//!
//! Provides the supervised training pipelines:
//! - Algorithm registry resolving `rf`, `linreg`, `logreg` and `knn`
//! - Decision trees and Random Forests
//! - Linear models (OLS, multinomial logistic regression)
//! - K-Nearest Neighbors
//! - Regression, classification and dual-model orchestration

mod config;
pub mod algorithms;
pub mod classification;
pub mod decision_tree;
pub mod dual;
pub mod estimator;
pub mod knn;
pub mod linear_models;
pub mod metrics;
pub mod pipeline;
pub mod random_forest;
pub mod regression;
pub mod split;

pub use algorithms::{resolve, AlgorithmKind, AlgorithmSpec, EstimatorSettings, FallbackPolicy, Hyperparams};
pub use classification::{train_classification, train_classification_with_policy, ClassificationResult};
pub use config::{TaskType, TrainingConfig};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use dual::{train_both, DualTrainingConfig, DualTrainingResult};
pub use estimator::Estimator;
pub use knn::{KNNClassifier, WeightScheme};
pub use linear_models::{LinearRegression, LogisticRegression};
pub use metrics::{ClassificationMetrics, RegressionMetrics};
pub use pipeline::TrainedPipeline;
pub use random_forest::{MaxFeatures, RandomForest};
pub use regression::{train_regression, RegressionResult};
pub use split::{train_test_split, TrainTestSplit};
