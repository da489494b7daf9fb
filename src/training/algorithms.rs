//! Algorithm registry: maps algorithm keys to estimator constructors
//!
//! Regression supports `rf` and `linreg`; classification supports `rf`,
//! `logreg` and `knn`. Caller-supplied hyperparameters replace the defaults
//! wholesale and are validated against the parameters each algorithm accepts.

use super::config::TaskType;
use super::estimator::Estimator;
use super::knn::{KNNClassifier, WeightScheme};
use super::linear_models::{LinearRegression, LogisticRegression};
use super::random_forest::RandomForest;
use crate::error::{ModelHubError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Hyperparameter map as supplied by callers and recorded in metadata
pub type Hyperparams = BTreeMap<String, Value>;

/// Supported algorithm families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmKind {
    #[serde(rename = "rf")]
    RandomForest,
    #[serde(rename = "linreg")]
    LinearRegression,
    #[serde(rename = "logreg")]
    LogisticRegression,
    #[serde(rename = "knn")]
    Knn,
}

impl AlgorithmKind {
    /// Canonical key
    pub fn key(&self) -> &'static str {
        match self {
            AlgorithmKind::RandomForest => "rf",
            AlgorithmKind::LinearRegression => "linreg",
            AlgorithmKind::LogisticRegression => "logreg",
            AlgorithmKind::Knn => "knn",
        }
    }

    /// Parse a key or one of its aliases, case-insensitively
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "rf" | "random_forest" | "random_forest_reg" | "random_forest_clf" => {
                Some(AlgorithmKind::RandomForest)
            }
            "linreg" | "linear_regression" => Some(AlgorithmKind::LinearRegression),
            "logreg" | "logistic_regression" => Some(AlgorithmKind::LogisticRegression),
            "knn" | "k_nearest_neighbors" => Some(AlgorithmKind::Knn),
            _ => None,
        }
    }

    /// Kinds available for a task
    pub fn supported_for(task: TaskType) -> &'static [AlgorithmKind] {
        match task {
            TaskType::Regression => &[AlgorithmKind::RandomForest, AlgorithmKind::LinearRegression],
            TaskType::Classification => &[
                AlgorithmKind::RandomForest,
                AlgorithmKind::LogisticRegression,
                AlgorithmKind::Knn,
            ],
        }
    }

    pub fn supports(&self, task: TaskType) -> bool {
        Self::supported_for(task).contains(self)
    }

    /// Parameter names this algorithm accepts
    pub fn allowed_params(&self) -> &'static [&'static str] {
        match self {
            AlgorithmKind::RandomForest => &[
                "n_estimators",
                "max_depth",
                "min_samples_split",
                "min_samples_leaf",
                "random_state",
            ],
            AlgorithmKind::LinearRegression => &["fit_intercept"],
            AlgorithmKind::LogisticRegression => &["alpha", "max_iter", "learning_rate", "tol"],
            AlgorithmKind::Knn => &["n_neighbors", "weights"],
        }
    }

    /// Hyperparameters used when the caller supplies none
    pub fn default_params(&self) -> Hyperparams {
        let pairs: Vec<(&str, Value)> = match self {
            AlgorithmKind::RandomForest => vec![("n_estimators", json!(100))],
            AlgorithmKind::LinearRegression => vec![("fit_intercept", json!(true))],
            AlgorithmKind::LogisticRegression => vec![
                ("alpha", json!(0.01)),
                ("max_iter", json!(1000)),
                ("learning_rate", json!(0.1)),
                ("tol", json!(1e-6)),
            ],
            AlgorithmKind::Knn => vec![("n_neighbors", json!(5)), ("weights", json!("uniform"))],
        };
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// What to do when a requested kind is unknown or unsupported for the task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Fail with `UnsupportedAlgorithm`
    Strict,
    /// Substitute `rf` with its defaults and log a warning
    DefaultToRandomForest,
}

/// Typed estimator settings, parsed from the hyperparameter map
#[derive(Debug, Clone, PartialEq)]
pub enum EstimatorSettings {
    RandomForest {
        n_estimators: usize,
        max_depth: Option<usize>,
        min_samples_split: usize,
        min_samples_leaf: usize,
        random_state: Option<u64>,
    },
    LinearRegression {
        fit_intercept: bool,
    },
    LogisticRegression {
        alpha: f64,
        max_iter: usize,
        learning_rate: f64,
        tol: f64,
    },
    Knn {
        n_neighbors: usize,
        weights: WeightScheme,
    },
}

/// A resolved algorithm: kind, task, effective hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmSpec {
    pub kind: AlgorithmKind,
    pub task: TaskType,
    /// Hyperparameters as recorded in metadata
    pub hyperparameters: Hyperparams,
    pub settings: EstimatorSettings,
}

/// Resolve `raw_kind` for `task`, validating `params` when supplied.
pub fn resolve(
    raw_kind: &str,
    task: TaskType,
    params: Option<&Hyperparams>,
    policy: FallbackPolicy,
) -> Result<AlgorithmSpec> {
    let requested = AlgorithmKind::parse(raw_kind).filter(|k| k.supports(task));

    let (kind, params) = match (requested, policy) {
        (Some(kind), _) => (kind, params),
        (None, FallbackPolicy::DefaultToRandomForest) => {
            warn!(
                requested = raw_kind,
                task = %task,
                "Unsupported algorithm, falling back to rf with default hyperparameters"
            );
            (AlgorithmKind::RandomForest, None)
        }
        (None, FallbackPolicy::Strict) => {
            return Err(ModelHubError::UnsupportedAlgorithm {
                kind: raw_kind.to_string(),
                task: task.to_string(),
                supported: AlgorithmKind::supported_for(task)
                    .iter()
                    .map(|k| k.key())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
    };

    let hyperparameters = params.cloned().unwrap_or_else(|| kind.default_params());
    let settings = parse_settings(kind, &hyperparameters)?;

    Ok(AlgorithmSpec {
        kind,
        task,
        hyperparameters,
        settings,
    })
}

fn parse_settings(kind: AlgorithmKind, params: &Hyperparams) -> Result<EstimatorSettings> {
    let allowed = kind.allowed_params();
    if let Some(unknown) = params.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(ModelHubError::ConfigError(format!(
            "unknown hyperparameter '{}' for {}; accepted: {}",
            unknown,
            kind,
            allowed.join(", ")
        )));
    }

    let settings = match kind {
        AlgorithmKind::RandomForest => EstimatorSettings::RandomForest {
            n_estimators: int_param(params, "n_estimators", 1)?.unwrap_or(100),
            max_depth: int_param(params, "max_depth", 1)?,
            min_samples_split: int_param(params, "min_samples_split", 2)?.unwrap_or(2),
            min_samples_leaf: int_param(params, "min_samples_leaf", 1)?.unwrap_or(1),
            random_state: int_param(params, "random_state", 0)?.map(|v| v as u64),
        },
        AlgorithmKind::LinearRegression => EstimatorSettings::LinearRegression {
            fit_intercept: match params.get("fit_intercept") {
                None => true,
                Some(Value::Bool(b)) => *b,
                Some(other) => return Err(bad_param("fit_intercept", "a boolean", other)),
            },
        },
        AlgorithmKind::LogisticRegression => EstimatorSettings::LogisticRegression {
            alpha: float_param(params, "alpha", false)?.unwrap_or(0.01),
            max_iter: int_param(params, "max_iter", 1)?.unwrap_or(1000),
            learning_rate: float_param(params, "learning_rate", true)?.unwrap_or(0.1),
            tol: float_param(params, "tol", false)?.unwrap_or(1e-6),
        },
        AlgorithmKind::Knn => EstimatorSettings::Knn {
            n_neighbors: int_param(params, "n_neighbors", 1)?.unwrap_or(5),
            weights: match params.get("weights") {
                None => WeightScheme::Uniform,
                Some(Value::String(s)) if s == "uniform" => WeightScheme::Uniform,
                Some(Value::String(s)) if s == "distance" => WeightScheme::Distance,
                Some(other) => return Err(bad_param("weights", "'uniform' or 'distance'", other)),
            },
        },
    };
    Ok(settings)
}

fn bad_param(name: &str, expected: &str, got: &Value) -> ModelHubError {
    ModelHubError::ConfigError(format!(
        "hyperparameter '{}' must be {}, got {}",
        name, expected, got
    ))
}

/// Integer parameter with a lower bound; JSON null reads as absent
fn int_param(params: &Hyperparams, name: &str, min: u64) -> Result<Option<usize>> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match v.as_u64() {
            Some(n) if n >= min => Ok(Some(n as usize)),
            _ => Err(bad_param(name, &format!("an integer >= {}", min), v)),
        },
    }
}

/// Non-negative (or strictly positive) float parameter
fn float_param(params: &Hyperparams, name: &str, strictly_positive: bool) -> Result<Option<f64>> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match v.as_f64() {
            Some(x) if x.is_finite() && (x > 0.0 || (!strictly_positive && x == 0.0)) => Ok(Some(x)),
            _ => Err(bad_param(
                name,
                if strictly_positive { "a positive number" } else { "a non-negative number" },
                v,
            )),
        },
    }
}

impl AlgorithmSpec {
    /// Construct an unfitted estimator.
    ///
    /// `n_classes` is ignored for regression; `default_seed` seeds forests
    /// whose hyperparameters carry no `random_state`.
    pub fn build(&self, n_classes: usize, default_seed: u64) -> Estimator {
        match (&self.settings, self.task) {
            (
                EstimatorSettings::RandomForest {
                    n_estimators,
                    max_depth,
                    min_samples_split,
                    min_samples_leaf,
                    random_state,
                },
                task,
            ) => {
                let forest = match task {
                    TaskType::Regression => RandomForest::new_regressor(*n_estimators),
                    TaskType::Classification => RandomForest::new_classifier(*n_estimators, n_classes),
                };
                Estimator::RandomForest(
                    forest
                        .with_max_depth(*max_depth)
                        .with_min_samples_split(*min_samples_split)
                        .with_min_samples_leaf(*min_samples_leaf)
                        .with_random_state(random_state.unwrap_or(default_seed)),
                )
            }
            (EstimatorSettings::LinearRegression { fit_intercept }, _) => Estimator::LinearRegression(
                LinearRegression::new().with_fit_intercept(*fit_intercept),
            ),
            (
                EstimatorSettings::LogisticRegression {
                    alpha,
                    max_iter,
                    learning_rate,
                    tol,
                },
                _,
            ) => Estimator::LogisticRegression(
                LogisticRegression::new(n_classes)
                    .with_alpha(*alpha)
                    .with_max_iter(*max_iter)
                    .with_learning_rate(*learning_rate)
                    .with_tol(*tol),
            ),
            (EstimatorSettings::Knn { n_neighbors, weights }, _) => {
                Estimator::Knn(KNNClassifier::new(*n_neighbors, n_classes).with_weights(*weights))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_resolve_to_canonical_keys() {
        assert_eq!(AlgorithmKind::parse("Random_Forest"), Some(AlgorithmKind::RandomForest));
        assert_eq!(AlgorithmKind::parse("random_forest_reg"), Some(AlgorithmKind::RandomForest));
        assert_eq!(
            AlgorithmKind::parse("logistic_regression"),
            Some(AlgorithmKind::LogisticRegression)
        );
        assert_eq!(AlgorithmKind::parse("svm"), None);
        assert_eq!(serde_json::to_string(&AlgorithmKind::Knn).unwrap(), "\"knn\"");
    }

    #[test]
    fn test_resolve_defaults() {
        let spec = resolve("rf", TaskType::Regression, None, FallbackPolicy::Strict).unwrap();
        assert_eq!(spec.kind, AlgorithmKind::RandomForest);
        assert_eq!(spec.hyperparameters.get("n_estimators"), Some(&json!(100)));

        let spec = resolve("knn", TaskType::Classification, None, FallbackPolicy::Strict).unwrap();
        assert_eq!(
            spec.settings,
            EstimatorSettings::Knn {
                n_neighbors: 5,
                weights: WeightScheme::Uniform
            }
        );
    }

    #[test]
    fn test_strict_rejects_task_mismatch() {
        let err = resolve("knn", TaskType::Regression, None, FallbackPolicy::Strict).unwrap_err();
        match err {
            ModelHubError::UnsupportedAlgorithm { kind, task, supported } => {
                assert_eq!(kind, "knn");
                assert_eq!(task, "regression");
                assert_eq!(supported, "rf, linreg");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_fallback_policy_substitutes_rf() {
        let mut params = Hyperparams::new();
        params.insert("kernel".to_string(), json!("rbf"));
        let spec = resolve(
            "svm",
            TaskType::Classification,
            Some(&params),
            FallbackPolicy::DefaultToRandomForest,
        )
        .unwrap();
        assert_eq!(spec.kind, AlgorithmKind::RandomForest);
        assert_eq!(spec.hyperparameters, AlgorithmKind::RandomForest.default_params());
    }

    #[test]
    fn test_params_replace_defaults() {
        let mut params = Hyperparams::new();
        params.insert("max_depth".to_string(), json!(3));
        let spec = resolve("rf", TaskType::Regression, Some(&params), FallbackPolicy::Strict).unwrap();

        assert_eq!(spec.hyperparameters, params);
        match spec.settings {
            EstimatorSettings::RandomForest { n_estimators, max_depth, .. } => {
                assert_eq!(n_estimators, 100);
                assert_eq!(max_depth, Some(3));
            }
            other => panic!("unexpected settings: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_params() {
        let mut unknown = Hyperparams::new();
        unknown.insert("n_trees".to_string(), json!(10));
        assert!(matches!(
            resolve("rf", TaskType::Regression, Some(&unknown), FallbackPolicy::Strict),
            Err(ModelHubError::ConfigError(_))
        ));

        let mut ill_typed = Hyperparams::new();
        ill_typed.insert("weights".to_string(), json!("cosine"));
        assert!(matches!(
            resolve("knn", TaskType::Classification, Some(&ill_typed), FallbackPolicy::Strict),
            Err(ModelHubError::ConfigError(_))
        ));

        let mut zero = Hyperparams::new();
        zero.insert("n_neighbors".to_string(), json!(0));
        assert!(resolve("knn", TaskType::Classification, Some(&zero), FallbackPolicy::Strict).is_err());
    }
}
