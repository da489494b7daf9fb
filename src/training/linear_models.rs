//! Linear model implementations

use crate::error::{ModelHubError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Relative pivot tolerance below which a normal-equation matrix is treated as singular
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Solve a symmetric positive-definite system Ax = b by Cholesky decomposition.
///
/// Returns `None` when a pivot falls below `PIVOT_TOLERANCE` relative to the
/// largest diagonal entry.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }
    let max_diag = a.diag().iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let floor = PIVOT_TOLERANCE * max_diag.max(f64::MIN_POSITIVE);

    // A = L * L^T
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= floor {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Gauss-Jordan elimination with partial pivoting (fallback)
fn gauss_jordan_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut aug = Array2::<f64>::zeros((n, n + 1));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n]] = b[i];
    }

    for col in 0..n {
        let max_row = (col..n)
            .max_by(|&r1, &r2| aug[[r1, col]].abs().total_cmp(&aug[[r2, col]].abs()))
            .unwrap_or(col);
        if max_row != col {
            for j in 0..=n {
                aug.swap([col, j], [max_row, j]);
            }
        }
        if aug[[col, col]].abs() < 1e-12 {
            return None;
        }
        let pivot = aug[[col, col]];
        for j in 0..=n {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..=n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    Some(aug.column(n).to_owned())
}

/// Solve (X^T X) w = X^T y.
///
/// Collinear designs (for example a full one-hot block next to an intercept)
/// are retried with a vanishing ridge term, which selects the small-norm solution.
fn solve_least_squares(x: &Array2<f64>, y: &Array1<f64>) -> Option<Array1<f64>> {
    let xtx = x.t().dot(x);
    let xty = x.t().dot(y);

    if let Some(w) = cholesky_solve(&xtx, &xty) {
        return Some(w);
    }

    let n = xtx.nrows().max(1);
    let ridge = (1e-8 * xtx.diag().sum() / n as f64).max(1e-12);
    let mut regularized = xtx.clone();
    for i in 0..xtx.nrows() {
        regularized[[i, i]] += ridge;
    }
    cholesky_solve(&regularized, &xty).or_else(|| gauss_jordan_solve(&regularized, &xty))
}

/// Ordinary least squares regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: f64,
    pub fit_intercept: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
        }
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Fit the model to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(ModelHubError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(ModelHubError::ValidationError(
                "cannot fit a linear model on zero samples".to_string(),
            ));
        }

        // Center data when fitting the intercept
        let (coefficients, intercept) = if self.fit_intercept {
            let x_mean = x
                .mean_axis(Axis(0))
                .ok_or_else(|| ModelHubError::ComputationError("empty design matrix".to_string()))?;
            let y_mean = y.mean().unwrap_or(0.0);
            let x_centered = x - &x_mean.view().insert_axis(Axis(0));
            let y_centered = y - y_mean;

            let w = solve_least_squares(&x_centered, &y_centered).ok_or_else(|| {
                ModelHubError::ComputationError("normal equations are singular".to_string())
            })?;
            let b = y_mean - w.dot(&x_mean);
            (w, b)
        } else {
            let w = solve_least_squares(x, y).ok_or_else(|| {
                ModelHubError::ComputationError("normal equations are singular".to_string())
            })?;
            (w, 0.0)
        };

        self.coefficients = Some(coefficients);
        self.intercept = intercept;
        Ok(self)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(ModelHubError::ModelNotFitted)?;
        if x.ncols() != coefficients.len() {
            return Err(ModelHubError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(coefficients) + self.intercept)
    }
}

/// L2-regularized multinomial logistic regression trained by batch gradient descent.
///
/// Targets are class codes `0..n_classes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Weights, shape (n_features, n_classes)
    pub weights: Option<Array2<f64>>,
    pub bias: Option<Array1<f64>>,
    pub alpha: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    pub tol: f64,
    n_classes: usize,
}

impl LogisticRegression {
    pub fn new(n_classes: usize) -> Self {
        Self {
            weights: None,
            bias: None,
            alpha: 0.01,
            max_iter: 1000,
            learning_rate: 0.1,
            tol: 1e-6,
            n_classes,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Row-wise softmax with max subtraction
    fn softmax(z: &mut Array2<f64>) {
        for mut row in z.rows_mut() {
            let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|v| v / sum);
        }
    }

    /// Fit the model to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let (n_samples, n_features) = x.dim();
        if n_samples != y.len() {
            return Err(ModelHubError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || self.n_classes == 0 {
            return Err(ModelHubError::ValidationError(
                "logistic regression needs samples and at least one class".to_string(),
            ));
        }

        let mut one_hot = Array2::<f64>::zeros((n_samples, self.n_classes));
        for (i, &class) in y.iter().enumerate() {
            if class < 0.0 || class as usize >= self.n_classes {
                return Err(ModelHubError::ValidationError(format!(
                    "class code {} out of range for {} classes",
                    class, self.n_classes
                )));
            }
            one_hot[[i, class as usize]] = 1.0;
        }

        let mut weights = Array2::<f64>::zeros((n_features, self.n_classes));
        let mut bias = Array1::<f64>::zeros(self.n_classes);
        let n = n_samples as f64;

        for _ in 0..self.max_iter {
            let mut proba = x.dot(&weights) + &bias;
            Self::softmax(&mut proba);
            let error = proba - &one_hot;

            let grad_w = x.t().dot(&error) / n + &(&weights * self.alpha);
            let grad_b = error.sum_axis(Axis(0)) / n;

            weights = weights - &(&grad_w * self.learning_rate);
            bias = bias - &(&grad_b * self.learning_rate);

            let step = grad_w
                .iter()
                .chain(grad_b.iter())
                .fold(0.0f64, |m, g| m.max(g.abs()))
                * self.learning_rate;
            if step < self.tol {
                break;
            }
        }

        self.weights = Some(weights);
        self.bias = Some(bias);
        Ok(self)
    }

    /// Class probabilities, one row per sample
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (weights, bias) = match (&self.weights, &self.bias) {
            (Some(w), Some(b)) => (w, b),
            _ => return Err(ModelHubError::ModelNotFitted),
        };
        if x.ncols() != weights.nrows() {
            return Err(ModelHubError::ShapeError {
                expected: format!("{} features", weights.nrows()),
                actual: format!("{} features", x.ncols()),
            });
        }
        let mut proba = x.dot(weights) + bias;
        Self::softmax(&mut proba);
        Ok(proba)
    }

    /// Most probable class code per sample
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| argmax(row.iter().copied()) as f64)
            .collect())
    }
}

/// Index of the largest value, first one on ties
pub(crate) fn argmax(values: impl Iterator<Item = f64>) -> usize {
    values
        .enumerate()
        .fold((0usize, f64::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_linear_regression_simple() {
        let x = array![[1.0, 1.0], [1.0, 2.0], [2.0, 2.0], [2.0, 3.0]];
        let y = array![6.0, 8.0, 9.0, 11.0]; // y = 1*x1 + 2*x2 + 3

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients.as_ref().unwrap();
        assert!((coef[0] - 1.0).abs() < 1e-6);
        assert!((coef[1] - 2.0).abs() < 1e-6);
        assert!((model.intercept - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_linear_regression_collinear_one_hot() {
        // Two one-hot columns that always sum to one
        let x = array![[1.0, 0.0], [0.0, 1.0], [1.0, 0.0], [0.0, 1.0]];
        let y = array![10.0, 20.0, 10.0, 20.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-4, "pred {} vs {}", p, t);
        }
    }

    #[test]
    fn test_logistic_regression_binary() {
        let x = array![[-2.0], [-1.5], [-1.0], [1.0], [1.5], [2.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::new(2);
        model.fit(&x, &y).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
        let proba = model.predict_proba(&x).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        assert!(proba[[0, 0]] > 0.5 && proba[[5, 1]] > 0.5);
    }

    #[test]
    fn test_logistic_regression_three_classes() {
        let x = array![
            [0.0, 0.0], [0.2, 0.1],
            [3.0, 0.0], [3.2, 0.1],
            [0.0, 3.0], [0.1, 3.2],
        ];
        let y = array![0.0, 0.0, 1.0, 1.0, 2.0, 2.0];

        let mut model = LogisticRegression::new(3).with_max_iter(2000);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
        assert_eq!(model.predict_proba(&x).unwrap().ncols(), 3);
    }

    #[test]
    fn test_unfitted_models() {
        assert!(matches!(
            LinearRegression::new().predict(&array![[1.0]]),
            Err(ModelHubError::ModelNotFitted)
        ));
        assert!(matches!(
            LogisticRegression::new(2).predict(&array![[1.0]]),
            Err(ModelHubError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_argmax_first_on_tie() {
        assert_eq!(argmax([0.5, 0.5].into_iter()), 0);
        assert_eq!(argmax([0.1, 0.7, 0.2].into_iter()), 1);
    }
}
