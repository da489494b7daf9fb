//! Standard feature scaling

use crate::error::{ModelHubError, Result};
use serde::{Deserialize, Serialize};

/// Parameters for one fitted column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ScalerParams {
    center: f64, // mean
    scale: f64,  // population std, 1.0 for constant columns
}

/// Z-score scaler: (x - mean) / std
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scaler {
    params: Vec<(String, ScalerParams)>,
    is_fitted: bool,
}

impl Scaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit one column. Values must already be imputed.
    pub fn fit_column(&mut self, name: &str, values: &[f64]) -> &mut Self {
        let params = Self::compute_params(values);
        match self.params.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = params,
            None => self.params.push((name.to_string(), params)),
        }
        self.is_fitted = true;
        self
    }

    fn compute_params(values: &[f64]) -> ScalerParams {
        if values.is_empty() {
            return ScalerParams { center: 0.0, scale: 1.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        ScalerParams {
            center: mean,
            scale: if std > 1e-12 { std } else { 1.0 },
        }
    }

    /// Scale one column in place
    pub fn transform_column(&self, name: &str, values: &mut [f64]) -> Result<()> {
        if !self.is_fitted {
            return Err(ModelHubError::ModelNotFitted);
        }
        let (_, params) = self
            .params
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| ModelHubError::DataError(format!("scaler not fitted for column '{}'", name)))?;
        for v in values.iter_mut() {
            *v = (*v - params.center) / params.scale;
        }
        Ok(())
    }

    /// Fitted (mean, std) of a column
    pub fn params(&self, name: &str) -> Option<(f64, f64)> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| (p.center, p.scale))
    }
}
