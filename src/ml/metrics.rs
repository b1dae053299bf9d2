//! Regression metrics for fit evaluation

use serde::{Deserialize, Serialize};

/// R² and RMSE of one predictor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    #[serde(rename = "R2")]
    pub r2: f64,
    #[serde(rename = "RMSE")]
    pub rmse: f64,
}

impl RegressionMetrics {
    pub fn compute(truth: &[f64], predicted: &[f64]) -> Self {
        Self {
            r2: r2_score(truth, predicted),
            rmse: rmse(truth, predicted),
        }
    }
}

/// Root mean squared error; 0 for empty input
pub fn rmse(truth: &[f64], predicted: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let sse: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    (sse / truth.len() as f64).sqrt()
}

/// Coefficient of determination
///
/// Constant truth gives 1.0 for a perfect fit and 0.0 otherwise.
pub fn r2_score(truth: &[f64], predicted: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let mean = truth.iter().sum::<f64>() / truth.len() as f64;
    let ss_res: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    let ss_tot: f64 = truth.iter().map(|t| (t - mean) * (t - mean)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
