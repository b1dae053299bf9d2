//! Global weight learner
//!
//! Fits one weight vector over a fitting set by plain gradient descent on
//! mean squared error, followed every step by a projection back onto the
//! simplex (clamp negatives, epsilon-guarded renormalization).

use super::contextual::{normalize, EnsembleConfig};
use crate::config::LearnerConfig;
use crate::error::{EnsembleError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Learned per-model weights, immutable once fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalWeights(Vec<f64>);

impl GlobalWeights {
    /// `1/n` for every model
    pub fn uniform(n: usize) -> Self {
        Self(vec![1.0 / n as f64; n])
    }

    /// Wrap an already-validated vector
    pub fn from_vec(weights: Vec<f64>) -> Result<Self> {
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(EnsembleError::InvalidWeights("non-finite entry".into()));
        }
        if weights.iter().any(|w| *w < 0.0) {
            return Err(EnsembleError::InvalidWeights("negative entry".into()));
        }
        Ok(Self(weights))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }
}

/// Gradient-descent learner for [`GlobalWeights`]
#[derive(Debug, Clone, Default)]
pub struct GlobalWeightLearner {
    config: LearnerConfig,
}

impl GlobalWeightLearner {
    pub fn new(config: LearnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Fit weights so that `predictions · w` tracks `truth`
    ///
    /// `predictions` holds one row per sample, each of length N.
    pub fn fit(
        &self,
        ensemble: EnsembleConfig,
        predictions: &[Vec<f64>],
        truth: &[f64],
    ) -> Result<GlobalWeights> {
        self.config.validate()?;
        let n_models = ensemble.model_count();
        if predictions.is_empty() {
            return Err(EnsembleError::EmptyFittingSet);
        }
        if predictions.len() != truth.len() {
            return Err(EnsembleError::LengthMismatch {
                what: "prediction rows vs truth",
                left: predictions.len(),
                right: truth.len(),
            });
        }
        for row in predictions {
            ensemble.ensure_len(row.len())?;
            if row.iter().any(|p| !p.is_finite()) {
                return Err(EnsembleError::NonFinite("base predictions"));
            }
        }
        if truth.iter().any(|t| !t.is_finite()) {
            return Err(EnsembleError::NonFinite("ground truth"));
        }

        let n_samples = predictions.len() as f64;
        let lr = self.config.learning_rate;
        let mut weights = vec![1.0 / n_models as f64; n_models];
        let mut gradient = vec![0.0; n_models];

        for step in 0..self.config.steps {
            gradient.iter_mut().for_each(|g| *g = 0.0);
            for (row, &target) in predictions.iter().zip(truth) {
                let residual = target - dot(row, &weights);
                for (g, p) in gradient.iter_mut().zip(row) {
                    *g += p * residual;
                }
            }
            for (w, g) in weights.iter_mut().zip(&gradient) {
                let grad = -2.0 * g / n_samples;
                *w -= lr * grad;
            }
            for w in weights.iter_mut() {
                *w = w.max(0.0);
            }
            normalize(&mut weights);

            if step + 1 == self.config.steps {
                debug!(
                    "[GlobalWeightLearner] step {} mse={:.6}",
                    step + 1,
                    mse(predictions, truth, &weights)
                );
            }
        }

        if weights.iter().any(|w| !w.is_finite()) {
            return Err(EnsembleError::NonFinite("learned global weights"));
        }
        if weights.iter().all(|w| *w == 0.0) {
            warn!("[GlobalWeightLearner] all global weights collapsed to zero");
        }

        GlobalWeights::from_vec(weights)
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn mse(predictions: &[Vec<f64>], truth: &[f64], weights: &[f64]) -> f64 {
    let total: f64 = predictions
        .iter()
        .zip(truth)
        .map(|(row, t)| {
            let e = t - dot(row, weights);
            e * e
        })
        .sum();
    total / truth.len() as f64
}
