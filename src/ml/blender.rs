//! Contextual + global blending
//!
//! Both phases combine predictions here and nowhere else:
//! 1. clip every base prediction to the physiologic range
//! 2. contextual estimate = P · contextual weights (recomputed per sample)
//! 3. global estimate = P · global weights (fixed)
//! 4. blend 50/50 and clip again

use super::contextual::{contextual_weights, EnsembleConfig};
use super::drivers::DriverPair;
use super::global::{dot, GlobalWeights};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Lower plausibility bound for hydration deficit (%)
pub const CLIP_MIN: f64 = -30.0;
/// Upper plausibility bound for hydration deficit (%)
pub const CLIP_MAX: f64 = 80.0;
/// Share of the contextual estimate in the final blend
pub const CONTEXTUAL_SHARE: f64 = 0.5;

/// Clamp a value into `[CLIP_MIN, CLIP_MAX]`
///
/// NaN passes through unchanged; callers reject non-finite input first.
pub fn clip(value: f64) -> f64 {
    value.clamp(CLIP_MIN, CLIP_MAX)
}

/// Intermediate values of one blend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blend {
    /// Base predictions after clipping
    pub clipped_predictions: Vec<f64>,
    pub contextual_weights: Vec<f64>,
    pub contextual_estimate: f64,
    pub global_estimate: f64,
    /// Blend before the final clip
    pub raw_estimate: f64,
    /// Blend after the final clip
    pub estimate: f64,
}

/// Blend already-clipped predictions with explicit weight vectors
fn blend(clipped: &[f64], contextual: &[f64], global: &[f64]) -> (f64, f64, f64, f64) {
    let contextual_estimate = dot(clipped, contextual);
    let global_estimate = dot(clipped, global);
    let raw = CONTEXTUAL_SHARE * contextual_estimate + (1.0 - CONTEXTUAL_SHARE) * global_estimate;
    (contextual_estimate, global_estimate, raw, clip(raw))
}

/// Pure combination path shared by the fitting and serving phases
#[derive(Debug, Clone, PartialEq)]
pub struct Combiner {
    config: EnsembleConfig,
    global: GlobalWeights,
}

impl Combiner {
    /// Build a combiner; the global vector must match the layout's model count
    pub fn new(config: EnsembleConfig, global: GlobalWeights) -> Result<Self> {
        config.ensure_len(global.len())?;
        Ok(Self { config, global })
    }

    pub fn config(&self) -> EnsembleConfig {
        self.config
    }

    pub fn global_weights(&self) -> &GlobalWeights {
        &self.global
    }

    /// Combine one sample's raw base predictions
    pub fn combine(&self, raw_predictions: &[f64], drivers: DriverPair) -> Result<Blend> {
        self.config.ensure_len(raw_predictions.len())?;

        let clipped_predictions: Vec<f64> = raw_predictions.iter().map(|p| clip(*p)).collect();
        let contextual = contextual_weights(self.config, drivers);
        let (contextual_estimate, global_estimate, raw_estimate, estimate) =
            blend(&clipped_predictions, &contextual, self.global.as_slice());

        Ok(Blend {
            clipped_predictions,
            contextual_weights: contextual,
            contextual_estimate,
            global_estimate,
            raw_estimate,
            estimate,
        })
    }
}
