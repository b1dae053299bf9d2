//! Serving phase
//!
//! An [`EnsembleServer`] is built once from the available base models and a
//! resolved global weight vector. Per request it:
//! 1. checks the feature width against every model (before calling any)
//! 2. derives the physiology drivers
//! 3. runs the base models
//! 4. blends through the shared [`Combiner`]

use super::base_model::{check_feature_width, predict_one, BaseModel};
use super::blender::Combiner;
use super::contextual::EnsembleConfig;
use super::drivers::{DriverPair, PhysioRecord};
use super::risk::DehydrationRisk;
use super::weight_store::{LoadedWeights, WeightSource, WeightStore};
use crate::error::{EnsembleError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Final estimate of one request, with diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleEstimate {
    /// Blended, clipped hydration deficit (%)
    pub estimate: f64,
    pub risk: DehydrationRisk,
    pub drivers: DriverPair,
    /// Base predictions as returned by the models
    pub raw_predictions: Vec<f64>,
    pub clipped_predictions: Vec<f64>,
    pub contextual_weights: Vec<f64>,
    pub global_weights: Vec<f64>,
    pub contextual_estimate: f64,
    pub global_estimate: f64,
    /// Blend before the final clip
    pub raw_estimate: f64,
    pub weight_source: WeightSource,
}

/// Combines base models and global weights into per-request estimates
pub struct EnsembleServer {
    models: Vec<Box<dyn BaseModel>>,
    combiner: Combiner,
    source: WeightSource,
}

impl EnsembleServer {
    /// Build from base models (canonical order) and pre-resolved weights
    pub fn new(models: Vec<Box<dyn BaseModel>>, weights: LoadedWeights) -> Result<Self> {
        let config = EnsembleConfig::from_model_count(models.len())?;
        if config != weights.config {
            return Err(EnsembleError::ModelCountMismatch {
                expected: config.model_count(),
                actual: weights.config.model_count(),
            });
        }
        let combiner = Combiner::new(config, weights.weights)?;
        Ok(Self {
            models,
            combiner,
            source: weights.source,
        })
    }

    /// Build from base models, reading global weights from `store`
    pub fn from_store(models: Vec<Box<dyn BaseModel>>, store: &WeightStore) -> Result<Self> {
        let config = EnsembleConfig::from_model_count(models.len())?;
        let weights = store.load(config);
        Self::new(models, weights)
    }

    pub fn config(&self) -> EnsembleConfig {
        self.combiner.config()
    }

    pub fn weight_source(&self) -> &WeightSource {
        &self.source
    }

    /// Run every base model on `features` and blend
    pub fn predict(&self, features: &[f64], record: &PhysioRecord) -> Result<EnsembleEstimate> {
        check_feature_width(&self.models, features.len())?;
        let drivers = record.drivers()?;

        let raw_predictions = self
            .models
            .iter()
            .map(|m| predict_one(m.as_ref(), features))
            .collect::<Result<Vec<f64>>>()?;

        self.combine_drivers(&raw_predictions, drivers)
    }

    /// Blend predictions that were already computed by the base models
    pub fn combine(&self, raw_predictions: &[f64], record: &PhysioRecord) -> Result<EnsembleEstimate> {
        let drivers = record.drivers()?;
        self.combine_drivers(raw_predictions, drivers)
    }

    fn combine_drivers(&self, raw_predictions: &[f64], drivers: DriverPair) -> Result<EnsembleEstimate> {
        estimate(&self.combiner, &self.source, raw_predictions, drivers)
    }
}

/// Blend through `combiner` and attach diagnostics
pub fn estimate(
    combiner: &Combiner,
    source: &WeightSource,
    raw_predictions: &[f64],
    drivers: DriverPair,
) -> Result<EnsembleEstimate> {
    if raw_predictions.iter().any(|p| !p.is_finite()) {
        return Err(EnsembleError::NonFinite("base predictions"));
    }
    let blend = combiner.combine(raw_predictions, drivers)?;

    debug!(
        "[EnsembleServer] raw={:?} ctx={:.4} glob={:.4} blend={:.4} -> {:.4}",
        raw_predictions,
        blend.contextual_estimate,
        blend.global_estimate,
        blend.raw_estimate,
        blend.estimate
    );

    Ok(EnsembleEstimate {
        estimate: blend.estimate,
        risk: DehydrationRisk::from_estimate(blend.estimate),
        drivers,
        raw_predictions: raw_predictions.to_vec(),
        clipped_predictions: blend.clipped_predictions,
        contextual_weights: blend.contextual_weights,
        global_weights: combiner.global_weights().as_slice().to_vec(),
        contextual_estimate: blend.contextual_estimate,
        global_estimate: blend.global_estimate,
        raw_estimate: blend.raw_estimate,
        weight_source: source.clone(),
    })
}
