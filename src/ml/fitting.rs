//! Fitting phase
//!
//! Turns held-out base predictions into a global weight artifact:
//! - derive physiology drivers per sample (samples missing a field are skipped)
//! - clip base predictions and learn global weights against ground truth
//! - evaluate the blended ensemble through the same [`Combiner`] serving uses

use super::blender::{clip, Blend, Combiner};
use super::contextual::EnsembleConfig;
use super::drivers::{DriverPair, PhysioRecord};
use super::global::GlobalWeightLearner;
use super::metrics::RegressionMetrics;
use super::weight_store::{WeightArtifact, WeightStore};
use crate::config::LearnerConfig;
use crate::error::{EnsembleError, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::{info, warn};

/// One held-out sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSample {
    /// Raw base predictions in canonical model order
    pub predictions: Vec<f64>,
    /// Physiology fields used for the drivers
    pub record: PhysioRecord,
    /// Observed hydration deficit (%)
    pub truth: f64,
}

/// Metrics of one base model on the fitting set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub model: String,
    #[serde(flatten)]
    pub metrics: RegressionMetrics,
}

/// Ensemble estimate of one fitting sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitPrediction {
    pub y_true: f64,
    pub y_pred: f64,
}

/// Evaluation summary of a fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub config: EnsembleConfig,
    pub global_weights: Vec<f64>,
    pub samples_used: usize,
    pub samples_skipped: usize,
    pub base_models: Vec<ModelMetrics>,
    /// Contextual weights alone
    pub contextual: RegressionMetrics,
    /// Global weights alone
    pub global: RegressionMetrics,
    /// Final blended and clipped ensemble
    pub ensemble: RegressionMetrics,
    pub predictions: Vec<FitPrediction>,
}

/// Everything a fit produces
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub artifact: WeightArtifact,
    pub combiner: Combiner,
    pub report: FitReport,
}

/// Fits global weights for one ensemble layout
#[derive(Debug, Clone)]
pub struct EnsembleFitter {
    config: EnsembleConfig,
    learner: GlobalWeightLearner,
}

impl EnsembleFitter {
    pub fn new(config: EnsembleConfig, learner: LearnerConfig) -> Self {
        Self {
            config,
            learner: GlobalWeightLearner::new(learner),
        }
    }

    /// Pick the layout from the first sample's prediction count
    pub fn for_samples(samples: &[FitSample], learner: LearnerConfig) -> Result<Self> {
        let first = samples.first().ok_or(EnsembleError::EmptyFittingSet)?;
        let config = EnsembleConfig::from_model_count(first.predictions.len())?;
        Ok(Self::new(config, learner))
    }

    pub fn config(&self) -> EnsembleConfig {
        self.config
    }

    /// Learn global weights and evaluate the ensemble on `samples`
    pub fn fit(&self, samples: &[FitSample]) -> Result<FitOutcome> {
        let mut used: Vec<(&FitSample, DriverPair)> = Vec::with_capacity(samples.len());
        let mut skipped = 0usize;

        for (idx, sample) in samples.iter().enumerate() {
            self.config.ensure_len(sample.predictions.len())?;
            if sample.predictions.iter().any(|p| !p.is_finite()) {
                return Err(EnsembleError::NonFinite("base predictions"));
            }
            if !sample.truth.is_finite() {
                return Err(EnsembleError::NonFinite("ground truth"));
            }
            match sample.record.drivers() {
                Ok(drivers) => used.push((sample, drivers)),
                Err(EnsembleError::MissingField { field }) => {
                    warn!("[EnsembleFitter] skipping sample {}: missing '{}'", idx, field);
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if used.is_empty() {
            return Err(EnsembleError::EmptyFittingSet);
        }

        let rows: Vec<Vec<f64>> = used
            .iter()
            .map(|(s, _)| s.predictions.iter().map(|p| clip(*p)).collect())
            .collect();
        let truth: Vec<f64> = used.iter().map(|(s, _)| s.truth).collect();

        let weights = self.learner.fit(self.config, &rows, &truth)?;
        let combiner = Combiner::new(self.config, weights.clone())?;

        let blends: Vec<Blend> = used
            .iter()
            .map(|(s, d)| combiner.combine(&s.predictions, *d))
            .collect::<Result<_>>()?;

        let report = self.report(&rows, &truth, &blends, combiner.global_weights().as_slice(), skipped);

        info!(
            "[EnsembleFitter] {:?}: {} samples ({} skipped), weights={:?}, R2={:.4}, RMSE={:.4}",
            self.config,
            report.samples_used,
            report.samples_skipped,
            report.global_weights,
            report.ensemble.r2,
            report.ensemble.rmse
        );

        Ok(FitOutcome {
            artifact: WeightArtifact::new(self.config, &weights, used.len()),
            combiner,
            report,
        })
    }

    /// Fit, then persist the artifact
    pub fn fit_and_save(&self, samples: &[FitSample], store: &WeightStore) -> Result<FitOutcome> {
        let outcome = self.fit(samples)?;
        store.save(&outcome.artifact)?;
        Ok(outcome)
    }

    fn report(
        &self,
        rows: &[Vec<f64>],
        truth: &[f64],
        blends: &[Blend],
        global_weights: &[f64],
        skipped: usize,
    ) -> FitReport {
        let base_models = self
            .config
            .model_names()
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
                ModelMetrics {
                    model: name.to_string(),
                    metrics: RegressionMetrics::compute(truth, &column),
                }
            })
            .collect();

        let contextual: Vec<f64> = blends.iter().map(|b| b.contextual_estimate).collect();
        let global: Vec<f64> = blends.iter().map(|b| b.global_estimate).collect();
        let ensemble: Vec<f64> = blends.iter().map(|b| b.estimate).collect();

        FitReport {
            config: self.config,
            global_weights: global_weights.to_vec(),
            samples_used: truth.len(),
            samples_skipped: skipped,
            base_models,
            contextual: RegressionMetrics::compute(truth, &contextual),
            global: RegressionMetrics::compute(truth, &global),
            ensemble: RegressionMetrics::compute(truth, &ensemble),
            predictions: truth
                .iter()
                .zip(&ensemble)
                .map(|(t, p)| FitPrediction { y_true: *t, y_pred: *p })
                .collect(),
        }
    }
}

impl FitReport {
    /// Write the report as pretty JSON
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
