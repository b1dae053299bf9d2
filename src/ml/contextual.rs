//! Contextual (physiology-driven) weights
//!
//! Each base model gets `base + boost * I(trigger)` where the trigger is a
//! fixed physiological stress signature. The raw weights are normalized
//! per sample with an epsilon-guarded sum, so an all-zero row cannot divide
//! by zero. The tables below are fixed; they are not runtime settings.

use super::drivers::DriverPair;
use crate::error::{EnsembleError, Result};
use serde::{Deserialize, Serialize};

/// Guard added to every normalization denominator
pub const WEIGHT_EPSILON: f64 = 1e-9;

/// Ensemble layout, selected once from the number of available base models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnsembleConfig {
    /// Random forest, gradient boosting, MLP
    ThreeModel,
    /// Random forest, gradient boosting, MLP, LSTM
    FourModel,
}

/// Physiological condition that switches on a weight boost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// hydration_gap > 0
    FluidDeficit,
    /// caloric_balance < 0
    CaloricDeficit,
    /// |caloric_balance| > 300 or hydration_gap > 10
    MetabolicStress,
    /// hydration_gap > 5 or |caloric_balance| > 500
    SustainedStress,
}

impl Trigger {
    fn fires(self, drivers: DriverPair) -> bool {
        let gap = drivers.hydration_gap;
        let balance = drivers.caloric_balance;
        match self {
            Trigger::FluidDeficit => gap > 0.0,
            Trigger::CaloricDeficit => balance < 0.0,
            Trigger::MetabolicStress => balance.abs() > 300.0 || gap > 10.0,
            Trigger::SustainedStress => gap > 5.0 || balance.abs() > 500.0,
        }
    }
}

/// One row of a coefficient table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightRule {
    pub base: f64,
    pub boost: f64,
    pub trigger: Trigger,
}

impl WeightRule {
    const fn new(base: f64, boost: f64, trigger: Trigger) -> Self {
        Self { base, boost, trigger }
    }

    fn raw_weight(&self, drivers: DriverPair) -> f64 {
        let indicator = if self.trigger.fires(drivers) { 1.0 } else { 0.0 };
        self.base + self.boost * indicator
    }
}

const THREE_MODEL_RULES: [WeightRule; 3] = [
    WeightRule::new(0.4, 0.3, Trigger::FluidDeficit),
    WeightRule::new(0.3, 0.2, Trigger::CaloricDeficit),
    WeightRule::new(0.3, 0.2, Trigger::MetabolicStress),
];

const FOUR_MODEL_RULES: [WeightRule; 4] = [
    WeightRule::new(0.25, 0.15, Trigger::CaloricDeficit),
    WeightRule::new(0.35, 0.25, Trigger::FluidDeficit),
    WeightRule::new(0.25, 0.15, Trigger::MetabolicStress),
    WeightRule::new(0.15, 0.20, Trigger::SustainedStress),
];

const THREE_MODEL_NAMES: [&str; 3] = ["random_forest", "gradient_boosting", "mlp"];
const FOUR_MODEL_NAMES: [&str; 4] = ["random_forest", "gradient_boosting", "mlp", "lstm"];

impl EnsembleConfig {
    /// Pick the layout for the number of base models actually available
    pub fn from_model_count(count: usize) -> Result<Self> {
        match count {
            3 => Ok(Self::ThreeModel),
            4 => Ok(Self::FourModel),
            n => Err(EnsembleError::UnsupportedModelCount(n)),
        }
    }

    /// N, the length of every prediction and weight vector
    pub fn model_count(&self) -> usize {
        self.rules().len()
    }

    /// Canonical base model order
    pub fn model_names(&self) -> &'static [&'static str] {
        match self {
            Self::ThreeModel => &THREE_MODEL_NAMES,
            Self::FourModel => &FOUR_MODEL_NAMES,
        }
    }

    /// Coefficient table for this layout
    pub fn rules(&self) -> &'static [WeightRule] {
        match self {
            Self::ThreeModel => &THREE_MODEL_RULES,
            Self::FourModel => &FOUR_MODEL_RULES,
        }
    }

    /// Fail unless `len` matches this layout's model count
    pub fn ensure_len(&self, len: usize) -> Result<()> {
        if len != self.model_count() {
            return Err(EnsembleError::ModelCountMismatch {
                expected: self.model_count(),
                actual: len,
            });
        }
        Ok(())
    }
}

/// Divide by `sum + epsilon`; an all-zero vector stays all-zero
pub fn normalize(weights: &mut [f64]) {
    let total: f64 = weights.iter().sum();
    for w in weights.iter_mut() {
        *w /= total + WEIGHT_EPSILON;
    }
}

/// Contextual weights for one sample
///
/// This is the only implementation of the formula; fitting and serving
/// both reach it through [`crate::ml::Combiner`].
pub fn contextual_weights(config: EnsembleConfig, drivers: DriverPair) -> Vec<f64> {
    let mut weights: Vec<f64> = config
        .rules()
        .iter()
        .map(|rule| rule.raw_weight(drivers))
        .collect();
    normalize(&mut weights);
    weights
}

/// Contextual weights for a batch, one independent row per sample
pub fn contextual_weight_rows(config: EnsembleConfig, drivers: &[DriverPair]) -> Vec<Vec<f64>> {
    drivers
        .iter()
        .map(|d| contextual_weights(config, *d))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sum(w: &[f64]) -> f64 {
        w.iter().sum()
    }

    #[test]
    fn test_three_model_reference_case() {
        let w = contextual_weights(EnsembleConfig::ThreeModel, DriverPair::new(1.5, -50.0));
        // raw [0.7, 0.5, 0.3]
        assert_abs_diff_eq!(w[0], 0.7 / 1.5, epsilon = 1e-6);
        assert_abs_diff_eq!(w[1], 0.5 / 1.5, epsilon = 1e-6);
        assert_abs_diff_eq!(w[2], 0.3 / 1.5, epsilon = 1e-6);
    }

    #[test]
    fn test_three_model_no_stress() {
        let w = contextual_weights(EnsembleConfig::ThreeModel, DriverPair::new(-1.0, 100.0));
        // raw [0.4, 0.3, 0.3]
        assert_abs_diff_eq!(w[0], 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(w[1], 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(w[2], 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_four_model_all_triggers() {
        let w = contextual_weights(EnsembleConfig::FourModel, DriverPair::new(12.0, -600.0));
        // raw [0.40, 0.60, 0.40, 0.35], sum 1.75
        assert_abs_diff_eq!(w[0], 0.40 / 1.75, epsilon = 1e-6);
        assert_abs_diff_eq!(w[1], 0.60 / 1.75, epsilon = 1e-6);
        assert_abs_diff_eq!(w[2], 0.40 / 1.75, epsilon = 1e-6);
        assert_abs_diff_eq!(w[3], 0.35 / 1.75, epsilon = 1e-6);
    }

    #[test]
    fn test_four_model_sequence_trigger_on_gap_only() {
        // gap 6 fires fluid + sustained, not metabolic (|cb| <= 300, gap <= 10)
        let w = contextual_weights(EnsembleConfig::FourModel, DriverPair::new(6.0, 100.0));
        let raw = [0.25, 0.60, 0.25, 0.35];
        let total: f64 = raw.iter().sum();
        for (got, r) in w.iter().zip(raw.iter()) {
            assert_abs_diff_eq!(*got, r / total, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_thresholds_are_strict() {
        // exactly at the thresholds nothing fires
        let w = contextual_weights(EnsembleConfig::ThreeModel, DriverPair::new(0.0, 300.0));
        assert_abs_diff_eq!(w[0], 0.4, epsilon = 1e-6);
        let w = contextual_weights(EnsembleConfig::FourModel, DriverPair::new(5.0, 0.0));
        // caloric 0 is not a deficit; gap 5 fires fluid only
        let raw = [0.25, 0.60, 0.25, 0.15];
        let total: f64 = raw.iter().sum();
        assert_abs_diff_eq!(w[3], 0.15 / total, epsilon = 1e-6);
    }

    #[test]
    fn test_weights_in_unit_range_and_sum_to_one() {
        let gaps = [-20.0, -1.0, 0.0, 0.5, 5.0, 5.5, 10.0, 10.5, 40.0];
        let balances = [-2000.0, -501.0, -300.5, -1.0, 0.0, 250.0, 300.5, 600.0, 5000.0];
        for config in [EnsembleConfig::ThreeModel, EnsembleConfig::FourModel] {
            for &g in &gaps {
                for &b in &balances {
                    let w = contextual_weights(config, DriverPair::new(g, b));
                    assert_eq!(w.len(), config.model_count());
                    assert!(w.iter().all(|x| (0.0..=1.0).contains(x)));
                    assert_abs_diff_eq!(sum(&w), 1.0, epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_non_finite_drivers_degrade_to_base() {
        let w = contextual_weights(EnsembleConfig::ThreeModel, DriverPair::new(f64::NAN, f64::NAN));
        assert_abs_diff_eq!(w[0], 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(sum(&w), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_all_zero() {
        let mut w = vec![0.0, 0.0, 0.0];
        normalize(&mut w);
        assert_eq!(w, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_from_model_count() {
        assert_eq!(EnsembleConfig::from_model_count(3).unwrap(), EnsembleConfig::ThreeModel);
        assert_eq!(EnsembleConfig::from_model_count(4).unwrap(), EnsembleConfig::FourModel);
        assert!(matches!(
            EnsembleConfig::from_model_count(5),
            Err(EnsembleError::UnsupportedModelCount(5))
        ));
        assert_eq!(EnsembleConfig::FourModel.model_names()[3], "lstm");
    }

    #[test]
    fn test_batch_rows_match_single() {
        let drivers = vec![DriverPair::new(1.0, -400.0), DriverPair::new(-2.0, 50.0)];
        let rows = contextual_weight_rows(EnsembleConfig::FourModel, &drivers);
        for (row, d) in rows.iter().zip(drivers.iter()) {
            assert_eq!(row, &contextual_weights(EnsembleConfig::FourModel, *d));
        }
    }
}
