//! Physiology drivers
//!
//! Two scalars steer the contextual weights:
//! - hydration gap: sweat loss minus water intake (litres)
//! - caloric balance: intake minus (basal metabolic rate + activity calories)
//!
//! No clipping happens here; each consumer applies its own thresholds.

use crate::error::{EnsembleError, Result};
use serde::{Deserialize, Serialize};

/// Raw per-sample physiology fields needed to derive the drivers
///
/// Field names match the dataset columns. Every field is optional so that
/// an absent value is reported instead of silently read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysioRecord {
    /// Sweat loss over the session (L)
    #[serde(rename = "sweat_loss_L", default)]
    pub sweat_loss_l: Option<f64>,
    /// Water intake over the session (L)
    #[serde(rename = "water_intake_L", default)]
    pub water_intake_l: Option<f64>,
    /// Calories consumed (kcal)
    #[serde(default)]
    pub calories_in: Option<f64>,
    /// Basal metabolic rate (kcal)
    #[serde(default)]
    pub bmr: Option<f64>,
    /// Calories burned by activity (kcal)
    #[serde(default)]
    pub activity_calories: Option<f64>,
}

impl PhysioRecord {
    pub fn new(
        sweat_loss_l: f64,
        water_intake_l: f64,
        calories_in: f64,
        bmr: f64,
        activity_calories: f64,
    ) -> Self {
        Self {
            sweat_loss_l: Some(sweat_loss_l),
            water_intake_l: Some(water_intake_l),
            calories_in: Some(calories_in),
            bmr: Some(bmr),
            activity_calories: Some(activity_calories),
        }
    }

    /// Derive the driver pair, naming the first absent field on failure
    pub fn drivers(&self) -> Result<DriverPair> {
        let sweat = require(self.sweat_loss_l, "sweat_loss_L")?;
        let water = require(self.water_intake_l, "water_intake_L")?;
        let calories_in = require(self.calories_in, "calories_in")?;
        let bmr = require(self.bmr, "bmr")?;
        let activity = require(self.activity_calories, "activity_calories")?;

        Ok(DriverPair {
            hydration_gap: sweat - water,
            caloric_balance: calories_in - (bmr + activity),
        })
    }
}

fn require(value: Option<f64>, field: &'static str) -> Result<f64> {
    value.ok_or(EnsembleError::MissingField { field })
}

/// Physiology drivers for one sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriverPair {
    /// Sweat loss minus water intake; positive means under-replaced fluid
    pub hydration_gap: f64,
    /// Intake minus expenditure; negative means caloric deficit
    pub caloric_balance: f64,
}

impl DriverPair {
    pub fn new(hydration_gap: f64, caloric_balance: f64) -> Self {
        Self {
            hydration_gap,
            caloric_balance,
        }
    }
}
