//! Base regressor contract
//!
//! Base models are trained elsewhere. The combiner only needs their name,
//! their expected input width and a batch `predict`.

use crate::error::{EnsembleError, Result};

/// An externally trained regressor
pub trait BaseModel: Send + Sync {
    /// Identifier used in diagnostics and mismatch reports
    fn name(&self) -> &str;

    /// Number of features each input row must have
    fn feature_count(&self) -> usize;

    /// One scalar per input row
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>>;
}

/// Verify every model accepts `width` features before any model is called
pub fn check_feature_width(models: &[Box<dyn BaseModel>], width: usize) -> Result<()> {
    for model in models {
        if model.feature_count() != width {
            return Err(EnsembleError::ConfigMismatch {
                model: model.name().to_string(),
                expected: model.feature_count(),
                actual: width,
            });
        }
    }
    Ok(())
}

/// Predict a single row with one model, checking the output shape
pub fn predict_one(model: &dyn BaseModel, features: &[f64]) -> Result<f64> {
    let rows = [features.to_vec()];
    let out = model.predict(&rows)?;
    match out.as_slice() {
        [value] if value.is_finite() => Ok(*value),
        [value] => Err(EnsembleError::Model {
            model: model.name().to_string(),
            reason: format!("non-finite prediction {}", value),
        }),
        other => Err(EnsembleError::Model {
            model: model.name().to_string(),
            reason: format!("expected 1 output, got {}", other.len()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::mock::StaticModel;

    #[test]
    fn test_width_check_passes() {
        let models: Vec<Box<dyn BaseModel>> = vec![
            Box::new(StaticModel::new("rf", 5, 1.0)),
            Box::new(StaticModel::new("gb", 5, 2.0)),
        ];
        assert!(check_feature_width(&models, 5).is_ok());
    }

    #[test]
    fn test_width_check_names_offender() {
        let models: Vec<Box<dyn BaseModel>> = vec![
            Box::new(StaticModel::new("rf", 5, 1.0)),
            Box::new(StaticModel::new("mlp", 7, 2.0)),
        ];
        match check_feature_width(&models, 5) {
            Err(EnsembleError::ConfigMismatch { model, expected, actual }) => {
                assert_eq!(model, "mlp");
                assert_eq!(expected, 7);
                assert_eq!(actual, 5);
            }
            other => panic!("expected ConfigMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_predict_one_rejects_nan() {
        let model = StaticModel::new("rf", 2, f64::NAN);
        assert!(matches!(
            predict_one(&model, &[1.0, 2.0]),
            Err(EnsembleError::Model { .. })
        ));
    }

    #[test]
    fn test_predict_one_value() {
        let model = StaticModel::new("rf", 2, 7.5);
        assert_eq!(predict_one(&model, &[1.0, 2.0]).unwrap(), 7.5);
        assert_eq!(model.calls(), 1);
    }
}
