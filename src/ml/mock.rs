//! Offline base models for tests and dry runs

use super::base_model::BaseModel;
use crate::error::{EnsembleError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns the same value for every row and counts calls
#[derive(Debug)]
pub struct StaticModel {
    name: String,
    feature_count: usize,
    value: f64,
    calls: AtomicUsize,
}

impl StaticModel {
    pub fn new(name: &str, feature_count: usize, value: f64) -> Self {
        Self {
            name: name.to_string(),
            feature_count,
            value,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `predict` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BaseModel for StaticModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![self.value; rows.len()])
    }
}

/// Linear regressor `intercept + coef · x`
#[derive(Debug, Clone)]
pub struct LinearModel {
    name: String,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    pub fn new(name: &str, coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            name: name.to_string(),
            coefficients,
            intercept,
        }
    }
}

impl BaseModel for LinearModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_count(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter()
            .map(|row| {
                if row.len() != self.coefficients.len() {
                    return Err(EnsembleError::Model {
                        model: self.name.clone(),
                        reason: format!("row has {} features", row.len()),
                    });
                }
                Ok(self.intercept
                    + row
                        .iter()
                        .zip(&self.coefficients)
                        .map(|(x, c)| x * c)
                        .sum::<f64>())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_model_counts_calls() {
        let m = StaticModel::new("rf", 3, 4.0);
        let out = m.predict(&[vec![0.0; 3], vec![1.0; 3]]).unwrap();
        assert_eq!(out, vec![4.0, 4.0]);
        assert_eq!(m.calls(), 1);
    }

    #[test]
    fn test_linear_model() {
        let m = LinearModel::new("gb", vec![1.0, 2.0], 0.5);
        assert_eq!(m.predict(&[vec![1.0, 1.0]]).unwrap(), vec![3.5]);
        assert!(m.predict(&[vec![1.0]]).is_err());
    }
}
