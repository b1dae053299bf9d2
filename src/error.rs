//! Error types for the ensemble combiner

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while fitting or serving the ensemble
#[derive(Debug, Error)]
pub enum EnsembleError {
    /// Feature vector width disagrees with a base model's declared width
    #[error("model '{model}' expects {expected} features, sample has {actual}")]
    ConfigMismatch {
        model: String,
        expected: usize,
        actual: usize,
    },

    /// A raw field needed for driver extraction is absent
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    /// Number of predictions or weights disagrees with the active configuration
    #[error("expected {expected} models, got {actual}")]
    ModelCountMismatch { expected: usize, actual: usize },

    /// Only 3- and 4-model ensembles carry a coefficient table
    #[error("unsupported ensemble size: {0} base models (expected 3 or 4)")]
    UnsupportedModelCount(usize),

    /// Paired inputs of different length (predictions vs truth)
    #[error("length mismatch: {what} ({left} vs {right})")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    #[error("fitting set is empty")]
    EmptyFittingSet,

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    /// Weights that may not be persisted (negative or non-finite)
    #[error("invalid global weights: {0}")]
    InvalidWeights(String),

    /// Weight store could not provide a usable vector
    #[error("weight store {path:?} unavailable: {reason}")]
    WeightStore { path: PathBuf, reason: String },

    /// A base model failed or returned a malformed output
    #[error("base model '{model}' failed: {reason}")]
    Model { model: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EnsembleError>;
