//! Hydration-deficit ensemble combiner
//!
//! Blends the outputs of externally trained base regressors into one
//! estimate using physiology-driven contextual weights and learned global
//! weights. See [`ml`] for the fitting and serving phases.

pub mod config;
pub mod error;
pub mod ml;

pub use config::{LearnerConfig, Settings};
pub use error::{EnsembleError, Result};
