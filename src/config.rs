//! Runtime settings
//!
//! Loaded from a TOML file (path from `--config` or `HAAE_CONFIG`).
//! Every field has a default, so a missing file or a partial file is fine.
//! The contextual coefficient tables and the clip bounds are not settings.

use crate::error::{EnsembleError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the settings file
pub const CONFIG_ENV: &str = "HAAE_CONFIG";

/// Gradient descent parameters for the global weight learner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Number of gradient steps
    pub steps: usize,
    /// Step size
    pub learning_rate: f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            steps: 50,
            learning_rate: 0.05,
        }
    }
}

impl LearnerConfig {
    /// Reject zero steps and non-positive or non-finite step sizes
    pub fn validate(&self) -> Result<()> {
        if self.steps == 0 {
            return Err(EnsembleError::Config("learner.steps must be > 0".into()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(EnsembleError::Config(
                "learner.learning_rate must be a positive finite number".into(),
            ));
        }
        Ok(())
    }
}

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub learner: LearnerConfig,
    /// Where the fitting phase writes, and the serving phase reads, global weights
    pub weights_path: PathBuf,
    /// Optional fit report destination
    pub report_path: Option<PathBuf>,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            learner: LearnerConfig::default(),
            weights_path: PathBuf::from("outputs/haae/HAAE_weights.json"),
            report_path: None,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(text).map_err(|e| EnsembleError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Resolve settings: explicit path first, then `HAAE_CONFIG`, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => Self::from_file(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        self.learner.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.learner.steps, 50);
        assert_eq!(settings.learner.learning_rate, 0.05);
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            weights_path = "/tmp/w.json"

            [learner]
            steps = 200
            "#,
        )
        .unwrap();
        assert_eq!(settings.learner.steps, 200);
        assert_eq!(settings.learner.learning_rate, 0.05);
        assert_eq!(settings.weights_path, PathBuf::from("/tmp/w.json"));
        assert!(settings.report_path.is_none());
    }

    #[test]
    fn test_rejects_zero_steps() {
        let err = Settings::from_toml_str("[learner]\nsteps = 0\n").unwrap_err();
        assert!(matches!(err, EnsembleError::Config(_)));
    }

    #[test]
    fn test_rejects_bad_learning_rate() {
        let err = Settings::from_toml_str("[learner]\nlearning_rate = -1.0\n").unwrap_err();
        assert!(matches!(err, EnsembleError::Config(_)));
    }

    #[test]
    fn test_learner_validate() {
        assert!(LearnerConfig::default().validate().is_ok());
        for bad in [
            LearnerConfig { steps: 0, learning_rate: 0.05 },
            LearnerConfig { steps: 50, learning_rate: 0.0 },
            LearnerConfig { steps: 50, learning_rate: -1.0 },
            LearnerConfig { steps: 50, learning_rate: f64::NAN },
        ] {
            assert!(matches!(bad.validate(), Err(EnsembleError::Config(_))));
        }
    }

    #[test]
    fn test_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "log_filter = \"debug\"\n").unwrap();
        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.log_filter, "debug");
    }
}
