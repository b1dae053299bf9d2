//! Global weight persistence
//!
//! The only state shared between the fitting and serving phases. Writes are
//! strict; reads never fail and fall back to uniform weights instead, so a
//! stale or missing artifact degrades serving rather than stopping it.

use super::contextual::{normalize, EnsembleConfig};
use super::global::GlobalWeights;
use crate::error::{EnsembleError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Current artifact layout version
pub const FORMAT_VERSION: u32 = 1;

/// Sum drift tolerated before a stored vector is renormalized
const SUM_TOLERANCE: f64 = 1e-6;

fn default_format_version() -> u32 {
    FORMAT_VERSION
}

/// Persisted global weights with provenance
///
/// Only `global_weights` is required, so files holding just that key load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightArtifact {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    pub global_weights: Vec<f64>,
    /// Base model order the weights were fit against
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub model_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<usize>,
}

impl WeightArtifact {
    /// Artifact for freshly learned weights
    pub fn new(config: EnsembleConfig, weights: &GlobalWeights, sample_count: usize) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            global_weights: weights.as_slice().to_vec(),
            model_names: config.model_names().iter().map(|s| s.to_string()).collect(),
            fitted_at: Some(Utc::now()),
            sample_count: Some(sample_count),
        }
    }

    /// Resolve the vector for `config`, or explain why it is unusable
    pub fn weights_for(&self, config: EnsembleConfig) -> std::result::Result<GlobalWeights, String> {
        if self.format_version > FORMAT_VERSION {
            return Err(format!(
                "unknown format_version {} (max {})",
                self.format_version, FORMAT_VERSION
            ));
        }

        let n = config.model_count();
        if self.global_weights.len() < n {
            return Err(format!(
                "{} entries stored, {} models active",
                self.global_weights.len(),
                n
            ));
        }

        let mut weights = match self.reorder_by_name(config) {
            Some(reordered) => reordered,
            None => self.global_weights[..n].to_vec(),
        };
        let reshaped = self.global_weights.len() != n || weights[..] != self.global_weights[..n];

        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("negative or non-finite entry".to_string());
        }

        let total: f64 = weights.iter().sum();
        if reshaped || (total - 1.0).abs() > SUM_TOLERANCE {
            normalize(&mut weights);
        }

        GlobalWeights::from_vec(weights).map_err(|e| e.to_string())
    }

    /// Reorder by `model_names` when the record names every active model
    fn reorder_by_name(&self, config: EnsembleConfig) -> Option<Vec<f64>> {
        if self.model_names.len() != self.global_weights.len() {
            return None;
        }
        config
            .model_names()
            .iter()
            .map(|name| {
                self.model_names
                    .iter()
                    .position(|stored| stored == name)
                    .map(|idx| self.global_weights[idx])
            })
            .collect()
    }
}

/// Where serving-phase global weights came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeightSource {
    /// Read from a weight store file
    Stored { path: PathBuf },
    /// Uniform substitute; the store was unusable
    Fallback { reason: String },
    /// Produced in-process by the fitting phase
    Fitted,
}

impl WeightSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, WeightSource::Fallback { .. })
    }
}

/// Global weights resolved for one layout, plus their origin
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedWeights {
    pub config: EnsembleConfig,
    pub weights: GlobalWeights,
    pub source: WeightSource,
}

impl LoadedWeights {
    /// Uniform weights for `config`
    pub fn uniform(config: EnsembleConfig, reason: impl Into<String>) -> Self {
        Self {
            config,
            weights: GlobalWeights::uniform(config.model_count()),
            source: WeightSource::Fallback {
                reason: reason.into(),
            },
        }
    }
}

/// JSON-file backed weight store
#[derive(Debug, Clone)]
pub struct WeightStore {
    path: PathBuf,
}

impl WeightStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist an artifact atomically (temp file + rename)
    pub fn save(&self, artifact: &WeightArtifact) -> Result<()> {
        if artifact.global_weights.is_empty() {
            return Err(EnsembleError::InvalidWeights("empty vector".into()));
        }
        GlobalWeights::from_vec(artifact.global_weights.clone())?;

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        if let Err(err) = write_and_rename(&tmp, &self.path, artifact) {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }

        info!(
            "[WeightStore] saved {} global weights to {}",
            artifact.global_weights.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Read the raw artifact, strictly
    pub fn read_artifact(&self) -> Result<WeightArtifact> {
        let file = File::open(&self.path).map_err(|e| EnsembleError::WeightStore {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let artifact = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            EnsembleError::WeightStore {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(artifact)
    }

    /// Load weights for `config`, substituting uniform weights on any problem
    pub fn load(&self, config: EnsembleConfig) -> LoadedWeights {
        let resolved = self
            .read_artifact()
            .and_then(|artifact| {
                artifact
                    .weights_for(config)
                    .map_err(|reason| EnsembleError::WeightStore {
                        path: self.path.clone(),
                        reason,
                    })
            });

        match resolved {
            Ok(weights) => LoadedWeights {
                config,
                weights,
                source: WeightSource::Stored {
                    path: self.path.clone(),
                },
            },
            Err(e) => {
                warn!("[WeightStore] {}; using uniform global weights", e);
                LoadedWeights::uniform(config, e.to_string())
            }
        }
    }
}

fn write_and_rename(tmp: &Path, path: &Path, artifact: &WeightArtifact) -> Result<()> {
    {
        let file = File::create(tmp)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, artifact)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    fs::rename(tmp, path)?;
    Ok(())
}
