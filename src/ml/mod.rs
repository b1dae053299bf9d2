//! Hydration-aware adaptive ensemble
//!
//! Combines base regressor outputs into one hydration-deficit estimate:
//! - Physiology drivers (hydration gap, caloric balance)
//! - Contextual weights recomputed per sample from the drivers
//! - Global weights learned once by gradient descent and persisted
//! - 50/50 blend of both, clipped to the physiologic range
//!
//! The fitting and serving phases share one [`Combiner`], so their
//! estimates agree exactly for identical inputs.

pub mod base_model;
pub mod blender;
pub mod contextual;
pub mod drivers;
pub mod fitting;
pub mod global;
pub mod metrics;
pub mod mock;
pub mod risk;
pub mod serving;
pub mod weight_store;


pub use base_model::{check_feature_width, BaseModel};
pub use blender::{clip, Blend, Combiner, CLIP_MAX, CLIP_MIN};
pub use contextual::{contextual_weights, EnsembleConfig, WEIGHT_EPSILON};
pub use drivers::{DriverPair, PhysioRecord};
pub use fitting::{EnsembleFitter, FitOutcome, FitReport, FitSample};
pub use global::{GlobalWeightLearner, GlobalWeights};
pub use metrics::RegressionMetrics;
pub use risk::DehydrationRisk;
pub use serving::{EnsembleEstimate, EnsembleServer};
pub use weight_store::{LoadedWeights, WeightArtifact, WeightSource, WeightStore};
