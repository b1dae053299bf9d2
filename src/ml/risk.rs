//! Dehydration risk bands for an ensemble estimate

use serde::{Deserialize, Serialize};

/// Estimates above this are high risk (%)
pub const HIGH_RISK_THRESHOLD: f64 = 10.0;
/// Estimates above this are at least moderate risk (%)
pub const MODERATE_RISK_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DehydrationRisk {
    Low,
    Moderate,
    High,
}

impl DehydrationRisk {
    pub fn from_estimate(deficit_pct: f64) -> Self {
        if deficit_pct > HIGH_RISK_THRESHOLD {
            Self::High
        } else if deficit_pct > MODERATE_RISK_THRESHOLD {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for DehydrationRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DehydrationRisk::Low => write!(f, "LOW"),
            DehydrationRisk::Moderate => write!(f, "MODERATE"),
            DehydrationRisk::High => write!(f, "HIGH"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands() {
        assert_eq!(DehydrationRisk::from_estimate(-3.0), DehydrationRisk::Low);
        assert_eq!(DehydrationRisk::from_estimate(5.0), DehydrationRisk::Low);
        assert_eq!(DehydrationRisk::from_estimate(5.01), DehydrationRisk::Moderate);
        assert_eq!(DehydrationRisk::from_estimate(10.0), DehydrationRisk::Moderate);
        assert_eq!(DehydrationRisk::from_estimate(10.5), DehydrationRisk::High);
    }

    #[test]
    fn test_display() {
        assert_eq!(DehydrationRisk::High.to_string(), "HIGH");
    }
}
