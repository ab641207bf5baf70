//! Score fusion and classification.
//!
//! ```text
//! authenticity = completeness × (w_congruence × congruence + w_stability × stability)
//! risk         = 1 − authenticity
//! ```
//!
//! Completeness multiplies rather than averages: a congruent, stable stream
//! that exists in only one channel says nothing about authenticity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::stability::ModalityStability;
use crate::taxonomy::Modality;

/// Clamp to [0, 1], mapping NaN to 0 and infinities to the nearest bound.
#[inline]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        tracing::warn!("clamp_unit: NaN detected, clamping to 0");
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Binary decision derived from the authenticity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthenticityStatus {
    Authentic,
    PotentialSpoof,
}

impl AuthenticityStatus {
    pub fn is_authentic(self) -> bool {
        self == AuthenticityStatus::Authentic
    }
}

impl fmt::Display for AuthenticityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthenticityStatus::Authentic => "AUTHENTIC",
            AuthenticityStatus::PotentialSpoof => "POTENTIAL SPOOF",
        })
    }
}

/// Weights of the additive part of the fusion. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub w_congruence: f64,
    pub w_stability: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            w_congruence: 0.5,
            w_stability: 0.5,
        }
    }
}

impl FusionWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("w_congruence", self.w_congruence),
            ("w_stability", self.w_stability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { field, value });
            }
        }
        if (self.w_congruence + self.w_stability - 1.0).abs() > 1e-9 {
            return Err(ConfigError::WeightSum {
                w_congruence: self.w_congruence,
                w_stability: self.w_stability,
            });
        }
        Ok(())
    }
}

/// Fuse the three sub-scores into an authenticity score in [0, 1].
pub fn fuse(weights: &FusionWeights, congruence: f64, stability: f64, completeness: f64) -> f64 {
    clamp_unit(
        completeness * (weights.w_congruence * congruence + weights.w_stability * stability),
    )
}

pub fn classify(authenticity_score: f64, threshold: f64) -> AuthenticityStatus {
    if authenticity_score >= threshold {
        AuthenticityStatus::Authentic
    } else {
        AuthenticityStatus::PotentialSpoof
    }
}

/// What the scorers saw on this tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    /// Facial label used for congruence (`None` = absent).
    pub facial_label: Option<String>,
    /// Vocal label used for congruence (`None` = absent).
    pub vocal_label: Option<String>,
    /// The latest observation of at least one modality was absent.
    pub incomplete: bool,
    pub face_stability: ModalityStability,
    pub voice_stability: ModalityStability,
    pub cross_modal_instability: f64,
    /// Pairs inspected by the completeness scorer.
    pub completeness_pairs: usize,
    /// Modality that stayed flat while the other was expressive.
    pub expressive_asymmetry: Option<Modality>,
}

/// Output of one analysis tick. Immutable value owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticityResult {
    /// Newest observation time across both modalities.
    pub timestamp: f64,
    pub congruence_score: f64,
    pub stability_score: f64,
    pub completeness_score: f64,
    pub authenticity_score: f64,
    pub risk_score: f64,
    pub status: AuthenticityStatus,
    pub breakdown: Breakdown,
}
