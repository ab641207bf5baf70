use std::path::PathBuf;

use thiserror::Error;

use crate::taxonomy::Modality;

/// Invalid analyzer configuration. Raised at construction, never mid-session.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },

    #[error("{field} must be > 0, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be in [0, 1), got {value}")]
    NotBelowOne { field: &'static str, value: f64 },

    #[error(
        "w_congruence + w_stability must equal 1.0, got {w_congruence} + {w_stability} = {}",
        .w_congruence + .w_stability
    )]
    WeightSum { w_congruence: f64, w_stability: f64 },

    #[error("history_length must be >= 1")]
    ZeroHistoryLength,

    #[error("completeness_lookback must be >= 1")]
    ZeroLookback,

    #[error("{field} must be <= {max}, got {value}")]
    TooLarge {
        field: &'static str,
        value: usize,
        max: usize,
    },

    #[error("smoothing.min_history must be >= 1")]
    ZeroSmoothingHistory,

    #[error("{modality} vocabulary is empty")]
    EmptyVocabulary { modality: Modality },

    #[error("congruence table is empty")]
    EmptyCongruenceTable,

    #[error("congruence table key {label:?} is not a facial label")]
    UnknownFacialLabel { label: String },

    #[error("congruence table maps {facial:?} to {vocal:?}, which is not a vocal label")]
    UnknownVocalLabel { facial: String, vocal: String },

    #[error("failed to read config file: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown modality: {0:?}")]
pub struct ParseModalityError(pub String);
