use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::asymmetry::AsymmetryConfig;
use crate::congruence::CongruenceTable;
use crate::error::ConfigError;
use crate::fusion::FusionWeights;
use crate::stability::StabilityConfig;
use crate::summary::SummaryPolicy;
use crate::taxonomy::{Modality, Taxonomy, DEFAULT_FACIAL_LABELS, DEFAULT_VOCAL_LABELS};

/// Upper bound for `history_length` and `completeness_lookback`. Windows are
/// preallocated, so this also caps per-session memory.
pub const MAX_WINDOW_LENGTH: usize = 100_000;

/// Dominant-label smoothing for the congruence scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmoothingConfig {
    /// Use the most frequent label in the window instead of the latest.
    pub enabled: bool,
    /// Valid observations a window needs before smoothing applies.
    pub min_history: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_history: 3,
        }
    }
}

/// Analyzer configuration, fixed for the lifetime of a session.
///
/// Every field has a default, so a TOML file only needs the knobs it changes:
///
/// ```toml
/// history_length = 30
/// authenticity_threshold = 0.55
///
/// [congruence]
/// happy = ["happy"]
/// sad = ["sad", "calm"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Observations kept per modality.
    pub history_length: usize,
    /// Authenticity at or above this is classified authentic.
    pub authenticity_threshold: f64,
    pub facial_labels: Vec<String>,
    pub vocal_labels: Vec<String>,
    /// Facial label → congruent vocal labels. Shared, never copied, between
    /// analyzers built from clones of this config.
    pub congruence: Arc<CongruenceTable>,
    pub min_facial_confidence: f64,
    pub min_vocal_confidence: f64,
    pub w_congruence: f64,
    pub w_stability: f64,
    /// Congruence score when either modality is absent.
    pub neutral_congruence: f64,
    /// Congruence score for an incongruent pair.
    pub mismatch_penalty: f64,
    /// Maximum pairs inspected by the completeness scorer.
    pub completeness_lookback: usize,
    pub stability: StabilityConfig,
    pub smoothing: SmoothingConfig,
    pub asymmetry: AsymmetryConfig,
    pub summary_policy: SummaryPolicy,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            history_length: 20,
            authenticity_threshold: 0.6,
            facial_labels: DEFAULT_FACIAL_LABELS.iter().map(|l| l.to_string()).collect(),
            vocal_labels: DEFAULT_VOCAL_LABELS.iter().map(|l| l.to_string()).collect(),
            congruence: Arc::new(CongruenceTable::default()),
            min_facial_confidence: 0.25,
            min_vocal_confidence: 0.25,
            w_congruence: 0.5,
            w_stability: 0.5,
            neutral_congruence: 0.5,
            mismatch_penalty: 0.1,
            completeness_lookback: 20,
            stability: StabilityConfig::default(),
            smoothing: SmoothingConfig::default(),
            asymmetry: AsymmetryConfig::default(),
            summary_policy: SummaryPolicy::default(),
        }
    }
}

impl AnalyzerConfig {
    pub fn taxonomy(&self) -> Taxonomy {
        Taxonomy::new(&self.facial_labels, &self.vocal_labels)
    }

    pub fn weights(&self) -> FusionWeights {
        FusionWeights {
            w_congruence: self.w_congruence,
            w_stability: self.w_stability,
        }
    }

    /// Validate every parameter, including the congruence table against the
    /// configured vocabularies.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_length == 0 {
            return Err(ConfigError::ZeroHistoryLength);
        }
        if self.completeness_lookback == 0 {
            return Err(ConfigError::ZeroLookback);
        }
        if self.smoothing.min_history == 0 {
            return Err(ConfigError::ZeroSmoothingHistory);
        }
        for (field, value) in [
            ("history_length", self.history_length),
            ("completeness_lookback", self.completeness_lookback),
        ] {
            if value > MAX_WINDOW_LENGTH {
                return Err(ConfigError::TooLarge {
                    field,
                    value,
                    max: MAX_WINDOW_LENGTH,
                });
            }
        }
        for (field, value) in [
            ("authenticity_threshold", self.authenticity_threshold),
            ("min_facial_confidence", self.min_facial_confidence),
            ("min_vocal_confidence", self.min_vocal_confidence),
            ("neutral_congruence", self.neutral_congruence),
            ("mismatch_penalty", self.mismatch_penalty),
            ("stability.cross_modal_weight", self.stability.cross_modal_weight),
            ("asymmetry.factor", self.asymmetry.factor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { field, value });
            }
        }
        // the flat share is compared strictly, so 1.0 could never flag
        let flat_ratio = self.asymmetry.flat_ratio;
        if !(0.0..1.0).contains(&flat_ratio) {
            return Err(ConfigError::NotBelowOne {
                field: "asymmetry.flat_ratio",
                value: flat_ratio,
            });
        }
        for (field, value) in [
            ("stability.tolerance_hz", self.stability.tolerance_hz),
            ("stability.min_span_secs", self.stability.min_span_secs),
        ] {
            // written this way so NaN is rejected too
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        self.weights().validate()?;

        let taxonomy = self.taxonomy();
        for modality in Modality::ALL {
            if taxonomy.labels(modality).is_empty() {
                return Err(ConfigError::EmptyVocabulary { modality });
            }
        }
        self.congruence.validate(&taxonomy)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}
