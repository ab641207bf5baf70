//! The analysis façade: record observations from either source, analyze on
//! demand.
//!
//! `record_*` and `analyze` all take `&self`; an `Analyzer` is meant to sit
//! behind an `Arc` with the facial producer, the vocal producer and the
//! consumer each holding a clone.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::asymmetry::detect_asymmetry;
use crate::completeness::score_completeness;
use crate::config::AnalyzerConfig;
use crate::congruence::{CongruenceScorer, CongruenceTable};
use crate::error::ConfigError;
use crate::fusion::{classify, clamp_unit, fuse, AuthenticityResult, Breakdown};
use crate::history::{dominant_label, EmotionObservation, HistoryBuffer, RecordOutcome, RecordWarning};
use crate::presence::PresenceFilter;
use crate::stability::score_stability;
use crate::taxonomy::Modality;

/// Outcome of one analysis tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Analysis {
    Scored(AuthenticityResult),
    /// At least one modality has no observations yet.
    InsufficientData {
        facial_observations: usize,
        vocal_observations: usize,
    },
}

impl Analysis {
    pub fn result(&self) -> Option<&AuthenticityResult> {
        match self {
            Analysis::Scored(result) => Some(result),
            Analysis::InsufficientData { .. } => None,
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, Analysis::Scored(_))
    }
}

/// Cross-modal authenticity analyzer for one session.
#[derive(Debug)]
pub struct Analyzer {
    config: AnalyzerConfig,
    presence: PresenceFilter,
    congruence: CongruenceScorer,
    history: HistoryBuffer,
}

impl Analyzer {
    /// Build an analyzer using the congruence table from `config`.
    pub fn new(config: AnalyzerConfig) -> Result<Self, ConfigError> {
        let table = Arc::clone(&config.congruence);
        Self::with_table(config, table)
    }

    /// Build an analyzer around a shared congruence table, overriding the
    /// one in `config`. The table is shared, not copied, so many sessions
    /// can use one allocation.
    pub fn with_table(
        mut config: AnalyzerConfig,
        table: Arc<CongruenceTable>,
    ) -> Result<Self, ConfigError> {
        config.congruence = Arc::clone(&table);
        config.validate()?;

        let taxonomy = Arc::new(config.taxonomy());
        for gap in table.coverage_gaps(&taxonomy) {
            tracing::warn!(%gap, "congruence table coverage gap");
        }

        let presence = PresenceFilter::new(
            Arc::clone(&taxonomy),
            config.min_facial_confidence,
            config.min_vocal_confidence,
        );
        let congruence =
            CongruenceScorer::new(table, config.neutral_congruence, config.mismatch_penalty);
        let history = HistoryBuffer::new(config.history_length);

        tracing::debug!(
            history_length = config.history_length,
            threshold = config.authenticity_threshold,
            w_congruence = config.w_congruence,
            w_stability = config.w_stability,
            "analyzer created"
        );

        Ok(Self {
            config,
            presence,
            congruence,
            history,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Record a result from the facial emotion source. `confidence: None`
    /// records an explicit "no face" tick.
    pub fn record_facial_observation(
        &self,
        label: &str,
        confidence: Option<f64>,
        timestamp: f64,
    ) -> RecordOutcome {
        self.record(EmotionObservation::new(Modality::Face, label, confidence, timestamp))
    }

    /// Record a result from the speech emotion source. `confidence: None`
    /// records an explicit silence/failure tick.
    pub fn record_vocal_observation(
        &self,
        label: &str,
        confidence: Option<f64>,
        timestamp: f64,
    ) -> RecordOutcome {
        self.record(EmotionObservation::new(Modality::Voice, label, confidence, timestamp))
    }

    pub fn record(&self, observation: EmotionObservation) -> RecordOutcome {
        let modality = observation.modality;

        if let Some(confidence) = observation.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return reject(RecordWarning::InvalidConfidence {
                    modality,
                    got: confidence,
                });
            }
        }

        let unrecognized = observation.is_detection()
            && !self
                .presence
                .taxonomy()
                .contains(modality, &observation.label);
        let label = observation.label.clone();

        if let Err(warning) = self.history.record(observation) {
            return reject(warning);
        }

        if unrecognized {
            let warning = RecordWarning::UnrecognizedLabel { modality, label };
            tracing::warn!(%warning, "observation treated as absent");
            return RecordOutcome::AcceptedWithWarning(warning);
        }
        RecordOutcome::Accepted
    }

    /// Score the current history. Reads one window at a time; skew between
    /// the two reads is bounded by one observation per modality.
    pub fn analyze(&self) -> Analysis {
        let face = self.history.snapshot(Modality::Face);
        let voice = self.history.snapshot(Modality::Voice);

        let face_present: Vec<bool> = face.iter().map(|o| self.presence.is_present(o)).collect();
        let voice_present: Vec<bool> = voice.iter().map(|o| self.presence.is_present(o)).collect();

        let (Some(face_latest), Some(voice_latest), Some(completeness)) = (
            face.last(),
            voice.last(),
            score_completeness(&face_present, &voice_present, self.config.completeness_lookback),
        ) else {
            tracing::debug!(
                facial = face.len(),
                vocal = voice.len(),
                "analyze: insufficient data"
            );
            return Analysis::InsufficientData {
                facial_observations: face.len(),
                vocal_observations: voice.len(),
            };
        };

        let facial_label = self.effective_label(&face);
        let vocal_label = self.effective_label(&voice);
        let congruence_score = self.congruence.score(facial_label, vocal_label);

        let face_seq = self.labelled_sequence(&face);
        let voice_seq = self.labelled_sequence(&voice);
        let stability = score_stability(&face_seq, &voice_seq, &self.config.stability);

        let mut authenticity_score = fuse(
            &self.config.weights(),
            congruence_score,
            stability.score,
            completeness.score,
        );

        let expressive_asymmetry =
            detect_asymmetry(&face, &voice, &self.presence, &self.config.asymmetry);
        if expressive_asymmetry.is_some() {
            authenticity_score = clamp_unit(authenticity_score * self.config.asymmetry.factor);
        }

        let status = classify(authenticity_score, self.config.authenticity_threshold);
        let incomplete = !self.presence.is_present(face_latest) || !self.presence.is_present(voice_latest);

        tracing::debug!(
            congruence = congruence_score,
            stability = stability.score,
            completeness = completeness.score,
            authenticity = authenticity_score,
            %status,
            "analyze: tick scored"
        );

        Analysis::Scored(AuthenticityResult {
            timestamp: face_latest.timestamp.max(voice_latest.timestamp),
            congruence_score,
            stability_score: stability.score,
            completeness_score: completeness.score,
            authenticity_score,
            risk_score: 1.0 - authenticity_score,
            status,
            breakdown: Breakdown {
                facial_label: facial_label.map(str::to_string),
                vocal_label: vocal_label.map(str::to_string),
                incomplete,
                face_stability: stability.face,
                voice_stability: stability.voice,
                cross_modal_instability: stability.cross_modal,
                completeness_pairs: completeness.pairs_considered,
                expressive_asymmetry,
            },
        })
    }

    /// Drop all recorded history, e.g. when a new subject steps in front of
    /// the camera.
    pub fn reset(&self) {
        self.history.clear();
    }

    /// Label used for congruence: the latest observation's, or the window's
    /// dominant label when smoothing is enabled and enough history exists.
    fn effective_label<'w>(&self, window: &'w [EmotionObservation]) -> Option<&'w str> {
        let latest = self.presence.label(window.last()?)?;
        let smoothing = &self.config.smoothing;
        if !smoothing.enabled {
            return Some(latest);
        }
        let valid: Vec<&str> = window.iter().filter_map(|o| self.presence.label(o)).collect();
        if valid.len() < smoothing.min_history {
            return Some(latest);
        }
        dominant_label(valid).or(Some(latest))
    }

    fn labelled_sequence<'w>(&self, window: &'w [EmotionObservation]) -> Vec<(f64, &'w str)> {
        window
            .iter()
            .filter_map(|o| self.presence.label(o).map(|label| (o.timestamp, label)))
            .collect()
    }
}

fn reject(warning: RecordWarning) -> RecordOutcome {
    tracing::warn!(%warning, "observation rejected");
    RecordOutcome::Rejected(warning)
}
