//! Temporal stability of the emotion label streams.
//!
//! Genuine affect drifts: a person moves from neutral to happy over seconds,
//! and the facial and vocal channels drift together. Spliced or synthetic
//! presentations tend to flip labels from frame to frame, or show one
//! channel churning while the other stays flat.
//!
//! Each modality's instability is its label change rate weighted by how fast
//! those changes happen in wall-clock time, so five different emotions in
//! one second count far more than the same five spread across thirty. The
//! difference between the two channels' instability is added as a
//! cross-modal term.
//!
//! Only detected observations are considered here; gaps in a stream are the
//! completeness scorer's concern.
//!
//! # Threat Coverage
//!
//! - **Penalizes:** frame-level label flicker from synthetic faces, audio
//!   spliced from unrelated clips, one channel replayed against a live other.
//! - **Does not penalize:** a static photo with matching static audio. That
//!   case is left to congruence and completeness.

use serde::{Deserialize, Serialize};

use crate::fusion::clamp_unit;

/// Tuning for the stability scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StabilityConfig {
    /// Label change frequency (changes per second) at which the temporal
    /// factor reaches 0.5. Lower values are stricter.
    pub tolerance_hz: f64,
    /// Lower bound on the window span, so bursts with identical timestamps
    /// do not divide by zero.
    pub min_span_secs: f64,
    /// Weight of the face/voice instability difference.
    pub cross_modal_weight: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            tolerance_hz: 0.5,
            min_span_secs: 0.1,
            cross_modal_weight: 0.25,
        }
    }
}

/// Stability of a single modality's window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModalityStability {
    /// 1.0 = perfectly stable, 0.0 = maximally unstable.
    pub score: f64,
    pub instability: f64,
    /// Adjacent pairs whose labels differ.
    pub changes: usize,
    /// Adjacent pairs analysed.
    pub pairs_analysed: usize,
    /// Seconds between first and last observation.
    pub span_secs: f64,
}

impl ModalityStability {
    fn neutral() -> Self {
        Self {
            score: 1.0,
            instability: 0.0,
            changes: 0,
            pairs_analysed: 0,
            span_secs: 0.0,
        }
    }
}

/// Combined stability across both modalities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityResult {
    pub score: f64,
    pub face: ModalityStability,
    pub voice: ModalityStability,
    /// |face instability − voice instability|.
    pub cross_modal: f64,
}

/// Stability of one time-ordered `(timestamp, label)` sequence.
///
/// Returns a score of exactly 1.0 if fewer than 2 observations are provided,
/// since the check requires at least one pair.
pub fn modality_stability(sequence: &[(f64, &str)], config: &StabilityConfig) -> ModalityStability {
    if sequence.len() < 2 {
        return ModalityStability::neutral();
    }

    let changes = sequence
        .windows(2)
        .filter(|pair| pair[0].1 != pair[1].1)
        .count();
    let pairs = sequence.len() - 1;
    let span = sequence[pairs].0 - sequence[0].0;

    let change_rate = changes as f64 / pairs as f64;
    let changes_per_second = changes as f64 / span.max(config.min_span_secs);
    let temporal_factor = changes_per_second / (changes_per_second + config.tolerance_hz);
    let instability = clamp_unit(change_rate * temporal_factor);

    ModalityStability {
        score: 1.0 - instability,
        instability,
        changes,
        pairs_analysed: pairs,
        span_secs: span,
    }
}

/// Score both modalities and fold in the cross-modal term.
pub fn score_stability(
    face: &[(f64, &str)],
    voice: &[(f64, &str)],
    config: &StabilityConfig,
) -> StabilityResult {
    let face = modality_stability(face, config);
    let voice = modality_stability(voice, config);
    let cross_modal = (face.instability - voice.instability).abs();
    let instability = clamp_unit(
        face.instability.max(voice.instability) + config.cross_modal_weight * cross_modal,
    );

    StabilityResult {
        score: 1.0 - instability,
        face,
        voice,
        cross_modal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE: [&str; 5] = ["happy", "sad", "angry", "fear", "surprise"];

    /// Helper: five distinct labels evenly spread over `span` seconds.
    fn five_changes_over(span: f64) -> Vec<(f64, &'static str)> {
        FIVE.iter()
            .enumerate()
            .map(|(i, label)| (i as f64 * span / 4.0, *label))
            .collect()
    }

    #[test]
    fn test_empty_and_single_are_exactly_one() {
        let config = StabilityConfig::default();
        assert_eq!(modality_stability(&[], &config).score, 1.0);
        assert_eq!(modality_stability(&[(0.0, "happy")], &config).score, 1.0);
        assert_eq!(score_stability(&[], &[(1.0, "sad")], &config).score, 1.0);
    }

    #[test]
    fn test_constant_labels_fully_stable() {
        let seq: Vec<(f64, &str)> = (0..10).map(|i| (i as f64, "happy")).collect();
        let result = modality_stability(&seq, &StabilityConfig::default());
        assert_eq!(result.score, 1.0);
        assert_eq!(result.changes, 0);
        assert_eq!(result.pairs_analysed, 9);
    }

    #[test]
    fn test_fast_changes_penalized_more_than_slow() {
        let config = StabilityConfig::default();
        let fast = modality_stability(&five_changes_over(1.0), &config);
        let slow = modality_stability(&five_changes_over(30.0), &config);
        assert_eq!(fast.changes, 4);
        assert_eq!(slow.changes, 4);
        // cps 4.0 → factor 4/4.5; cps 0.133 → factor ~0.21
        assert!(fast.score < 0.2, "fast score {}", fast.score);
        assert!(slow.score > 0.7, "slow score {}", slow.score);
    }

    #[test]
    fn test_identical_timestamps_use_min_span() {
        let seq = [(5.0, "happy"), (5.0, "sad")];
        let result = modality_stability(&seq, &StabilityConfig::default());
        assert!(result.score.is_finite());
        assert!(result.score < 0.1);
    }

    #[test]
    fn test_cross_modal_term_adds_penalty() {
        let config = StabilityConfig::default();
        let churn = five_changes_over(30.0);
        let steady: Vec<(f64, &str)> = (0..5).map(|i| (i as f64 * 7.5, "neutral")).collect();

        let one_sided = score_stability(&churn, &steady, &config);
        let both = score_stability(&churn, &churn, &config);
        assert!(one_sided.cross_modal > 0.0);
        assert_eq!(both.cross_modal, 0.0);
        assert!(one_sided.score < both.score);
    }

    #[test]
    fn test_score_bounded() {
        let config = StabilityConfig {
            cross_modal_weight: 1.0,
            ..Default::default()
        };
        let result = score_stability(&five_changes_over(0.0), &[], &config);
        assert!((0.0..=1.0).contains(&result.score));
    }
}
