//! Expressive asymmetry: one channel flat while the other is expressive.
//!
//! A photo held up to the camera while someone speaks emotionally produces a
//! face window that is mostly neutral or undetected against a voice window
//! dominated by an expressive label (and the mirror image for muted audio
//! under a live face). The check flags the flat modality; whether the flag
//! affects the score is controlled by `factor`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::history::{dominant_label, EmotionObservation};
use crate::presence::PresenceFilter;
use crate::taxonomy::{normalize_label, Modality};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AsymmetryConfig {
    /// Labels considered emotionally flat, in either vocabulary.
    pub flat_labels: BTreeSet<String>,
    /// A window is flagged when its flat-or-absent share is strictly above
    /// this. Must be in [0, 1).
    pub flat_ratio: f64,
    /// Multiplier applied to the authenticity score when flagged.
    /// 1.0 reports the flag without changing the score.
    pub factor: f64,
}

impl Default for AsymmetryConfig {
    fn default() -> Self {
        Self {
            flat_labels: ["neutral", "calm"].into_iter().map(String::from).collect(),
            flat_ratio: 0.7,
            factor: 1.0,
        }
    }
}

impl AsymmetryConfig {
    fn is_flat(&self, label: &str) -> bool {
        self.flat_labels.contains(&normalize_label(label))
    }
}

/// Return the flat modality if one window is flat while the other's dominant
/// label is expressive. Facial flatness is checked first.
pub fn detect_asymmetry(
    face: &[EmotionObservation],
    voice: &[EmotionObservation],
    presence: &PresenceFilter,
    config: &AsymmetryConfig,
) -> Option<Modality> {
    let windows = [(Modality::Face, face, voice), (Modality::Voice, voice, face)];
    windows.into_iter().find_map(|(modality, flat, expressive)| {
        let expressive_dominant = dominant_label(expressive.iter().filter_map(|o| presence.label(o)))?;
        if config.is_flat(expressive_dominant) {
            return None;
        }
        if let Some(flat_dominant) = dominant_label(flat.iter().filter_map(|o| presence.label(o))) {
            if !config.is_flat(flat_dominant) {
                return None;
            }
        }
        let flat_count = flat
            .iter()
            .filter(|o| presence.label(o).map_or(true, |l| config.is_flat(l)))
            .count();
        let ratio = flat_count as f64 / flat.len() as f64;
        (!flat.is_empty() && ratio > config.flat_ratio).then_some(modality)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Taxonomy;
    use std::sync::Arc;

    fn presence() -> PresenceFilter {
        PresenceFilter::new(Arc::new(Taxonomy::default()), 0.2, 0.2)
    }

    fn window(modality: Modality, labels: &[&str]) -> Vec<EmotionObservation> {
        labels
            .iter()
            .enumerate()
            .map(|(i, l)| {
                if l.is_empty() {
                    EmotionObservation::absent(modality, i as f64)
                } else {
                    EmotionObservation::new(modality, l, Some(0.9), i as f64)
                }
            })
            .collect()
    }

    #[test]
    fn test_flat_face_expressive_voice() {
        let face = window(Modality::Face, &["neutral", "neutral", "", "neutral", "neutral"]);
        let voice = window(Modality::Voice, &["angry", "angry", "angry"]);
        assert_eq!(
            detect_asymmetry(&face, &voice, &presence(), &AsymmetryConfig::default()),
            Some(Modality::Face)
        );
    }

    #[test]
    fn test_flat_voice_expressive_face() {
        let face = window(Modality::Face, &["happy", "happy", "happy"]);
        let voice = window(Modality::Voice, &["calm", "calm", "calm", "neutral"]);
        assert_eq!(
            detect_asymmetry(&face, &voice, &presence(), &AsymmetryConfig::default()),
            Some(Modality::Voice)
        );
    }

    #[test]
    fn test_both_expressive_not_flagged() {
        let face = window(Modality::Face, &["happy", "happy"]);
        let voice = window(Modality::Voice, &["happy", "happy"]);
        assert_eq!(
            detect_asymmetry(&face, &voice, &presence(), &AsymmetryConfig::default()),
            None
        );
    }

    #[test]
    fn test_both_flat_not_flagged() {
        let face = window(Modality::Face, &["neutral", "neutral"]);
        let voice = window(Modality::Voice, &["calm", "calm"]);
        assert_eq!(
            detect_asymmetry(&face, &voice, &presence(), &AsymmetryConfig::default()),
            None
        );
    }

    #[test]
    fn test_fully_flat_window_flagged_at_high_ratio() {
        let face = window(Modality::Face, &["neutral"; 5]);
        let voice = window(Modality::Voice, &["angry"; 5]);
        let config = AsymmetryConfig {
            flat_ratio: 0.99,
            ..Default::default()
        };
        assert_eq!(
            detect_asymmetry(&face, &voice, &presence(), &config),
            Some(Modality::Face)
        );
    }

    #[test]
    fn test_ratio_compared_strictly() {
        // 7 of 10 flat is exactly the default ratio
        let mut labels = vec!["neutral"; 7];
        labels.extend(["happy"; 3]);
        let face = window(Modality::Face, &labels);
        let voice = window(Modality::Voice, &["angry"]);
        assert_eq!(
            detect_asymmetry(&face, &voice, &presence(), &AsymmetryConfig::default()),
            None
        );
    }

    #[test]
    fn test_below_ratio_not_flagged() {
        let face = window(Modality::Face, &["neutral", "neutral", "happy", "happy", "neutral"]);
        let voice = window(Modality::Voice, &["angry"]);
        // 3 of 5 flat = 0.6 < 0.7
        assert_eq!(
            detect_asymmetry(&face, &voice, &presence(), &AsymmetryConfig::default()),
            None
        );
    }
}
