use std::sync::Arc;

use crate::history::EmotionObservation;
use crate::taxonomy::{Modality, Taxonomy};

/// Decides whether an observation counts as a usable detection.
///
/// An observation is present when it carries a confidence at or above the
/// modality's minimum and a label from the modality's vocabulary. Anything
/// else (no face, silence, weak or unrecognized output) is treated as absent.
#[derive(Debug, Clone)]
pub struct PresenceFilter {
    taxonomy: Arc<Taxonomy>,
    min_facial_confidence: f64,
    min_vocal_confidence: f64,
}

impl PresenceFilter {
    pub fn new(taxonomy: Arc<Taxonomy>, min_facial_confidence: f64, min_vocal_confidence: f64) -> Self {
        Self {
            taxonomy,
            min_facial_confidence,
            min_vocal_confidence,
        }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn min_confidence(&self, modality: Modality) -> f64 {
        match modality {
            Modality::Face => self.min_facial_confidence,
            Modality::Voice => self.min_vocal_confidence,
        }
    }

    pub fn is_present(&self, observation: &EmotionObservation) -> bool {
        self.label(observation).is_some()
    }

    /// The observation's label if it counts as a detection.
    pub fn label<'o>(&self, observation: &'o EmotionObservation) -> Option<&'o str> {
        let confidence = observation.confidence?;
        if confidence < self.min_confidence(observation.modality) {
            return None;
        }
        if !self.taxonomy.contains(observation.modality, &observation.label) {
            return None;
        }
        Some(observation.label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> PresenceFilter {
        PresenceFilter::new(Arc::new(Taxonomy::default()), 0.3, 0.2)
    }

    #[test]
    fn test_absent_observation() {
        assert!(!filter().is_present(&EmotionObservation::absent(Modality::Face, 0.0)));
    }

    #[test]
    fn test_low_confidence_is_absent() {
        let f = filter();
        let weak = EmotionObservation::new(Modality::Face, "happy", Some(0.25), 0.0);
        assert!(!f.is_present(&weak));
        // vocal minimum is lower
        let vocal = EmotionObservation::new(Modality::Voice, "happy", Some(0.25), 0.0);
        assert!(f.is_present(&vocal));
    }

    #[test]
    fn test_unrecognized_label_is_absent() {
        let obs = EmotionObservation::new(Modality::Face, "contempt", Some(0.95), 0.0);
        assert_eq!(filter().label(&obs), None);
    }

    #[test]
    fn test_present_label() {
        let obs = EmotionObservation::new(Modality::Voice, "Calm", Some(0.8), 0.0);
        assert_eq!(filter().label(&obs), Some("calm"));
    }
}
