//! Emotion vocabularies for the two observed modalities.
//!
//! Facial and vocal emotion recognizers rarely agree on naming: a facial
//! classifier reports `fear` and `surprise` where a speech classifier reports
//! `fearful` and `surprised`, and only the speech side knows `calm`. Each
//! modality therefore carries its own vocabulary. Labels are compared in
//! normalized form (trimmed, lowercase).

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseModalityError;

/// Default facial vocabulary (FER-style labels).
pub const DEFAULT_FACIAL_LABELS: &[&str] = &[
    "angry", "disgust", "fear", "happy", "neutral", "sad", "surprise",
];

/// Default vocal vocabulary (SER-style labels).
pub const DEFAULT_VOCAL_LABELS: &[&str] = &[
    "angry", "calm", "disgust", "fearful", "happy", "neutral", "sad", "surprised",
];

/// One of the two observed channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Face,
    Voice,
}

impl Modality {
    pub const ALL: [Modality; 2] = [Modality::Face, Modality::Voice];

    pub fn as_str(self) -> &'static str {
        match self {
            Modality::Face => "face",
            Modality::Voice => "voice",
        }
    }

    /// The opposite channel.
    pub fn other(self) -> Modality {
        match self {
            Modality::Face => Modality::Voice,
            Modality::Voice => Modality::Face,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = ParseModalityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "face" | "facial" => Ok(Modality::Face),
            "voice" | "vocal" | "speech" => Ok(Modality::Voice),
            _ => Err(ParseModalityError(s.to_string())),
        }
    }
}

/// Canonical form used for every label comparison.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Recognized labels per modality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    facial: BTreeSet<String>,
    vocal: BTreeSet<String>,
}

impl Taxonomy {
    pub fn new<F, V>(facial: F, vocal: V) -> Self
    where
        F: IntoIterator,
        F::Item: AsRef<str>,
        V: IntoIterator,
        V::Item: AsRef<str>,
    {
        Self {
            facial: facial
                .into_iter()
                .map(|l| normalize_label(l.as_ref()))
                .filter(|l| !l.is_empty())
                .collect(),
            vocal: vocal
                .into_iter()
                .map(|l| normalize_label(l.as_ref()))
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    pub fn labels(&self, modality: Modality) -> &BTreeSet<String> {
        match modality {
            Modality::Face => &self.facial,
            Modality::Voice => &self.vocal,
        }
    }

    /// Whether `label` (in any casing) belongs to the modality's vocabulary.
    pub fn contains(&self, modality: Modality, label: &str) -> bool {
        self.labels(modality).contains(&normalize_label(label))
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::new(DEFAULT_FACIAL_LABELS, DEFAULT_VOCAL_LABELS)
    }
}
