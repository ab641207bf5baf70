//! Bounded per-modality observation history.
//!
//! The facial and vocal sources are independent producers running at very
//! different rates (every video frame vs. every few seconds of audio). Each
//! modality gets its own FIFO window behind its own lock, so a writer on one
//! side never waits on the other and readers take one window at a time.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::taxonomy::{normalize_label, Modality};

/// One emotion-recognition result for one modality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionObservation {
    /// Capture time in seconds.
    pub timestamp: f64,
    pub modality: Modality,
    /// Normalized emotion label. Empty when nothing was detected.
    #[serde(default)]
    pub label: String,
    /// Detection confidence in [0, 1]; `None` means no detection.
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl EmotionObservation {
    pub fn new(
        modality: Modality,
        label: impl AsRef<str>,
        confidence: Option<f64>,
        timestamp: f64,
    ) -> Self {
        Self {
            timestamp,
            modality,
            label: normalize_label(label.as_ref()),
            confidence,
        }
    }

    /// Explicit "no detection" (no face in frame, silence).
    pub fn absent(modality: Modality, timestamp: f64) -> Self {
        Self {
            timestamp,
            modality,
            label: String::new(),
            confidence: None,
        }
    }

    pub fn is_detection(&self) -> bool {
        self.confidence.is_some()
    }
}

/// Why an observation was rejected or flagged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordWarning {
    OutOfOrder {
        modality: Modality,
        last: f64,
        got: f64,
    },
    NonFiniteTimestamp {
        modality: Modality,
    },
    InvalidConfidence {
        modality: Modality,
        got: f64,
    },
    UnrecognizedLabel {
        modality: Modality,
        label: String,
    },
}

impl fmt::Display for RecordWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordWarning::OutOfOrder { modality, last, got } => write!(
                f,
                "{modality} observation at {got}s precedes last recorded {last}s"
            ),
            RecordWarning::NonFiniteTimestamp { modality } => {
                write!(f, "{modality} observation has a non-finite timestamp")
            }
            RecordWarning::InvalidConfidence { modality, got } => {
                write!(f, "{modality} confidence {got} is outside [0, 1]")
            }
            RecordWarning::UnrecognizedLabel { modality, label } => {
                write!(f, "{modality} label {label:?} is not in the taxonomy")
            }
        }
    }
}

/// Outcome of recording one observation. Warnings are non-fatal.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Accepted,
    /// Stored, but will be treated as absent during analysis.
    AcceptedWithWarning(RecordWarning),
    /// Dropped; history unchanged.
    Rejected(RecordWarning),
}

impl RecordOutcome {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, RecordOutcome::Rejected(_))
    }

    pub fn warning(&self) -> Option<&RecordWarning> {
        match self {
            RecordOutcome::Accepted => None,
            RecordOutcome::AcceptedWithWarning(w) | RecordOutcome::Rejected(w) => Some(w),
        }
    }
}

/// FIFO of the most recent observations of a single modality.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    capacity: usize,
    entries: VecDeque<EmotionObservation>,
}

impl HistoryWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Append, evicting the oldest entry when full. Rejects observations
    /// older than the newest stored one; equal timestamps are accepted.
    pub fn push(&mut self, observation: EmotionObservation) -> Result<(), RecordWarning> {
        if !observation.timestamp.is_finite() {
            return Err(RecordWarning::NonFiniteTimestamp {
                modality: observation.modality,
            });
        }
        if let Some(last) = self.last_timestamp() {
            if observation.timestamp < last {
                return Err(RecordWarning::OutOfOrder {
                    modality: observation.modality,
                    last,
                    got: observation.timestamp,
                });
            }
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(observation);
        Ok(())
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.entries.back().map(|o| o.timestamp)
    }

    pub fn latest(&self) -> Option<&EmotionObservation> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmotionObservation> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Both modality windows, each with its own lock.
#[derive(Debug)]
pub struct HistoryBuffer {
    face: Mutex<HistoryWindow>,
    voice: Mutex<HistoryWindow>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            face: Mutex::new(HistoryWindow::new(capacity)),
            voice: Mutex::new(HistoryWindow::new(capacity)),
        }
    }

    fn window(&self, modality: Modality) -> &Mutex<HistoryWindow> {
        match modality {
            Modality::Face => &self.face,
            Modality::Voice => &self.voice,
        }
    }

    /// Append to the observation's own modality window.
    pub fn record(&self, observation: EmotionObservation) -> Result<(), RecordWarning> {
        self.window(observation.modality).lock().push(observation)
    }

    /// Ordered copy of one window, oldest first.
    pub fn snapshot(&self, modality: Modality) -> Vec<EmotionObservation> {
        self.window(modality).lock().iter().cloned().collect()
    }

    pub fn len(&self, modality: Modality) -> usize {
        self.window(modality).lock().len()
    }

    pub fn clear(&self) {
        for modality in Modality::ALL {
            self.window(modality).lock().clear();
        }
    }
}

/// Most frequent label in `labels`; ties go to the label seen most recently.
pub fn dominant_label<'a, I>(labels: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    // (label, count, index of last occurrence)
    let mut tally: Vec<(&'a str, usize, usize)> = Vec::new();
    for (i, label) in labels.into_iter().enumerate() {
        match tally.iter_mut().find(|(l, _, _)| *l == label) {
            Some(entry) => {
                entry.1 += 1;
                entry.2 = i;
            }
            None => tally.push((label, 1, i)),
        }
    }
    tally
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.2.cmp(&b.2)))
        .map(|(label, _, _)| label)
}
