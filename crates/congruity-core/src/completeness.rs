//! Completeness gate: how often both channels produced a usable detection.
//!
//! The two windows are paired from the newest entry backwards (the i-th most
//! recent facial observation with the i-th most recent vocal one), over the
//! shorter of the two windows and at most `lookback` pairs. A presentation
//! that never yields a face, or never yields speech, converges to zero here
//! no matter how congruent the channel that does exist looks.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletenessResult {
    /// Fraction of considered pairs where both modalities were present.
    pub score: f64,
    pub pairs_considered: usize,
    pub complete_pairs: usize,
}

/// Score presence flags (oldest first) for each modality.
///
/// Returns `None` when either window is empty or `lookback` is zero: there is
/// nothing to measure, which is not the same as measuring zero.
pub fn score_completeness(
    face_present: &[bool],
    voice_present: &[bool],
    lookback: usize,
) -> Option<CompletenessResult> {
    let k = face_present.len().min(voice_present.len()).min(lookback);
    if k == 0 {
        return None;
    }

    let complete_pairs = face_present
        .iter()
        .rev()
        .zip(voice_present.iter().rev())
        .take(k)
        .filter(|(face, voice)| **face && **voice)
        .count();

    Some(CompletenessResult {
        score: complete_pairs as f64 / k as f64,
        pairs_considered: k,
        complete_pairs,
    })
}
