//! Facial/vocal congruence: the static relation table and the instantaneous
//! scorer built on it.
//!
//! The table is keyed by facial label and lists the vocal labels considered
//! consistent with it. Lookup is directional, so coverage is checked from both
//! sides: every facial label needs an entry, and every vocal label should be
//! reachable from at least one facial label. Identical labels on both sides
//! are always congruent.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::taxonomy::{normalize_label, Modality, Taxonomy};

type RawTable = BTreeMap<String, BTreeSet<String>>;

/// Immutable facial-label → congruent-vocal-labels relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTable", into = "RawTable")]
pub struct CongruenceTable {
    entries: RawTable,
}

/// A label that the table does not reach from one of its two directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverageGap {
    /// Facial label with no table entry.
    FacialWithoutEntry(String),
    /// Vocal label that no facial entry lists.
    VocalUnreachable(String),
}

impl fmt::Display for CoverageGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageGap::FacialWithoutEntry(label) => {
                write!(f, "facial label {label:?} has no congruence entry")
            }
            CoverageGap::VocalUnreachable(label) => {
                write!(f, "vocal label {label:?} is not congruent with any facial label")
            }
        }
    }
}

impl CongruenceTable {
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator,
        V::Item: AsRef<str>,
    {
        let mut table = RawTable::new();
        for (facial, vocal) in entries {
            table
                .entry(normalize_label(facial.as_ref()))
                .or_default()
                .extend(vocal.into_iter().map(|v| normalize_label(v.as_ref())));
        }
        Self { entries: table }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn congruent_with(&self, facial: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(&normalize_label(facial))
    }

    /// Whether the vocal label is consistent with the facial label.
    pub fn is_congruent(&self, facial: &str, vocal: &str) -> bool {
        let facial = normalize_label(facial);
        let vocal = normalize_label(vocal);
        facial == vocal
            || self
                .entries
                .get(&facial)
                .is_some_and(|set| set.contains(&vocal))
    }

    /// Reject tables that are empty or mention labels outside the taxonomy.
    pub fn validate(&self, taxonomy: &Taxonomy) -> Result<(), ConfigError> {
        if self.entries.is_empty() {
            return Err(ConfigError::EmptyCongruenceTable);
        }
        for (facial, vocal_set) in &self.entries {
            if !taxonomy.contains(Modality::Face, facial) {
                return Err(ConfigError::UnknownFacialLabel {
                    label: facial.clone(),
                });
            }
            if let Some(vocal) = vocal_set
                .iter()
                .find(|v| !taxonomy.contains(Modality::Voice, v))
            {
                return Err(ConfigError::UnknownVocalLabel {
                    facial: facial.clone(),
                    vocal: vocal.clone(),
                });
            }
        }
        Ok(())
    }

    /// Labels of either vocabulary that the table leaves uncovered.
    pub fn coverage_gaps(&self, taxonomy: &Taxonomy) -> Vec<CoverageGap> {
        let mut gaps: Vec<CoverageGap> = taxonomy
            .labels(Modality::Face)
            .iter()
            .filter(|l| !self.entries.contains_key(*l))
            .map(|l| CoverageGap::FacialWithoutEntry(l.clone()))
            .collect();

        let reachable: BTreeSet<&String> = self.entries.values().flatten().collect();
        gaps.extend(
            taxonomy
                .labels(Modality::Voice)
                .iter()
                .filter(|l| !reachable.contains(l))
                .map(|l| CoverageGap::VocalUnreachable(l.clone())),
        );
        gaps
    }
}

impl Default for CongruenceTable {
    fn default() -> Self {
        Self::from_entries([
            ("happy", vec!["happy"]),
            ("sad", vec!["sad", "calm", "neutral"]),
            ("angry", vec!["angry"]),
            // fear and surprise share high arousal and often co-occur
            ("fear", vec!["fearful", "surprised"]),
            ("disgust", vec!["disgust"]),
            ("surprise", vec!["surprised", "fearful"]),
            ("neutral", vec!["neutral", "calm", "sad"]),
        ])
    }
}

impl From<RawTable> for CongruenceTable {
    fn from(raw: RawTable) -> Self {
        Self::from_entries(raw)
    }
}

impl From<CongruenceTable> for RawTable {
    fn from(table: CongruenceTable) -> Self {
        table.entries
    }
}

/// Instantaneous congruence between the latest facial and vocal labels.
#[derive(Debug, Clone)]
pub struct CongruenceScorer {
    table: Arc<CongruenceTable>,
    neutral_value: f64,
    mismatch_penalty: f64,
}

impl CongruenceScorer {
    pub fn new(table: Arc<CongruenceTable>, neutral_value: f64, mismatch_penalty: f64) -> Self {
        Self {
            table,
            neutral_value,
            mismatch_penalty,
        }
    }

    pub fn table(&self) -> &CongruenceTable {
        &self.table
    }

    /// Score a pair of effective labels. `None` means the modality has no
    /// usable detection, which yields the neutral value rather than a mismatch.
    pub fn score(&self, facial: Option<&str>, vocal: Option<&str>) -> f64 {
        match (facial, vocal) {
            (Some(facial), Some(vocal)) => {
                if self.table.is_congruent(facial, vocal) {
                    1.0
                } else {
                    self.mismatch_penalty
                }
            }
            _ => self.neutral_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> CongruenceScorer {
        CongruenceScorer::new(Arc::new(CongruenceTable::default()), 0.5, 0.1)
    }

    #[test]
    fn test_default_table_is_valid() {
        let taxonomy = Taxonomy::default();
        CongruenceTable::default().validate(&taxonomy).unwrap();
        assert!(CongruenceTable::default().coverage_gaps(&taxonomy).is_empty());
    }

    #[test]
    fn test_lookup_is_normalized() {
        let table = CongruenceTable::default();
        assert!(table.is_congruent(" Sad", "CALM"));
        assert!(!table.is_congruent("happy", "sad"));
    }

    #[test]
    fn test_identical_labels_congruent_without_entry() {
        let table = CongruenceTable::from_entries([("happy", vec!["happy"])]);
        assert!(table.is_congruent("angry", "angry"));
    }

    #[test]
    fn test_absence_scores_neutral() {
        let s = scorer();
        assert_eq!(s.score(None, Some("happy")), 0.5);
        assert_eq!(s.score(Some("happy"), None), 0.5);
        assert_eq!(s.score(None, None), 0.5);
    }

    #[test]
    fn test_match_and_mismatch() {
        let s = scorer();
        assert_eq!(s.score(Some("happy"), Some("happy")), 1.0);
        assert_eq!(s.score(Some("happy"), Some("angry")), 0.1);
    }

    #[test]
    fn test_congruent_never_below_incongruent() {
        let s = scorer();
        let taxonomy = Taxonomy::default();
        for facial in taxonomy.labels(Modality::Face) {
            for congruent in taxonomy.labels(Modality::Voice) {
                if !s.table().is_congruent(facial, congruent) {
                    continue;
                }
                for other in taxonomy.labels(Modality::Voice) {
                    if s.table().is_congruent(facial, other) {
                        continue;
                    }
                    assert!(
                        s.score(Some(facial.as_str()), Some(congruent.as_str()))
                            >= s.score(Some(facial.as_str()), Some(other.as_str())),
                        "{facial}: {congruent} scored below {other}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_validate_rejects_unknown_labels() {
        let taxonomy = Taxonomy::default();
        let bad_key = CongruenceTable::from_entries([("bored", vec!["calm"])]);
        assert!(matches!(
            bad_key.validate(&taxonomy),
            Err(ConfigError::UnknownFacialLabel { .. })
        ));

        let bad_value = CongruenceTable::from_entries([("happy", vec!["ecstatic"])]);
        assert!(matches!(
            bad_value.validate(&taxonomy),
            Err(ConfigError::UnknownVocalLabel { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty() {
        let empty = CongruenceTable::from_entries(Vec::<(&str, Vec<&str>)>::new());
        assert!(matches!(
            empty.validate(&Taxonomy::default()),
            Err(ConfigError::EmptyCongruenceTable)
        ));
    }

    #[test]
    fn test_coverage_gaps_both_directions() {
        let table = CongruenceTable::from_entries([("happy", vec!["happy"])]);
        let taxonomy = Taxonomy::new(["happy", "sad"], ["happy", "calm"]);
        let gaps = table.coverage_gaps(&taxonomy);
        assert_eq!(
            gaps,
            vec![
                CoverageGap::FacialWithoutEntry("sad".into()),
                CoverageGap::VocalUnreachable("calm".into()),
            ]
        );
    }
}
