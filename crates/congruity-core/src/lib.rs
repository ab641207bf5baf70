//! Congruity core — cross-modal authenticity analysis.
//!
//! Estimates whether a face + voice presentation is live by checking that the
//! emotion expressed by the face stays consistent, over time, with the emotion
//! expressed by the voice. Emotion labels come from external facial and
//! speech recognizers; this crate only consumes their outputs.
//!
//! This is a heuristic signal, not a proof of liveness.

pub mod analyzer;
pub mod asymmetry;
pub mod completeness;
pub mod config;
pub mod congruence;
pub mod error;
pub mod fusion;
pub mod history;
pub mod presence;
pub mod stability;
pub mod summary;
pub mod taxonomy;

pub use analyzer::{Analysis, Analyzer};
pub use config::{AnalyzerConfig, SmoothingConfig, MAX_WINDOW_LENGTH};
pub use congruence::{CongruenceScorer, CongruenceTable, CoverageGap};
pub use error::{ConfigError, ParseModalityError};
pub use fusion::{AuthenticityResult, AuthenticityStatus, Breakdown, FusionWeights};
pub use history::{EmotionObservation, HistoryBuffer, HistoryWindow, RecordOutcome, RecordWarning};
pub use summary::{SessionSummary, SummaryBuilder, SummaryPolicy};
pub use taxonomy::{Modality, Taxonomy};
