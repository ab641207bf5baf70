//! `congruity replay` — run a recorded observation log through an analyzer.
//!
//! The log is JSON Lines, one observation per line:
//!
//! ```text
//! {"timestamp": 0.00, "modality": "face", "label": "happy", "confidence": 0.91}
//! {"timestamp": 0.03, "modality": "face", "label": "", "confidence": null}
//! {"timestamp": 5.00, "modality": "voice", "label": "calm", "confidence": 0.64}
//! ```
//!
//! Every accepted observation triggers one tick, mirroring a live session
//! where either source producing a result drives analysis.

use std::io::BufRead;

use anyhow::{Context, Result};
use serde::Serialize;

use congruity_core::{Analyzer, EmotionObservation, SessionSummary, SummaryBuilder, SummaryPolicy};

/// Counts gathered while replaying a log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayStats {
    pub observations: usize,
    pub rejected: usize,
    pub unrecognized: usize,
    pub ticks: usize,
}

pub struct ReplayOutcome {
    pub summary: Option<SessionSummary>,
    pub stats: ReplayStats,
}

/// Feed every line of `reader` into `analyzer`. Blank lines and lines
/// starting with `#` are skipped.
pub fn replay<R: BufRead>(reader: R, analyzer: &Analyzer, policy: SummaryPolicy) -> Result<ReplayOutcome> {
    let mut builder = SummaryBuilder::new(analyzer.config().authenticity_threshold, policy);
    let mut stats = ReplayStats::default();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("failed to read line {line_no}"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let raw: EmotionObservation = serde_json::from_str(trimmed)
            .with_context(|| format!("line {line_no}: invalid observation"))?;
        // re-normalize labels written by hand
        let observation =
            EmotionObservation::new(raw.modality, &raw.label, raw.confidence, raw.timestamp);
        stats.observations += 1;

        let outcome = analyzer.record(observation);
        match outcome.warning() {
            Some(warning) if !outcome.is_accepted() => {
                tracing::warn!(line = line_no, %warning, "observation rejected");
                stats.rejected += 1;
                continue;
            }
            Some(_) => stats.unrecognized += 1,
            None => {}
        }

        builder.push(&analyzer.analyze());
        stats.ticks += 1;
    }

    Ok(ReplayOutcome {
        summary: builder.finish(),
        stats,
    })
}

/// JSON report written at the end of a replay.
#[derive(Debug, Serialize)]
pub struct Report {
    pub source: String,
    /// "Yes", "No", or "Insufficient data".
    pub is_authentic: String,
    pub risk_score: Option<f64>,
    pub average_authenticity_score: Option<f64>,
    pub policy: SummaryPolicy,
    pub total_observations: usize,
    pub rejected_observations: usize,
    pub unrecognized_observations: usize,
    pub total_ticks: usize,
    pub scored_ticks: usize,
    pub incomplete_ticks: usize,
    pub insufficient_ticks: usize,
    pub error_message: Option<String>,
    pub timestamp: String,
}

impl Report {
    pub fn new(source: &str, policy: SummaryPolicy, outcome: &ReplayOutcome) -> Self {
        let stats = &outcome.stats;
        let summary = outcome.summary.as_ref();
        let is_authentic = match summary {
            Some(s) if s.status.is_authentic() => "Yes",
            Some(_) => "No",
            None => "Insufficient data",
        };
        Self {
            source: source.to_string(),
            is_authentic: is_authentic.to_string(),
            risk_score: summary.map(|s| s.mean_risk_score),
            average_authenticity_score: summary.map(|s| s.mean_authenticity_score),
            policy,
            total_observations: stats.observations,
            rejected_observations: stats.rejected,
            unrecognized_observations: stats.unrecognized,
            total_ticks: stats.ticks,
            scored_ticks: summary.map_or(0, |s| s.scored_ticks),
            incomplete_ticks: summary.map_or(0, |s| s.incomplete_ticks),
            insufficient_ticks: summary.map_or(stats.ticks, |s| s.insufficient_ticks),
            error_message: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Report for a replay that could not complete.
    pub fn failed(source: &str, policy: SummaryPolicy, error: &anyhow::Error) -> Self {
        Self {
            source: source.to_string(),
            is_authentic: "Error".to_string(),
            risk_score: None,
            average_authenticity_score: None,
            policy,
            total_observations: 0,
            rejected_observations: 0,
            unrecognized_observations: 0,
            total_ticks: 0,
            scored_ticks: 0,
            incomplete_ticks: 0,
            insufficient_ticks: 0,
            error_message: Some(format!("{error:#}")),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
