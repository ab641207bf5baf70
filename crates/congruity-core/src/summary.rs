//! Session-level aggregation of per-tick results.
//!
//! The analyzer keeps no result history; callers that want a verdict for a
//! whole session (the daemon on close, the CLI after a replay) feed each tick
//! into a [`SummaryBuilder`] or hand an iterable of ticks to
//! [`SessionSummary::from_analyses`].

use serde::{Deserialize, Serialize};

use crate::analyzer::Analysis;
use crate::fusion::{classify, AuthenticityStatus};

/// How the overall session status is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryPolicy {
    /// Mean authenticity score compared against the threshold.
    #[default]
    MeanThreshold,
    /// Strict majority of scored ticks must be authentic; ties are spoofs.
    MajorityVote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub mean_authenticity_score: f64,
    pub mean_risk_score: f64,
    pub status: AuthenticityStatus,
    pub policy: SummaryPolicy,
    pub scored_ticks: usize,
    pub authentic_ticks: usize,
    /// Scored ticks where at least one modality's latest observation was absent.
    pub incomplete_ticks: usize,
    /// Ticks that returned insufficient data.
    pub insufficient_ticks: usize,
}

impl SessionSummary {
    /// Summarize a sequence of ticks. `None` if no tick was scored.
    pub fn from_analyses<'a, I>(analyses: I, threshold: f64, policy: SummaryPolicy) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Analysis>,
    {
        let mut builder = SummaryBuilder::new(threshold, policy);
        for analysis in analyses {
            builder.push(analysis);
        }
        builder.finish()
    }
}

/// Incremental summary accumulator.
#[derive(Debug, Clone)]
pub struct SummaryBuilder {
    threshold: f64,
    policy: SummaryPolicy,
    authenticity_sum: f64,
    scored: usize,
    authentic: usize,
    incomplete: usize,
    insufficient: usize,
}

impl SummaryBuilder {
    pub fn new(threshold: f64, policy: SummaryPolicy) -> Self {
        Self {
            threshold,
            policy,
            authenticity_sum: 0.0,
            scored: 0,
            authentic: 0,
            incomplete: 0,
            insufficient: 0,
        }
    }

    pub fn push(&mut self, analysis: &Analysis) {
        match analysis {
            Analysis::Scored(result) => {
                self.scored += 1;
                self.authenticity_sum += result.authenticity_score;
                if result.status.is_authentic() {
                    self.authentic += 1;
                }
                if result.breakdown.incomplete {
                    self.incomplete += 1;
                }
            }
            Analysis::InsufficientData { .. } => self.insufficient += 1,
        }
    }

    pub fn scored_ticks(&self) -> usize {
        self.scored
    }

    pub fn finish(&self) -> Option<SessionSummary> {
        if self.scored == 0 {
            return None;
        }
        let mean = self.authenticity_sum / self.scored as f64;
        let status = match self.policy {
            SummaryPolicy::MeanThreshold => classify(mean, self.threshold),
            SummaryPolicy::MajorityVote => {
                if self.authentic * 2 > self.scored {
                    AuthenticityStatus::Authentic
                } else {
                    AuthenticityStatus::PotentialSpoof
                }
            }
        };
        Some(SessionSummary {
            mean_authenticity_score: mean,
            mean_risk_score: 1.0 - mean,
            status,
            policy: self.policy,
            scored_ticks: self.scored,
            authentic_ticks: self.authentic,
            incomplete_ticks: self.incomplete,
            insufficient_ticks: self.insufficient,
        })
    }
}
