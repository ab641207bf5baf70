use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use congruity_core::{
    Analysis, Analyzer, AnalyzerConfig, CongruenceTable, ConfigError, EmotionObservation,
    RecordOutcome, SessionSummary, SummaryBuilder,
};

use crate::config::TickTrigger;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("unknown session: {0}")]
    UnknownSession(String),
    #[error("session limit reached ({0} open)")]
    LimitReached(usize),
    #[error("session {0} is owned by another client")]
    NotOwner(String),
    #[error("analyzer config error: {0}")]
    Config(#[from] ConfigError),
}

/// One analysis session: an analyzer plus the running summary of its ticks.
struct Session {
    opened_at: DateTime<Utc>,
    owner: Option<String>,
    analyzer: Analyzer,
    summary: SummaryBuilder,
    last_tick: Option<Analysis>,
}

/// Final report returned when a session is closed.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: String,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    /// `None` if no tick was ever scored.
    pub summary: Option<SessionSummary>,
    pub last_tick: Option<Analysis>,
}

/// Per-session listing entry.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub opened_at: DateTime<Utc>,
    pub scored_ticks: usize,
}

/// All open sessions. Every session shares one congruence table.
pub struct SessionRegistry {
    config: AnalyzerConfig,
    table: Arc<CongruenceTable>,
    trigger: TickTrigger,
    max_sessions: usize,
    sessions: HashMap<String, Session>,
}

impl SessionRegistry {
    pub fn new(
        config: AnalyzerConfig,
        trigger: TickTrigger,
        max_sessions: usize,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let table = Arc::clone(&config.congruence);
        Ok(Self {
            config,
            table,
            trigger,
            max_sessions,
            sessions: HashMap::new(),
        })
    }

    /// Open a new session, optionally bound to the caller that opened it.
    pub fn open(&mut self, owner: Option<String>) -> Result<String, SessionError> {
        if self.sessions.len() >= self.max_sessions {
            return Err(SessionError::LimitReached(self.sessions.len()));
        }
        let analyzer = Analyzer::with_table(self.config.clone(), Arc::clone(&self.table))?;
        let id = uuid::Uuid::new_v4().to_string();
        self.sessions.insert(
            id.clone(),
            Session {
                opened_at: Utc::now(),
                owner,
                analyzer,
                summary: SummaryBuilder::new(
                    self.config.authenticity_threshold,
                    self.config.summary_policy,
                ),
                last_tick: None,
            },
        );
        tracing::info!(session = %id, open = self.sessions.len(), "session opened");
        Ok(id)
    }

    fn session_mut(&mut self, id: &str, caller: Option<&str>) -> Result<&mut Session, SessionError> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownSession(id.to_string()))?;
        if let (Some(owner), Some(caller)) = (session.owner.as_deref(), caller) {
            if owner != caller {
                return Err(SessionError::NotOwner(id.to_string()));
            }
        }
        Ok(session)
    }

    /// Record an observation; ticks the session if ticking on observations.
    pub fn record(
        &mut self,
        id: &str,
        caller: Option<&str>,
        observation: EmotionObservation,
    ) -> Result<RecordOutcome, SessionError> {
        let trigger = self.trigger;
        let session = self.session_mut(id, caller)?;
        let outcome = session.analyzer.record(observation);
        if trigger == TickTrigger::OnObservation && outcome.is_accepted() {
            tick(session);
        }
        Ok(outcome)
    }

    /// Fresh analysis of the current history. Does not count as a tick.
    pub fn analyze(&mut self, id: &str, caller: Option<&str>) -> Result<Analysis, SessionError> {
        Ok(self.session_mut(id, caller)?.analyzer.analyze())
    }

    /// Tick every open session. Returns how many ticks were scored.
    pub fn tick_all(&mut self) -> usize {
        self.sessions
            .values_mut()
            .map(tick)
            .filter(|analysis| analysis.is_scored())
            .count()
    }

    pub fn close(&mut self, id: &str, caller: Option<&str>) -> Result<SessionReport, SessionError> {
        self.session_mut(id, caller)?;
        let session = self
            .sessions
            .remove(id)
            .ok_or_else(|| SessionError::UnknownSession(id.to_string()))?;
        let summary = session.summary.finish();
        tracing::info!(
            session = id,
            scored = session.summary.scored_ticks(),
            status = ?summary.as_ref().map(|s| s.status),
            "session closed"
        );
        Ok(SessionReport {
            session_id: id.to_string(),
            opened_at: session.opened_at,
            closed_at: Utc::now(),
            summary,
            last_tick: session.last_tick,
        })
    }

    pub fn list(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .sessions
            .iter()
            .map(|(id, s)| SessionInfo {
                session_id: id.clone(),
                opened_at: s.opened_at,
                scored_ticks: s.summary.scored_ticks(),
            })
            .collect();
        infos.sort_by_key(|info| info.opened_at);
        infos
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

fn tick(session: &mut Session) -> Analysis {
    let analysis = session.analyzer.analyze();
    session.summary.push(&analysis);
    session.last_tick = Some(analysis.clone());
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use congruity_core::{AuthenticityStatus, Modality};
    use std::time::Duration;

    fn registry(trigger: TickTrigger) -> SessionRegistry {
        SessionRegistry::new(AnalyzerConfig::default(), trigger, 2).unwrap()
    }

    fn obs(modality: Modality, label: &str, t: f64) -> EmotionObservation {
        EmotionObservation::new(modality, label, Some(0.9), t)
    }

    #[test]
    fn test_open_record_close() {
        let mut reg = registry(TickTrigger::OnObservation);
        let id = reg.open(None).unwrap();
        for i in 0..10 {
            let t = i as f64;
            let _ = reg.record(&id, None, obs(Modality::Face, "happy", t)).unwrap();
            let _ = reg.record(&id, None, obs(Modality::Voice, "happy", t)).unwrap();
        }
        let report = reg.close(&id, None).unwrap();
        let summary = report.summary.unwrap();
        assert_eq!(summary.status, AuthenticityStatus::Authentic);
        // the very first record ticks with no vocal history yet
        assert_eq!(summary.insufficient_ticks, 1);
        assert_eq!(summary.scored_ticks, 19);
        assert_eq!(reg.len(), 0);
    }

    #[test]
    fn test_limit_enforced() {
        let mut reg = registry(TickTrigger::OnObservation);
        reg.open(None).unwrap();
        reg.open(None).unwrap();
        assert!(matches!(reg.open(None), Err(SessionError::LimitReached(2))));
    }

    #[test]
    fn test_unknown_session() {
        let mut reg = registry(TickTrigger::OnObservation);
        assert!(matches!(
            reg.analyze("nope", None),
            Err(SessionError::UnknownSession(_))
        ));
    }

    #[test]
    fn test_owner_enforced() {
        let mut reg = registry(TickTrigger::OnObservation);
        let id = reg.open(Some(":1.42".to_string())).unwrap();
        assert!(matches!(
            reg.analyze(&id, Some(":1.7")),
            Err(SessionError::NotOwner(_))
        ));
        assert!(reg.analyze(&id, Some(":1.42")).is_ok());
        // unchecked callers (session bus) pass through
        assert!(reg.analyze(&id, None).is_ok());
    }

    #[test]
    fn test_interval_mode_ticks_only_on_demand() {
        let mut reg = registry(TickTrigger::Interval(Duration::from_millis(500)));
        let id = reg.open(None).unwrap();
        let _ = reg.record(&id, None, obs(Modality::Face, "sad", 0.0)).unwrap();
        let _ = reg.record(&id, None, obs(Modality::Voice, "calm", 0.0)).unwrap();
        assert_eq!(reg.list()[0].scored_ticks, 0);

        assert_eq!(reg.tick_all(), 1);
        assert_eq!(reg.tick_all(), 1);
        assert_eq!(reg.list()[0].scored_ticks, 2);
    }

    #[test]
    fn test_rejected_observation_does_not_tick() {
        let mut reg = registry(TickTrigger::OnObservation);
        let id = reg.open(None).unwrap();
        let _ = reg.record(&id, None, obs(Modality::Face, "happy", 5.0)).unwrap();
        let _ = reg.record(&id, None, obs(Modality::Voice, "happy", 5.0)).unwrap();
        let outcome = reg.record(&id, None, obs(Modality::Face, "happy", 1.0)).unwrap();
        assert!(!outcome.is_accepted());
        assert_eq!(reg.list()[0].scored_ticks, 1);
    }
}
