use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use zbus::interface;

use congruity_core::{EmotionObservation, Modality, RecordOutcome};

use crate::config::{Config, TickTrigger};
use crate::sessions::{SessionError, SessionRegistry};

/// Shared state accessible by D-Bus method handlers.
pub struct AppState {
    pub config: Config,
    pub sessions: SessionRegistry,
}

/// D-Bus interface for the Congruity analysis daemon.
///
/// Bus name: org.freedesktop.Congruity1
/// Object path: /org/freedesktop/Congruity1
pub struct CongruityService {
    pub state: Arc<Mutex<AppState>>,
}

fn failed(e: SessionError) -> zbus::fdo::Error {
    match e {
        SessionError::NotOwner(_) => zbus::fdo::Error::AccessDenied(e.to_string()),
        SessionError::UnknownSession(_) => zbus::fdo::Error::InvalidArgs(e.to_string()),
        _ => zbus::fdo::Error::Failed(e.to_string()),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> zbus::fdo::Result<String> {
    serde_json::to_string(value).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
}

/// Build the observation described by `RecordObservation` arguments.
fn observation(
    modality: &str,
    label: &str,
    confidence: f64,
    detected: bool,
    timestamp: f64,
) -> zbus::fdo::Result<EmotionObservation> {
    let modality: Modality = modality
        .parse()
        .map_err(|e: congruity_core::ParseModalityError| {
            zbus::fdo::Error::InvalidArgs(e.to_string())
        })?;
    Ok(if detected {
        EmotionObservation::new(modality, label, Some(confidence), timestamp)
    } else {
        EmotionObservation::absent(modality, timestamp)
    })
}

/// `(accepted, warning)` reply for `RecordObservation`.
fn record_reply(outcome: &RecordOutcome) -> (bool, String) {
    let warning = outcome.warning().map(|w| w.to_string()).unwrap_or_default();
    (!matches!(outcome, RecordOutcome::Rejected(_)), warning)
}

fn status_json(state: &AppState) -> serde_json::Value {
    let tick = match state.config.tick_trigger {
        TickTrigger::OnObservation => "on_observation".to_string(),
        TickTrigger::Interval(d) => format!("{}ms", d.as_millis()),
    };
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "open_sessions": state.sessions.len(),
        "max_sessions": state.config.max_sessions,
        "tick": tick,
        "authenticity_threshold": state.config.analyzer.authenticity_threshold,
        "history_length": state.config.analyzer.history_length,
        "analyzer_config": state.config.analyzer_config_path,
    })
}

/// Tick every open session once per `period`. Never returns.
pub async fn run_interval_ticks(state: Arc<Mutex<AppState>>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        let scored = state.lock().await.sessions.tick_all();
        tracing::trace!(scored, "interval tick");
    }
}

/// Unique bus name of the caller, or `None` when ownership is not enforced.
fn caller(header: &zbus::message::Header<'_>, session_bus: bool) -> zbus::fdo::Result<Option<String>> {
    if session_bus {
        return Ok(None);
    }
    let sender = header
        .sender()
        .ok_or_else(|| zbus::fdo::Error::Failed("no sender in message".to_string()))?;
    Ok(Some(sender.to_string()))
}

#[interface(name = "org.freedesktop.Congruity1")]
impl CongruityService {
    /// Open a new analysis session. Returns its ID.
    ///
    /// On the system bus the session is bound to the caller's unique bus
    /// name; only that caller may record into, analyze or close it.
    async fn open_session(
        &self,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<String> {
        let mut state = self.state.lock().await;
        let owner = caller(&header, state.config.session_bus)?;
        let id = state.sessions.open(owner).map_err(|e| {
            tracing::warn!(error = %e, "open_session failed");
            failed(e)
        })?;
        Ok(id)
    }

    /// Record one emotion observation from the facial or speech source.
    ///
    /// `detected = false` records an explicit no-detection tick; label and
    /// confidence are ignored in that case. Returns whether the observation
    /// was accepted and the warning text, empty if none.
    async fn record_observation(
        &self,
        session_id: &str,
        modality: &str,
        label: &str,
        confidence: f64,
        detected: bool,
        timestamp: f64,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<(bool, String)> {
        let observation = observation(modality, label, confidence, detected, timestamp)?;

        let mut state = self.state.lock().await;
        let owner = caller(&header, state.config.session_bus)?;
        let outcome = state
            .sessions
            .record(session_id, owner.as_deref(), observation)
            .map_err(failed)?;

        Ok(record_reply(&outcome))
    }

    /// Analyze the session's current history. Returns the tick as JSON.
    async fn analyze(
        &self,
        session_id: &str,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<String> {
        let mut state = self.state.lock().await;
        let owner = caller(&header, state.config.session_bus)?;
        let analysis = state
            .sessions
            .analyze(session_id, owner.as_deref())
            .map_err(failed)?;
        to_json(&analysis)
    }

    /// Close a session and return its report (summary + last tick) as JSON.
    async fn close_session(
        &self,
        session_id: &str,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<String> {
        let mut state = self.state.lock().await;
        let owner = caller(&header, state.config.session_bus)?;
        let report = state
            .sessions
            .close(session_id, owner.as_deref())
            .map_err(failed)?;
        to_json(&report)
    }

    /// List open sessions as JSON.
    async fn list_sessions(&self) -> zbus::fdo::Result<String> {
        let state = self.state.lock().await;
        to_json(&state.sessions.list())
    }

    /// Return daemon status information as JSON.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let state = self.state.lock().await;
        Ok(status_json(&state).to_string())
    }
}
