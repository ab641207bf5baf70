use std::path::PathBuf;
use std::time::Duration;

use congruity_core::{AnalyzerConfig, ConfigError};

/// When a session's analyzer is ticked into its running summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickTrigger {
    /// After every accepted observation.
    OnObservation,
    /// On a fixed wall-clock interval, for every open session.
    Interval(Duration),
}

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Analyzer settings applied to every new session.
    pub analyzer: AnalyzerConfig,
    /// TOML file the analyzer settings were read from, if any.
    pub analyzer_config_path: Option<PathBuf>,
    pub tick_trigger: TickTrigger,
    /// Maximum number of concurrently open sessions.
    pub max_sessions: usize,
    /// Whether the daemon is running on the session bus (development mode).
    /// Session ownership checks are skipped on the session bus.
    pub session_bus: bool,
}

impl Config {
    /// Load configuration from `CONGRUITY_*` environment variables with defaults.
    ///
    /// `CONGRUITY_CONFIG` names a TOML analyzer config; the scalar overrides
    /// (`CONGRUITY_HISTORY_LENGTH`, `CONGRUITY_AUTHENTICITY_THRESHOLD`) are
    /// applied on top of it and the result is validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let analyzer_config_path = std::env::var("CONGRUITY_CONFIG").ok().map(PathBuf::from);

        let mut analyzer = match &analyzer_config_path {
            Some(path) => AnalyzerConfig::from_toml_file(path)?,
            None => AnalyzerConfig::default(),
        };
        analyzer.history_length = env_usize("CONGRUITY_HISTORY_LENGTH", analyzer.history_length);
        analyzer.authenticity_threshold = env_f64(
            "CONGRUITY_AUTHENTICITY_THRESHOLD",
            analyzer.authenticity_threshold,
        );
        analyzer.validate()?;

        let tick_interval_ms = env_u64("CONGRUITY_TICK_INTERVAL_MS", 0);
        let tick_trigger = if tick_interval_ms == 0 {
            TickTrigger::OnObservation
        } else {
            TickTrigger::Interval(Duration::from_millis(tick_interval_ms))
        };

        Ok(Self {
            analyzer,
            analyzer_config_path,
            tick_trigger,
            max_sessions: env_usize("CONGRUITY_MAX_SESSIONS", 16),
            session_bus: std::env::var("CONGRUITY_SESSION_BUS").is_ok(),
        })
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
