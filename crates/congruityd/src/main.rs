use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod sessions;

use config::{Config, TickTrigger};
use dbus_interface::{AppState, CongruityService};
use sessions::SessionRegistry;

const BUS_NAME: &str = "org.freedesktop.Congruity1";
const OBJECT_PATH: &str = "/org/freedesktop/Congruity1";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("congruityd starting");

    let config = Config::from_env().context("invalid configuration")?;
    let sessions = SessionRegistry::new(
        config.analyzer.clone(),
        config.tick_trigger,
        config.max_sessions,
    )?;
    let tick_trigger = config.tick_trigger;
    let session_bus = config.session_bus;

    tracing::info!(
        history_length = config.analyzer.history_length,
        threshold = config.analyzer.authenticity_threshold,
        tick = ?tick_trigger,
        session_bus,
        "configuration loaded"
    );

    let state = Arc::new(Mutex::new(AppState { config, sessions }));
    let service = CongruityService {
        state: Arc::clone(&state),
    };

    let builder = if session_bus {
        zbus::connection::Builder::session()?
    } else {
        zbus::connection::Builder::system()?
    };
    let _conn = builder
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, service)?
        .build()
        .await
        .context("failed to register on D-Bus")?;

    if let TickTrigger::Interval(period) = tick_trigger {
        tokio::spawn(dbus_interface::run_interval_ticks(Arc::clone(&state), period));
    }

    tracing::info!(bus = BUS_NAME, path = OBJECT_PATH, "congruityd ready");

    // Keep running until signaled
    tokio::signal::ctrl_c().await?;
    tracing::info!("congruityd shutting down");

    Ok(())
}
