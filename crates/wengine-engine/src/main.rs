//! World engine binary.
//!
//! Loads [`EngineConfig`], builds the event-log backend it names, and
//! starts one [`SessionManager`] whose only means of reaching the outside
//! world is the observer HTTP/`WebSocket` server. No session exists until
//! a client calls `POST /api/isolation/sessions` or the `create_session`
//! `WebSocket` RPC: this binary hosts a table of independent sessions
//! rather than one process-wide simulation.
//!
//! # Startup sequence
//!
//! 1. Initialize structured logging (`tracing-subscriber`).
//! 2. Load [`EngineConfig`] from `wengine-config.yaml` (or defaults).
//! 3. Build the configured [`wengine_eventlog::EventLogStore`] backend.
//! 4. Build a [`SessionManager`] with that backend, a
//!    [`wengine_session::NullDecisionSource`], and the configured
//!    tunables.
//! 5. Start the observer server and block until it exits.

mod error;

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use wengine_eventlog::{EventLogStore, MemoryEventLogStore, RedisEventLogStore};
use wengine_observer::state::AppState;
use wengine_session::config::{EngineConfig, EventLogBackend};
use wengine_session::{NullDecisionSource, SessionManager};

use crate::error::EngineError;

/// Default `host:port` the observer HTTP/`WebSocket` server binds to.
const DEFAULT_OBSERVER_PORT: u16 = 8080;

/// Application entry point for the world engine.
///
/// # Errors
///
/// Returns an error if configuration fails to load, the configured
/// event-log backend can't be reached, or the observer server fails to
/// bind.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("wengine-engine starting");

    let config = load_config()?;
    info!(
        event_log_backend = ?config.event_log_backend,
        "configuration loaded"
    );

    let event_log = build_event_log(&config).await?;
    let manager = Arc::new(SessionManager::with_tunables(
        event_log,
        Arc::new(NullDecisionSource::new()),
        config.tunables,
    ));

    let state = Arc::new(AppState::new(manager));
    info!(port = DEFAULT_OBSERVER_PORT, "starting observer server");
    let handle = wengine_observer::spawn_observer(DEFAULT_OBSERVER_PORT, state).await?;
    handle.await.map_err(|error| EngineError::Join(error.to_string()))?;

    info!("wengine-engine shutdown complete");
    Ok(())
}

/// Load [`EngineConfig`] from `wengine-config.yaml` if present, falling
/// back to defaults (in-memory event log, stock tunables) otherwise.
fn load_config() -> Result<EngineConfig, EngineError> {
    let path = Path::new("wengine-config.yaml");
    if path.exists() {
        Ok(EngineConfig::from_file(path)?)
    } else {
        info!("config file not found, using defaults");
        Ok(EngineConfig::default())
    }
}

/// Build the event-log backend named by `config.event_log_backend`.
async fn build_event_log(config: &EngineConfig) -> Result<Arc<dyn EventLogStore>, EngineError> {
    match config.event_log_backend {
        EventLogBackend::Memory => Ok(Arc::new(MemoryEventLogStore::new())),
        EventLogBackend::Redis => {
            let store = RedisEventLogStore::connect(&config.redis_url).await?;
            Ok(Arc::new(store))
        }
    }
}
