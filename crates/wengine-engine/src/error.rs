//! Error types for the world engine binary.
//!
//! [`EngineError`] is the top-level error type wrapping every failure
//! mode during startup.

/// Top-level error for the world engine binary.
///
/// Each variant wraps a specific subsystem error, giving `main` a single
/// type to propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {0}")]
    Config(#[from] wengine_session::config::ConfigError),

    /// Connecting to the configured event-log backend failed.
    #[error("event log error: {0}")]
    EventLog(#[from] wengine_eventlog::EventLogError),

    /// The observer HTTP/`WebSocket` server failed to start.
    #[error("observer error: {0}")]
    Observer(#[from] wengine_observer::StartupError),

    /// The observer server's background task panicked or was cancelled.
    #[error("observer task join error: {0}")]
    Join(String),
}
