//! Shared application state for the observer server.
//!
//! [`AppState`] wraps the one [`SessionManager`] this process hosts, which
//! is itself the sole owner of the session table and the broadcast hub.
//! There is no separate snapshot cache here -- `GET` handlers read
//! straight through to the manager.

use std::sync::Arc;

use wengine_session::SessionManager;

/// Shared state for the Axum application, injected via the `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    /// The session table and tick-driver spawner.
    pub manager: Arc<SessionManager>,
}

impl AppState {
    /// Build app state over an existing session manager.
    #[must_use]
    pub const fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}
