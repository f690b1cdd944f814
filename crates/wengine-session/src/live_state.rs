//! A read-only world-state snapshot a running session's
//! [`crate::driver::TickDriver`] publishes after every step.
//!
//! World state is exclusively owned by the engine; no external reads of
//! mutable internals are allowed -- read-only snapshots are produced by
//! `getWorldState()`. [`crate::manager::SessionManager`]
//! never reaches into a running session's engine directly -- the engine
//! itself is moved into the driver task for the session's entire `Running`
//! lifetime. This is the read-only channel the manager uses instead.

use serde_json::Value as Json;
use tokio::sync::RwLock;

/// Shared, single-writer/many-reader snapshot of one session's world
/// state.
#[derive(Debug, Default)]
pub struct LiveState {
    snapshot: RwLock<Option<Json>>,
}

impl LiveState {
    /// Build an empty snapshot (no step has completed yet).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new snapshot, replacing whatever was there before.
    pub async fn set(&self, state: Json) {
        *self.snapshot.write().await = Some(state);
    }

    /// The most recently published snapshot, if any step has completed.
    pub async fn get(&self) -> Option<Json> {
        self.snapshot.read().await.clone()
    }

    /// The world's own round/tick counter from the most recent snapshot,
    /// defaulting to `0` before the first step.
    pub async fn current_round(&self) -> u64 {
        self.get()
            .await
            .as_ref()
            .and_then(|state| state.get("current_time"))
            .and_then(|time| time.get("round"))
            .and_then(Json::as_u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::LiveState;

    #[tokio::test]
    async fn starts_empty() {
        let live_state = LiveState::new();
        assert!(live_state.get().await.is_none());
        assert_eq!(live_state.current_round().await, 0);
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let live_state = LiveState::new();
        live_state
            .set(serde_json::json!({"current_time": {"round": 3}}))
            .await;
        assert_eq!(live_state.current_round().await, 3);
    }
}
