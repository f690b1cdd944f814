//! The per-session fan-out boundary: `world_event`,
//! `state_update`, and `simulation_ended` messages for every subscriber of
//! a session.
//!
//! One `tokio::sync::broadcast` channel per session, keyed in a
//! [`dashmap::DashMap`] so sessions can be created and torn down without a
//! global lock.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tokio::sync::broadcast;
use wengine_types::{SessionId, WorldEvent};

/// Capacity of each session's broadcast channel. A subscriber more than
/// this many messages behind drops to [`broadcast::error::RecvError::Lagged`]
/// and resumes from the newest message -- callers that need every event in
/// order should read the event log directly instead of relying on the
/// live stream.
const BROADCAST_CAPACITY: usize = 256;

/// One message pushed to a session's subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionMessage {
    /// A single new event, in sequence order.
    WorldEvent {
        /// The session this event belongs to.
        session_id: SessionId,
        /// The event itself.
        event: WorldEvent,
    },
    /// A post-step world-state snapshot, one per completed step.
    StateUpdate {
        /// The session this snapshot belongs to.
        session_id: SessionId,
        /// The serialized world state.
        state: Json,
    },
    /// Pushed once, on termination.
    SimulationEnded {
        /// The session that ended.
        session_id: SessionId,
        /// Why it ended, if known.
        reason: Option<String>,
    },
}

/// Per-session broadcast hub. Holds one [`broadcast::Sender`] per session
/// that has ever been subscribed to or published on; entries are removed
/// when a session is deleted.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    channels: DashMap<SessionId, broadcast::Sender<SessionMessage>>,
}

impl BroadcastHub {
    /// Build an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a session's messages, creating its channel if this is
    /// the first subscriber.
    #[must_use]
    pub fn subscribe(&self, session_id: SessionId) -> broadcast::Receiver<SessionMessage> {
        self.channels
            .entry(session_id)
            .or_insert_with(|| broadcast::channel(BROADCAST_CAPACITY).0)
            .subscribe()
    }

    /// Publish a message to a session's subscribers. A send with zero
    /// receivers (no one currently subscribed) is not an error.
    pub fn publish(&self, session_id: SessionId, message: SessionMessage) {
        let sender = self
            .channels
            .entry(session_id)
            .or_insert_with(|| broadcast::channel(BROADCAST_CAPACITY).0);
        let _ignored_receiver_count = sender.send(message);
    }

    /// Drop a session's channel. Any live subscribers keep their receiver
    /// but will see the channel closed on their next `recv`.
    pub fn remove(&self, session_id: SessionId) {
        self.channels.remove(&session_id);
    }
}

#[cfg(test)]
mod tests {
    use wengine_types::SessionId;

    use super::{BroadcastHub, SessionMessage};

    #[tokio::test]
    async fn subscriber_sees_published_messages_in_order() {
        let hub = BroadcastHub::new();
        let session_id = SessionId::new();
        let mut rx = hub.subscribe(session_id);

        hub.publish(
            session_id,
            SessionMessage::StateUpdate {
                session_id,
                state: serde_json::json!({"tick": 1}),
            },
        );
        hub.publish(
            session_id,
            SessionMessage::SimulationEnded {
                session_id,
                reason: Some(String::from("max_rounds")),
            },
        );

        let first = rx.recv().await.expect("first message");
        assert!(matches!(first, SessionMessage::StateUpdate { .. }));
        let second = rx.recv().await.expect("second message");
        assert!(matches!(second, SessionMessage::SimulationEnded { .. }));
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let hub = BroadcastHub::new();
        let session_id = SessionId::new();
        hub.publish(
            session_id,
            SessionMessage::SimulationEnded {
                session_id,
                reason: None,
            },
        );
    }
}
