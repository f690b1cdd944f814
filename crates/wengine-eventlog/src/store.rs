//! The [`EventLogStore`] contract: a per-session,
//! append-only, strictly-sequenced log of [`WorldEvent`]s, backed by
//! either [`crate::memory::MemoryEventLogStore`] or
//! [`crate::redis::RedisEventLogStore`]. No other component depends on
//! which backend is in use.

use async_trait::async_trait;
use wengine_types::{EntityId, SessionId, WorldEvent};

use crate::error::EventLogError;

/// A per-session, append-only, strictly-sequenced event log.
///
/// Invariant: sequences are assigned inside `append` and never rewritten;
/// two concurrent `append`s for the same session produce distinct,
/// strictly increasing sequences.
#[async_trait]
pub trait EventLogStore: Send + Sync {
    /// Assign the next per-session sequence to `event` and store it,
    /// returning the stored event (with `sequence` set).
    async fn append(
        &self,
        session_id: SessionId,
        event: WorldEvent,
    ) -> Result<WorldEvent, EventLogError>;

    /// The most recent `limit` events, ascending by sequence.
    async fn get_recent(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> Result<Vec<WorldEvent>, EventLogError>;

    /// All events for a session, ascending by sequence.
    async fn get_by_session(&self, session_id: SessionId) -> Result<Vec<WorldEvent>, EventLogError>;

    /// All events of one `event_type` for a session, ascending by sequence.
    async fn get_by_type(
        &self,
        session_id: SessionId,
        event_type: &str,
    ) -> Result<Vec<WorldEvent>, EventLogError>;

    /// Events with `sequence > after_sequence`, ascending, capped at
    /// `limit`. Used by incremental subscribers.
    async fn get_after_sequence(
        &self,
        session_id: SessionId,
        after_sequence: u64,
        limit: usize,
    ) -> Result<Vec<WorldEvent>, EventLogError>;

    /// Events visible to `agent_id` per [`WorldEvent::is_visible_to`],
    /// ascending by sequence, capped at `limit`.
    async fn get_agent_visible(
        &self,
        session_id: SessionId,
        agent_id: EntityId,
        limit: usize,
    ) -> Result<Vec<WorldEvent>, EventLogError>;

    /// Retain only the most recent `keep_count` events for a session;
    /// return how many were dropped.
    async fn prune(&self, session_id: SessionId, keep_count: usize) -> Result<usize, EventLogError>;

    /// Total events stored for a session.
    async fn count(&self, session_id: SessionId) -> Result<usize, EventLogError>;

    /// Drop every event for a session and reset its sequence counter.
    async fn clear(&self, session_id: SessionId) -> Result<(), EventLogError>;
}
