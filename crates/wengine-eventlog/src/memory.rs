//! The in-memory [`EventLogStore`] backend: one ordered, append-only list
//! and one sequence counter per session.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use wengine_types::{EntityId, SessionId, WorldEvent};

use crate::error::EventLogError;
use crate::store::EventLogStore;

#[derive(Debug, Default)]
struct SessionLog {
    events: Vec<WorldEvent>,
    next_sequence: u64,
}

/// An in-memory event log. Suitable for single-process deployments and
/// tests; state is lost on process restart.
#[derive(Debug, Default)]
pub struct MemoryEventLogStore {
    sessions: DashMap<SessionId, RwLock<SessionLog>>,
}

impl MemoryEventLogStore {
    /// Build an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventLogStore for MemoryEventLogStore {
    async fn append(
        &self,
        session_id: SessionId,
        mut event: WorldEvent,
    ) -> Result<WorldEvent, EventLogError> {
        let log = self.sessions.entry(session_id).or_default();
        let mut guard = log.write().await;
        let sequence = guard
            .next_sequence
            .checked_add(1)
            .ok_or(EventLogError::SequenceOverflow { session_id })?;
        guard.next_sequence = sequence;
        event.sequence = sequence;
        guard.events.push(event.clone());
        Ok(event)
    }

    async fn get_recent(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> Result<Vec<WorldEvent>, EventLogError> {
        let Some(log) = self.sessions.get(&session_id) else {
            return Ok(Vec::new());
        };
        let guard = log.read().await;
        let start = guard.events.len().saturating_sub(limit);
        Ok(guard.events[start..].to_vec())
    }

    async fn get_by_session(&self, session_id: SessionId) -> Result<Vec<WorldEvent>, EventLogError> {
        let Some(log) = self.sessions.get(&session_id) else {
            return Ok(Vec::new());
        };
        Ok(log.read().await.events.clone())
    }

    async fn get_by_type(
        &self,
        session_id: SessionId,
        event_type: &str,
    ) -> Result<Vec<WorldEvent>, EventLogError> {
        let Some(log) = self.sessions.get(&session_id) else {
            return Ok(Vec::new());
        };
        let guard = log.read().await;
        Ok(guard
            .events
            .iter()
            .filter(|event| event.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn get_after_sequence(
        &self,
        session_id: SessionId,
        after_sequence: u64,
        limit: usize,
    ) -> Result<Vec<WorldEvent>, EventLogError> {
        let Some(log) = self.sessions.get(&session_id) else {
            return Ok(Vec::new());
        };
        let guard = log.read().await;
        Ok(guard
            .events
            .iter()
            .filter(|event| event.sequence > after_sequence)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_agent_visible(
        &self,
        session_id: SessionId,
        agent_id: EntityId,
        limit: usize,
    ) -> Result<Vec<WorldEvent>, EventLogError> {
        let Some(log) = self.sessions.get(&session_id) else {
            return Ok(Vec::new());
        };
        let guard = log.read().await;
        Ok(guard
            .events
            .iter()
            .filter(|event| event.is_visible_to(agent_id))
            .rev()
            .take(limit)
            .rev()
            .cloned()
            .collect())
    }

    async fn prune(&self, session_id: SessionId, keep_count: usize) -> Result<usize, EventLogError> {
        let Some(log) = self.sessions.get(&session_id) else {
            return Ok(0);
        };
        let mut guard = log.write().await;
        let drop_count = guard.events.len().saturating_sub(keep_count);
        guard.events.drain(..drop_count);
        Ok(drop_count)
    }

    async fn count(&self, session_id: SessionId) -> Result<usize, EventLogError> {
        let Some(log) = self.sessions.get(&session_id) else {
            return Ok(0);
        };
        Ok(log.read().await.events.len())
    }

    async fn clear(&self, session_id: SessionId) -> Result<(), EventLogError> {
        self.sessions.remove(&session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: &str) -> WorldEvent {
        WorldEvent::new(event_type, "system")
    }

    #[tokio::test]
    async fn append_assigns_strictly_increasing_sequence() {
        let store = MemoryEventLogStore::new();
        let session = SessionId::new();
        let first = store.append(session, event("a")).await.expect("append");
        let second = store.append(session, event("b")).await.expect("append");
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
    }

    #[tokio::test]
    async fn get_after_sequence_only_returns_newer_events() {
        let store = MemoryEventLogStore::new();
        let session = SessionId::new();
        store.append(session, event("a")).await.expect("append");
        store.append(session, event("b")).await.expect("append");
        store.append(session, event("c")).await.expect("append");
        let after = store
            .get_after_sequence(session, 1, 10)
            .await
            .expect("query");
        assert_eq!(after.len(), 2);
        assert_eq!(after[0].sequence, 2);
        assert_eq!(after[1].sequence, 3);
    }

    #[tokio::test]
    async fn prune_keeps_only_most_recent() {
        let store = MemoryEventLogStore::new();
        let session = SessionId::new();
        for _ in 0..5 {
            store.append(session, event("a")).await.expect("append");
        }
        let dropped = store.prune(session, 2).await.expect("prune");
        assert_eq!(dropped, 3);
        assert_eq!(store.count(session).await.expect("count"), 2);
    }

    #[tokio::test]
    async fn unknown_session_returns_empty_not_error() {
        let store = MemoryEventLogStore::new();
        let events = store
            .get_by_session(SessionId::new())
            .await
            .expect("query");
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn clear_resets_sequence_counter() {
        let store = MemoryEventLogStore::new();
        let session = SessionId::new();
        store.append(session, event("a")).await.expect("append");
        store.clear(session).await.expect("clear");
        let restarted = store.append(session, event("b")).await.expect("append");
        assert_eq!(restarted.sequence, 1);
    }
}
