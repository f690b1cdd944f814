//! The Redis-backed [`EventLogStore`]: a typed wrapper around
//! [`fred::prelude::Client`] using an `RPUSH`/`INCR`/TTL key style.
//!
//! Key layout per session:
//!
//! | Key | Type | Purpose |
//! |---|---|---|
//! | `we:events:{sessionId}:list` | List | Serialized events, append order |
//! | `we:events:{sessionId}:seq` | Integer | Last assigned sequence |
//!
//! Both keys share a 24 hour TTL, refreshed on every append.

use async_trait::async_trait;
use fred::prelude::*;
use wengine_types::{EntityId, SessionId, WorldEvent};

use crate::error::EventLogError;
use crate::store::EventLogStore;

const SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;

fn list_key(session_id: SessionId) -> String {
    format!("we:events:{session_id}:list")
}

fn seq_key(session_id: SessionId) -> String {
    format!("we:events:{session_id}:seq")
}

/// A Redis (or Redis-compatible) event log backend.
#[derive(Clone)]
pub struct RedisEventLogStore {
    client: Client,
}

impl RedisEventLogStore {
    /// Connect to the server at `url` (`redis://host:port[/db]`).
    ///
    /// # Errors
    ///
    /// Returns [`EventLogError::Redis`] if the URL is invalid or the
    /// connection fails.
    pub async fn connect(url: &str) -> Result<Self, EventLogError> {
        let config = Config::from_url(url)?;
        let client = Builder::from_config(config).build()?;
        client.init().await?;
        tracing::info!("connected to redis event log backend");
        Ok(Self { client })
    }

    async fn all_events(&self, session_id: SessionId) -> Result<Vec<WorldEvent>, EventLogError> {
        let key = list_key(session_id);
        let raw: Vec<String> = self.client.lrange(&key, 0, -1).await?;
        let mut events = Vec::with_capacity(raw.len());
        for entry in &raw {
            events.push(serde_json::from_str(entry)?);
        }
        Ok(events)
    }
}

#[async_trait]
impl EventLogStore for RedisEventLogStore {
    async fn append(
        &self,
        session_id: SessionId,
        mut event: WorldEvent,
    ) -> Result<WorldEvent, EventLogError> {
        let sequence_key = seq_key(session_id);
        let sequence: i64 = self.client.incr(&sequence_key).await?;
        let sequence = u64::try_from(sequence).map_err(|_err| EventLogError::SequenceOverflow {
            session_id,
        })?;
        event.sequence = sequence;

        let list_key = list_key(session_id);
        let json = serde_json::to_string(&event)?;
        let _: u64 = self.client.rpush(&list_key, json.as_str()).await?;
        let _: bool = self.client.expire(&list_key, SESSION_TTL_SECONDS, None).await?;
        let _: bool = self
            .client
            .expire(&sequence_key, SESSION_TTL_SECONDS, None)
            .await?;
        Ok(event)
    }

    async fn get_recent(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> Result<Vec<WorldEvent>, EventLogError> {
        let events = self.all_events(session_id).await?;
        let start = events.len().saturating_sub(limit);
        Ok(events[start..].to_vec())
    }

    async fn get_by_session(&self, session_id: SessionId) -> Result<Vec<WorldEvent>, EventLogError> {
        self.all_events(session_id).await
    }

    async fn get_by_type(
        &self,
        session_id: SessionId,
        event_type: &str,
    ) -> Result<Vec<WorldEvent>, EventLogError> {
        Ok(self
            .all_events(session_id)
            .await?
            .into_iter()
            .filter(|event| event.event_type == event_type)
            .collect())
    }

    async fn get_after_sequence(
        &self,
        session_id: SessionId,
        after_sequence: u64,
        limit: usize,
    ) -> Result<Vec<WorldEvent>, EventLogError> {
        Ok(self
            .all_events(session_id)
            .await?
            .into_iter()
            .filter(|event| event.sequence > after_sequence)
            .take(limit)
            .collect())
    }

    async fn get_agent_visible(
        &self,
        session_id: SessionId,
        agent_id: EntityId,
        limit: usize,
    ) -> Result<Vec<WorldEvent>, EventLogError> {
        let mut visible: Vec<WorldEvent> = self
            .all_events(session_id)
            .await?
            .into_iter()
            .filter(|event| event.is_visible_to(agent_id))
            .collect();
        let start = visible.len().saturating_sub(limit);
        Ok(visible.split_off(start))
    }

    async fn prune(&self, session_id: SessionId, keep_count: usize) -> Result<usize, EventLogError> {
        let key = list_key(session_id);
        let total: u64 = self.client.llen(&key).await?;
        let total = usize::try_from(total).unwrap_or(usize::MAX);
        let drop_count = total.saturating_sub(keep_count);
        if drop_count > 0 {
            let _: () = self.client.ltrim(&key, i64::try_from(drop_count).unwrap_or(i64::MAX), -1).await?;
        }
        Ok(drop_count)
    }

    async fn count(&self, session_id: SessionId) -> Result<usize, EventLogError> {
        let total: u64 = self.client.llen(&list_key(session_id)).await?;
        Ok(usize::try_from(total).unwrap_or(usize::MAX))
    }

    async fn clear(&self, session_id: SessionId) -> Result<(), EventLogError> {
        let _: u32 = self.client.del(&list_key(session_id)).await?;
        let _: u32 = self.client.del(&seq_key(session_id)).await?;
        Ok(())
    }
}
