//! The [`Session`] value type: one live world instantiation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::enums::{SessionStatus, WorldKind};
use crate::ids::SessionId;

/// Parameters a caller supplies to create a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionParams {
    /// Which world kind to instantiate.
    pub world_kind: WorldKind,
    /// Who asked for this session (opaque user id, never validated here).
    pub created_by: String,
    /// Display title.
    pub title: String,
    /// World-kind-specific initialization parameters (topic, scenario,
    /// seed agents, ...), interpreted by that kind's engine constructor.
    pub init_params: Json,
    /// Optional cap on rounds/ticks before forced termination.
    pub max_rounds: Option<u64>,
    /// Optional opaque LLM configuration, passed through unexamined to the
    /// `ILLMProvider` boundary.
    pub llm_config: Option<Json>,
}

/// One live world instantiation: config, status, and (while alive) the
/// owning engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique id.
    pub session_id: SessionId,
    /// Who created this session.
    pub created_by: String,
    /// Which world kind this is.
    pub world_kind: WorldKind,
    /// Display title.
    pub title: String,
    /// Lifecycle status, transitions enforced by the session manager.
    pub status: SessionStatus,
    /// The world's own round counter, mirrored here for summaries that
    /// don't need the full state snapshot.
    pub current_round: u64,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When `start` was first called, if ever.
    pub started_at: Option<DateTime<Utc>>,
    /// When the session reached a terminal status, if ever.
    pub ended_at: Option<DateTime<Utc>>,
    /// Opaque LLM configuration, unexamined by the kernel.
    pub llm_config: Option<Json>,
}

impl Session {
    /// Build a new session in `Pending` status from creation params.
    #[must_use]
    pub fn new(session_id: SessionId, params: &CreateSessionParams) -> Self {
        Self {
            session_id,
            created_by: params.created_by.clone(),
            world_kind: params.world_kind,
            title: params.title.clone(),
            status: SessionStatus::Pending,
            current_round: 0,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            llm_config: params.llm_config.clone(),
        }
    }

    /// Whether this session has reached a terminal status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.status, SessionStatus::Ended | SessionStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CreateSessionParams {
        CreateSessionParams {
            world_kind: WorldKind::Debate,
            created_by: String::from("user-1"),
            title: String::from("Should we colonize Mars?"),
            init_params: Json::Null,
            max_rounds: Some(10),
            llm_config: None,
        }
    }

    #[test]
    fn new_session_starts_pending() {
        let session = Session::new(SessionId::new(), &params());
        assert_eq!(session.status, SessionStatus::Pending);
        assert!(!session.is_terminal());
        assert!(session.started_at.is_none());
    }

    #[test]
    fn ended_session_is_terminal() {
        let mut session = Session::new(SessionId::new(), &params());
        session.status = SessionStatus::Ended;
        assert!(session.is_terminal());
    }
}
