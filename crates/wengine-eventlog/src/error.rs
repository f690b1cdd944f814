//! Errors from [`crate::EventLogStore`] backends.

use thiserror::Error;
use wengine_types::SessionId;

/// Errors an [`crate::EventLogStore`] backend can return.
///
/// A log append failure is fatal for the owning session: the driver
/// halts and the session enters `failed`.
#[derive(Debug, Error)]
pub enum EventLogError {
    /// The Redis backend could not reach or was rejected by the server.
    #[error("redis backend error: {0}")]
    Redis(#[from] fred::error::Error),

    /// A stored event failed to (de)serialize.
    #[error("event (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// `getBySession`/`getByType`/... referenced a session with no log.
    #[error("no event log for session {session_id}")]
    UnknownSession {
        /// The session that has no log.
        session_id: SessionId,
    },

    /// The per-session sequence counter reached `u64::MAX`.
    #[error("sequence counter overflowed for session {session_id}")]
    SequenceOverflow {
        /// The session whose counter overflowed.
        session_id: SessionId,
    },
}
