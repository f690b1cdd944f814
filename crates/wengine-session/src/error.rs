//! Session- and interface-level failures.
//!
//! Unlike [`wengine_kernel::KernelError`] or [`wengine_worlds::RuleError`],
//! every variant here is meant to cross the HTTP/WS boundary as a
//! `{success:false, error}` response -- `Display` text is safe to show a
//! caller.

use thiserror::Error;
use wengine_types::{SessionId, SessionStatus};

/// Errors surfaced by [`crate::manager::SessionManager`] and
/// [`crate::driver::TickDriver`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// No session exists with this id. 404-class.
    #[error("no session {session_id}")]
    NotFound {
        /// The id that was not found.
        session_id: SessionId,
    },

    /// The requested transition isn't legal from the session's current
    /// status. 400-class; no state was mutated.
    #[error("session {session_id} is {current:?}, cannot {attempted}")]
    InvalidTransition {
        /// The session in question.
        session_id: SessionId,
        /// Its status at the time of the request.
        current: SessionStatus,
        /// The transition that was rejected (`"start"`, `"pause"`, ...).
        attempted: &'static str,
    },

    /// `create` was called with parameters that don't build a valid engine
    /// (too few agents, malformed init params, ...).
    #[error("invalid session parameters: {0}")]
    InvalidParams(#[from] wengine_worlds::RuleError),

    /// A step raised a [`wengine_kernel::KernelError`]. An event log
    /// append failure here is fatal for the owning session; the driver
    /// moves it to [`SessionStatus::Failed`].
    #[error("engine error: {0}")]
    Engine(#[from] wengine_kernel::KernelError),
}
