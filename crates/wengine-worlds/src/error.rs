//! Errors raised while constructing a world kind's initial state.
//!
//! Per-action failures never appear here — those become
//! `ValidationOutcome`/`ActionResult`. [`RuleError`]
//! only covers session-creation-time failures: malformed init params,
//! missing agents, unknown roles.

use wengine_types::EntityId;

/// Errors constructing a world kind's state from `CreateSessionParams`.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// A required init parameter was missing or the wrong shape.
    #[error("missing or malformed init parameter: {0}")]
    InvalidInitParams(String),

    /// Fewer agents were supplied than the world kind requires.
    #[error("world kind requires at least {minimum} agents, got {actual}")]
    NotEnoughAgents {
        /// The minimum agent count this world kind requires.
        minimum: usize,
        /// The number of agents actually supplied.
        actual: usize,
    },

    /// An init param referenced an agent id not present in the roster.
    #[error("unknown agent {agent_id} referenced in init params")]
    UnknownAgent {
        /// The id that was not found.
        agent_id: EntityId,
    },
}
