//! Errors surfaced by the kernel's engine-contract methods.
//!
//! Per-action validation/application failures never produce a
//! [`KernelError`] — they become `ActionResult { success: false, .. }` plus
//! a rejection event. [`KernelError`] covers only the engine-contract
//! operations that can fail outright: registering/unregistering entities
//! that don't exist, and stepping a world that was never initialized.

use thiserror::Error;

use wengine_types::EntityId;

/// Errors from the generic engine contract (`initialize`, `registerEntity`,
/// `unregisterEntity`, ...).
#[derive(Debug, Error)]
pub enum KernelError {
    /// `step`/`getWorldState` called before `initialize`.
    #[error("engine has not been initialized")]
    NotInitialized,

    /// `unregisterEntity` referenced an id not present in world state.
    #[error("unknown entity {entity_id}")]
    UnknownEntity {
        /// The id that was not found.
        entity_id: EntityId,
    },

    /// `registerEntity` referenced an id already present in world state.
    #[error("entity {entity_id} already registered")]
    DuplicateEntity {
        /// The id that already existed.
        entity_id: EntityId,
    },

    /// Appending a step's events to the event log failed. This is fatal
    /// for the owning session.
    #[error("event log append failed: {0}")]
    EventLog(#[from] wengine_eventlog::EventLogError),
}
