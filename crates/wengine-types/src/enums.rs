//! Enumeration types shared across all world kinds.
//!
//! Per-world-kind vocabularies (Debate speaking orders, Game phases,
//! Society roles, Logic discussion modes) live alongside their concrete
//! state structs in `wengine-worlds`; this module holds only the
//! enumerations the generic kernel and event log need to know about.

use serde::{Deserialize, Serialize};

/// The four concrete world kinds the kernel can instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldKind {
    /// Structured argumentation among agents.
    Debate,
    /// Turn-based card combat.
    Game,
    /// Tick-driven social simulation.
    Society,
    /// Collaborative formal derivation.
    Logic,
}

/// The lifecycle status of a session, enforced by the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created but not yet started.
    Pending,
    /// The tick driver is actively stepping the engine.
    Running,
    /// The tick driver is parked, waiting for `resume`.
    Paused,
    /// Terminated normally (scheduler decided, or an operator ended it).
    Ended,
    /// Terminated abnormally (e.g. a log append failure).
    Failed,
}

/// The kind of thing an [`crate::structs::Entity`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A participating agent.
    Agent,
    /// An inanimate object (a card, a proposition, an item).
    Object,
    /// A place within the world.
    Location,
    /// A named subdivision (a faction, a zone).
    Zone,
}

/// The operational status of an [`crate::structs::Entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    /// Participating normally.
    Active,
    /// Present but not currently participating (e.g. a paused agent).
    Inactive,
    /// Permanently removed (e.g. a dead Game agent).
    Destroyed,
}

/// The kind of structural change a [`crate::structs::WorldStateChange`]
/// describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// A new entity, relationship, or resource was created.
    Create,
    /// An existing field was updated.
    Update,
    /// An entity, relationship, or resource was removed.
    Delete,
    /// A resource moved from one owner to another.
    Transfer,
}

/// Visibility scoping for a [`crate::structs::WorldEvent`], consulted by
/// [`crate::structs::WorldEvent::is_visible_to`] and by
/// `EventLogStore::get_agent_visible`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventVisibility {
    /// Visible to every subscriber of the session.
    Public,
    /// Visible only to agents named in `meta.scope`.
    Scoped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_kind_roundtrips_through_json() {
        let kind = WorldKind::Society;
        let json = serde_json::to_string(&kind).expect("serialize");
        assert_eq!(json, "\"society\"");
        let restored: WorldKind = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, kind);
    }

    #[test]
    fn session_status_serializes_snake_case() {
        let status = SessionStatus::Running;
        let json = serde_json::to_string(&status).expect("serialize");
        assert_eq!(json, "\"running\"");
    }
}
