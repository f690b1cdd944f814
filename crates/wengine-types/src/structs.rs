//! Base world-state value types shared by every world kind.
//!
//! Per-kind extensions (Debate's `debate` sub-record, Game's `game`
//! sub-record, Society's agent map, Logic's `problem` record) are defined
//! in `wengine-worlds`, one module per kind, each wrapping a [`WorldState`]
//! as a `base` field behind `wengine_kernel::traits::WorldStateExt`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::enums::{EntityStatus, EntityType, EventVisibility, WorldKind};
use crate::ids::{EntityId, EventId, SessionId};

/// A participant or object in the world: an agent, a card, a proposition,
/// a faction zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique id.
    pub id: EntityId,
    /// What kind of thing this is.
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Display name.
    pub name: String,
    /// Free-form, world-kind-specific attributes.
    pub attributes: BTreeMap<String, Json>,
    /// Optional spatial or ordinal position (seat index, board coordinate).
    pub position: Option<Json>,
    /// Participation status.
    pub status: EntityStatus,
}

impl Entity {
    /// Build a new active entity with no attributes set.
    #[must_use]
    pub fn new(id: EntityId, entity_type: EntityType, name: impl Into<String>) -> Self {
        Self {
            id,
            entity_type,
            name: name.into(),
            attributes: BTreeMap::new(),
            position: None,
            status: EntityStatus::Active,
        }
    }
}

/// A directed, weighted tie between two entities (a Society relationship,
/// a Debate alliance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// The entity the relationship is held by.
    pub from_id: EntityId,
    /// The entity the relationship is held toward.
    pub to_id: EntityId,
    /// World-kind-specific relation tag (e.g. `"peer"`, `"faction"`).
    pub relation_type: String,
    /// Strength in `[-1, 1]`.
    pub strength: f64,
}

/// A quantity of some fungible thing owned by an entity or the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// World-kind-specific resource tag (e.g. `"communityPool"`, `"hp"`).
    pub resource_type: String,
    /// The current amount. Never negative (invariant enforced by the
    /// owning `RuleEngine`).
    pub quantity: f64,
    /// The owning entity, or `None` for a world/global-pool resource.
    pub owner: Option<EntityId>,
}

/// The world's notion of elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentTime {
    /// Monotonic tick counter since session start.
    pub tick: u64,
    /// Monotonic round counter (distinct from `tick` for turn-based kinds).
    pub round: u64,
    /// Real-time-to-simulated-time multiplier; `1.0` is real time.
    pub time_scale: f64,
}

impl CurrentTime {
    /// The starting time for a freshly initialized world.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            tick: 0,
            round: 0,
            time_scale: 1.0,
        }
    }
}

/// A named segment of a world's flow, with its own round budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentPhase {
    /// Stable id for this phase within the session.
    pub phase_id: String,
    /// World-kind-specific phase tag (e.g. `"opening"`, `"playing"`).
    pub phase_type: String,
    /// Rounds completed within this phase.
    pub phase_round: u32,
    /// Maximum rounds for this phase; negative means unbounded.
    pub phase_max_rounds: i64,
    /// When this phase started.
    pub started_at: DateTime<Utc>,
    /// Free-form phase configuration (e.g. `allowInterrupt`, `forceSummary`).
    pub phase_rules: Json,
}

/// An immutable, sequenced record of something that happened in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEvent {
    /// Unique id.
    pub event_id: EventId,
    /// World-kind-specific event tag (e.g. `"speech"`, `"damage_dealt"`).
    pub event_type: String,
    /// When the event was appended.
    pub timestamp: DateTime<Utc>,
    /// The agent that caused this event, or `"system"`.
    pub source: String,
    /// Human/narrator-facing content.
    pub content: String,
    /// Free-form metadata, including `visibility`/`scope` for
    /// agent-filtered reads and `is_interrupt`-style flags.
    pub meta: Json,
    /// Per-session strictly monotonic sequence number, assigned at append
    /// time by the owning `EventLogStore`. `0` until appended.
    pub sequence: u64,
}

impl WorldEvent {
    /// Build an event not yet appended to a log (`sequence` is `0` until
    /// `EventLogStore::append` assigns the real value).
    #[must_use]
    pub fn new(event_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            source: source.into(),
            content: String::new(),
            meta: Json::Null,
            sequence: 0,
        }
    }

    /// Attach display content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: Json) -> Self {
        self.meta = meta;
        self
    }

    /// Whether this event is visible to `agent_id`, per `meta.visibility`
    /// (`"public"` or `"scoped"`) and `meta.scope` (an array of agent id
    /// strings). Events with no `visibility` key default to public.
    #[must_use]
    pub fn is_visible_to(&self, agent_id: EntityId) -> bool {
        let Some(object) = self.meta.as_object() else {
            return true;
        };
        let visibility = object
            .get("visibility")
            .and_then(|value| serde_json::from_value::<EventVisibility>(value.clone()).ok())
            .unwrap_or(EventVisibility::Public);
        if visibility == EventVisibility::Public {
            return true;
        }
        object
            .get("scope")
            .and_then(Json::as_array)
            .is_some_and(|scope| {
                scope
                    .iter()
                    .filter_map(Json::as_str)
                    .any(|id| id == agent_id.to_string())
            })
    }
}

/// The authoritative, engine-owned record of world facts shared by every
/// kind, carrying the kind-specific extension inline via [`WorldState::kind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    /// The session this state belongs to.
    pub world_id: SessionId,
    /// Which world kind this is — determines how `kind` is interpreted.
    pub world_type: WorldKind,
    /// Elapsed time.
    pub current_time: CurrentTime,
    /// The active phase.
    pub current_phase: CurrentPhase,
    /// All entities, keyed by id.
    pub entities: BTreeMap<EntityId, Entity>,
    /// All relationships.
    pub relationships: Vec<Relationship>,
    /// All resources, keyed by a world-kind-specific resource id string.
    pub resources: BTreeMap<String, Resource>,
    /// Free-form global variables not covered by the typed fields above.
    pub global_vars: BTreeMap<String, Json>,
    /// Named boolean rule toggles (e.g. `"allow_interrupt"`).
    pub rule_states: BTreeMap<String, bool>,
    /// Whether the world has terminated. Once `true`, every subsequent
    /// `step` is an idempotent no-op.
    pub is_terminated: bool,
    /// Why the world terminated, set at the same time as `is_terminated`.
    pub termination_reason: Option<String>,
}

impl WorldState {
    /// Whether `current_phase` is within its round budget (unbounded when
    /// `phase_max_rounds` is negative).
    #[must_use]
    pub fn phase_within_budget(&self) -> bool {
        self.current_phase.phase_max_rounds < 0
            || i64::from(self.current_phase.phase_round) <= self.current_phase.phase_max_rounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_state() -> WorldState {
        WorldState {
            world_id: SessionId::new(),
            world_type: WorldKind::Society,
            current_time: CurrentTime::zero(),
            current_phase: CurrentPhase {
                phase_id: String::from("simulation"),
                phase_type: String::from("simulation"),
                phase_round: 0,
                phase_max_rounds: -1,
                started_at: Utc::now(),
                phase_rules: Json::Null,
            },
            entities: BTreeMap::new(),
            relationships: Vec::new(),
            resources: BTreeMap::new(),
            global_vars: BTreeMap::new(),
            rule_states: BTreeMap::new(),
            is_terminated: false,
            termination_reason: None,
        }
    }

    #[test]
    fn unbounded_phase_is_always_within_budget() {
        let state = base_state();
        assert!(state.phase_within_budget());
    }

    #[test]
    fn bounded_phase_checks_round_against_max() {
        let mut state = base_state();
        state.current_phase.phase_max_rounds = 3;
        state.current_phase.phase_round = 3;
        assert!(state.phase_within_budget());
        state.current_phase.phase_round = 4;
        assert!(!state.phase_within_budget());
    }

    #[test]
    fn public_event_is_visible_to_everyone() {
        let event = WorldEvent::new("speech", "system");
        assert!(event.is_visible_to(EntityId::new()));
    }

    #[test]
    fn scoped_event_is_only_visible_to_named_agents() {
        let agent = EntityId::new();
        let event = WorldEvent::new("whisper", "system").with_meta(serde_json::json!({
            "visibility": "scoped",
            "scope": [agent.to_string()],
        }));
        assert!(event.is_visible_to(agent));
        assert!(!event.is_visible_to(EntityId::new()));
    }
}
