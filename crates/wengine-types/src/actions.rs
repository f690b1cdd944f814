//! Action and result types passed between agents and a [`WorldEngine`] step.
//!
//! [`WorldEngine`]: ../wengine_kernel/engine/struct.Engine.html

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::enums::{ChangeType, EntityType};
use crate::ids::{ActionId, EntityId};

/// A named pointer at another entity, carried on an [`Action`] when the
/// action targets something (a Game attack target, a Debate recipient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// The kind of thing being targeted.
    #[serde(rename = "type")]
    pub target_type: EntityType,
    /// The targeted entity's id.
    pub id: EntityId,
    /// Optional display name, for narration and logging.
    pub name: Option<String>,
}

/// A proposed agent move submitted to one `step`.
///
/// `action_type` and `params` are deliberately untyped (a tag string plus a
/// free-form JSON object) rather than a closed enum: the kernel's step loop
/// never needs to know what an action *means*, only how to route it to the
/// owning world kind's [`RuleEngine`](crate::structs::WorldEvent). Each
/// world kind's rule engine is responsible for interpreting its own
/// `action_type` vocabulary and `params` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Unique id for this proposed action.
    pub action_id: ActionId,
    /// The agent proposing the action.
    pub agent_id: EntityId,
    /// World-kind-specific action tag (e.g. `"speak"`, `"play_card"`, `"work"`).
    pub action_type: String,
    /// Free-form parameters, interpreted by the owning rule engine.
    pub params: Json,
    /// Self-reported confidence in `[0, 1]`.
    pub confidence: f64,
    /// When the action was proposed.
    pub timestamp: DateTime<Utc>,
    /// Optional target entity.
    pub target: Option<Target>,
    /// Optional priority in `[1, 10]`, used by arbiters to break ties.
    pub priority: Option<u8>,
}

impl Action {
    /// Clamp-read the priority, defaulting to the lowest priority (`1`)
    /// when unset.
    #[must_use]
    pub fn priority_or_default(&self) -> u8 {
        self.priority.unwrap_or(1).clamp(1, 10)
    }
}

/// A structured diff describing a change already applied to world state.
///
/// Purely descriptive — by the time a [`WorldStateChange`] is emitted, the
/// state mutation it documents has already happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldStateChange {
    /// The kind of change.
    pub change_type: ChangeType,
    /// The kind of entity affected.
    pub entity_type: EntityType,
    /// The affected entity's id.
    pub entity_id: EntityId,
    /// Dotted path to the field that changed, if this is a field update.
    pub field_path: Option<String>,
    /// The value before the change.
    pub old_value: Option<Json>,
    /// The value after the change.
    pub new_value: Option<Json>,
}

/// Why an action failed validation or application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    /// Short machine-checkable code (e.g. `"not_your_turn"`).
    pub code: String,
    /// Human-readable explanation, safe to surface to a client.
    pub message: String,
}

impl FailureReason {
    /// Build a failure reason from a code and message.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// The outcome of resolving one [`Action`] against a world state, returned
/// from `step` — never persisted separately from the events it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    /// The action this result corresponds to.
    pub action: Action,
    /// Whether the action executed successfully.
    pub success: bool,
    /// Present when `success` is `false`.
    pub failure_reason: Option<FailureReason>,
    /// State changes applied by this action (empty on failure).
    pub effects: Vec<WorldStateChange>,
    /// Events emitted while applying this action (empty on failure, except
    /// for the `*_rejected` event the kernel appends itself).
    pub events: Vec<crate::structs::WorldEvent>,
}

impl ActionResult {
    /// Build a successful result.
    #[must_use]
    pub fn success(
        action: Action,
        effects: Vec<WorldStateChange>,
        events: Vec<crate::structs::WorldEvent>,
    ) -> Self {
        Self {
            action,
            success: true,
            failure_reason: None,
            effects,
            events,
        }
    }

    /// Build a failing result. `events` normally carries the single
    /// `*_rejected` event the kernel appends for this action.
    #[must_use]
    pub fn failure(
        action: Action,
        reason: FailureReason,
        events: Vec<crate::structs::WorldEvent>,
    ) -> Self {
        Self {
            action,
            success: false,
            failure_reason: Some(reason),
            effects: Vec::new(),
            events,
        }
    }
}
