//! The four pluggable contracts every world kind implements:
//! [`RuleEngine`], [`Arbiter`], [`Scheduler`], and the optional
//! [`Narrator`].
//!
//! Each concrete world kind's state struct embeds [`wengine_types::WorldState`]
//! as its `base` field and implements [`WorldStateExt`] so the generic step
//! loop in [`crate::engine`] can read/write the shared fields (time, phase,
//! termination) without knowing the kind-specific extension.

use async_trait::async_trait;
use wengine_types::{Action, ActionResult, WorldEvent, WorldState};

/// Grants the generic engine access to the base [`WorldState`] embedded in
/// a kind-specific state struct.
pub trait WorldStateExt {
    /// Borrow the shared base state.
    fn base(&self) -> &WorldState;
    /// Mutably borrow the shared base state.
    fn base_mut(&mut self) -> &mut WorldState;
}

/// The result of [`RuleEngine::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Whether the action may be applied.
    pub is_valid: bool,
    /// Hard failures, present when `is_valid` is `false`.
    pub errors: Vec<String>,
    /// Non-fatal observations (e.g. the `maxSpeakRatio` warning).
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    /// A passing outcome with no warnings.
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// A failing outcome carrying one error message.
    #[must_use]
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            errors: vec![error.into()],
            warnings: Vec::new(),
        }
    }

    /// Attach a warning to an otherwise-passing outcome.
    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Validates and applies actions; enforces world-kind invariants once per
/// step.
pub trait RuleEngine {
    /// The kind-specific world state this rule engine operates on.
    type State: WorldStateExt;

    /// Check whether `action` may be applied to `state` right now.
    fn validate(&self, action: &Action, state: &Self::State) -> ValidationOutcome;

    /// Apply `action` to `state`, mutating it and returning the result.
    /// Only called after `validate` returned `is_valid: true`.
    fn apply(&mut self, action: &Action, state: &mut Self::State) -> ActionResult;

    /// Enforce global constraints once per step, after every resolved
    /// action has been applied (shocks, win conditions, exits, ...).
    fn enforce_constraints(&mut self, state: &mut Self::State) -> Vec<WorldEvent>;

    /// Build the kind-specific rejection event (`speech_rejected`,
    /// `REJECTED`, `ACTION_REJECTED`) for an action that failed
    /// [`RuleEngine::validate`].
    fn rejection_event(&self, action: &Action, errors: &[String]) -> WorldEvent;
}

/// Chooses which proposed actions may execute this step and in what order.
/// Chosen actions are applied in the order returned.
pub trait Arbiter {
    /// The kind-specific world state this arbiter reads.
    type State: WorldStateExt;

    /// Return the subset of `actions` permitted to execute this step, in
    /// the order they will be applied.
    fn resolve_conflicts(&self, actions: Vec<Action>, state: &Self::State) -> Vec<Action>;

    /// Called once when `resolve_conflicts` returned an empty set.
    /// Debate's cold-start intervention lives here; every other kind uses
    /// the default no-op.
    fn handle_idle(&mut self, _state: &mut Self::State) -> Vec<WorldEvent> {
        Vec::new()
    }

    /// The `action_rejected` event for an action the arbiter excluded from
    /// `resolved`, if this kind surfaces one. Game does; Debate/Logic/Society
    /// drop excluded actions silently via the default.
    fn rejected_event(&self, _action: &Action) -> Option<WorldEvent> {
        None
    }
}

/// A concrete phase to switch `current_phase` to, returned by
/// [`Scheduler::next_phase`].
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseConfig {
    /// The new phase's stable id.
    pub phase_id: String,
    /// The new phase's kind-specific type tag.
    pub phase_type: String,
    /// Round budget for the new phase; negative means unbounded.
    pub max_rounds: i64,
    /// Free-form phase configuration copied into `current_phase.phase_rules`.
    pub phase_rules: serde_json::Value,
}

/// Tracks world time and decides phase advancement and termination.
pub trait Scheduler {
    /// The kind-specific world state this scheduler reads and advances.
    type State: WorldStateExt;

    /// An event to emit at the very start of a step (`TICK_START`,
    /// `TURN_START`), if this kind has one.
    fn step_start_event(&self, _state: &Self::State) -> Option<WorldEvent> {
        None
    }

    /// Whether the current phase/turn/tick should advance.
    fn should_advance_phase(&self, state: &Self::State) -> bool;

    /// The phase to switch to, if `should_advance_phase` returned `true`
    /// and this kind switches to a named next phase (Debate). Kinds with
    /// a single implicit phase return `None` and instead do their
    /// advancement work in [`Scheduler::advance`].
    fn next_phase(&self, current_phase_id: &str) -> Option<PhaseConfig>;

    /// Perform the phase/turn/tick advancement for this step (bullet 5 of
    /// the step algorithm) and return any events it produced
    /// (`phase_switch`, `turn_end`/`turn_start`, `TICK_END`/`STATE_DELTA`).
    fn advance(&mut self, state: &mut Self::State) -> Vec<WorldEvent>;

    /// Whether the world should terminate now.
    fn should_terminate(&self, state: &Self::State) -> bool;

    /// The termination reason to record when `should_terminate` is `true`.
    fn termination_reason(&self, state: &Self::State) -> String;

    /// The kind-specific termination event to emit (`debate_end`,
    /// `game_end`, `SOCIETY_END`, `PROBLEM_END`).
    fn termination_event(&self, state: &Self::State) -> WorldEvent;

    /// Adjust the real-time-to-simulated-time multiplier.
    fn set_time_scale(&mut self, state: &mut Self::State, scale: f64) {
        state.base_mut().current_time.time_scale = scale;
    }
}

/// A request for narrated content: already-filtered state summaries, never
/// raw mutable state.
#[derive(Debug, Clone, PartialEq)]
pub struct NarratorRequest {
    /// The session's topic or scenario title.
    pub topic: String,
    /// The current phase tag.
    pub phase: String,
    /// Condensed recent event descriptions.
    pub condensed_events: Vec<String>,
    /// Names of the agents involved.
    pub participants: Vec<String>,
}

/// Why a [`Narrator`] call failed. Never fatal to the step — the engine
/// proceeds without narrator content.
#[derive(Debug, Clone, thiserror::Error)]
#[error("narrator failed: {message}")]
pub struct NarratorError {
    /// Human-readable failure description.
    pub message: String,
}

/// An optional LLM-backed content generator. Never mutates state, and
/// every engine must operate deterministically when no narrator is
/// attached.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Produce narrated content (prose for Debate/Society, LaTeX for
    /// Logic) for the given request.
    async fn summarize(&self, request: NarratorRequest) -> Result<String, NarratorError>;
}

/// A narrator that always fails, used in tests and as a documented
/// reference for "no narrator attached" behavior being indistinguishable
/// from "narrator failed" from the step loop's point of view.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNarrator;

#[async_trait]
impl Narrator for NullNarrator {
    async fn summarize(&self, _request: NarratorRequest) -> Result<String, NarratorError> {
        Err(NarratorError {
            message: String::from("no narrator attached"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_outcome_has_no_errors() {
        let outcome = ValidationOutcome::valid();
        assert!(outcome.is_valid);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn invalid_outcome_carries_message() {
        let outcome = ValidationOutcome::invalid("not your turn");
        assert!(!outcome.is_valid);
        assert_eq!(outcome.errors, vec![String::from("not your turn")]);
    }

    #[tokio::test]
    async fn null_narrator_always_fails() {
        let narrator = NullNarrator;
        let result = narrator
            .summarize(NarratorRequest {
                topic: String::from("t"),
                phase: String::from("p"),
                condensed_events: Vec::new(),
                participants: Vec::new(),
            })
            .await;
        assert!(result.is_err());
    }
}
