//! The Debate world kind: structured argumentation among agents.
//!
//! A fixed `flow` of phases (opening, rebuttal, closing, ...) each carry
//! their own round budget and speaking-order policy. `speak`/`respond`/
//! `question`/`interrupt`/`vote`/`pass` are validated against whose turn
//! it is; a cold debate (too many consecutive `pass`es) triggers a
//! moderator intervention instead of silently stalling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;
use wengine_kernel::traits::{Arbiter, PhaseConfig, RuleEngine, Scheduler, ValidationOutcome};
use wengine_kernel::WorldStateExt;
use wengine_types::{Action, ActionResult, EntityId, WorldEvent, WorldState};

use crate::config::DebateTunables;
use crate::error::RuleError;

/// One named segment of a debate's flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebatePhaseConfig {
    /// Stable id (`"opening"`, `"rebuttal"`, `"closing"`).
    pub phase_id: String,
    /// Kind-specific phase tag, usually equal to `phase_id`.
    pub phase_type: String,
    /// Round budget for this phase; negative means unbounded.
    pub max_rounds: i64,
    /// Whether `interrupt` actions are permitted during this phase.
    pub allow_interrupt: bool,
    /// Whether leaving this phase should request a narrator summary.
    pub force_summary: bool,
}

/// How speaking turns are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeakingOrder {
    /// Any agent may speak at any time.
    Free,
    /// Agents speak in a fixed rotation.
    RoundRobin,
    /// Only the agent the moderator names as `active_speaker` may speak.
    Moderated,
}

/// The debate-specific sub-record embedded in [`DebateState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateSubRecord {
    /// How speaking turns are assigned.
    pub speaking_order: SpeakingOrder,
    /// The agent currently permitted to speak, under `Moderated`/`RoundRobin`.
    pub active_speaker: Option<EntityId>,
    /// The agent who spoke most recently, under any order.
    pub last_speaker_id: Option<EntityId>,
    /// Consecutive speeches by `last_speaker_id`.
    pub consecutive_speaks: u32,
    /// Consecutive rounds with no non-`pass` action.
    pub idle_rounds: u32,
    /// Whether the current phase permits `interrupt`.
    pub allow_interrupt: bool,
    /// How many times the moderator has already intervened; raises the
    /// effective cold threshold each time.
    pub intervention_level: u32,
    /// Idle rounds tolerated before the moderator intervenes.
    pub cold_threshold: u32,
    /// Speeches given per agent, for the `maxSpeakRatio` warning.
    pub speak_counts: BTreeMap<EntityId, u32>,
    /// Index into `agent_ids` for `RoundRobin` order.
    pub round_robin_index: usize,
    /// The fixed roster of participating agents.
    pub agent_ids: Vec<EntityId>,
}

/// The Debate world kind's full state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateState {
    /// Shared base state.
    pub base: WorldState,
    /// The motion or question under debate.
    pub topic: String,
    /// Debate-specific tracking.
    pub debate: DebateSubRecord,
    /// Total rounds across every phase before a forced timeout.
    pub max_total_rounds: u64,
}

impl WorldStateExt for DebateState {
    fn base(&self) -> &WorldState {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WorldState {
        &mut self.base
    }
}

impl DebateState {
    /// Build a fresh debate from a topic, roster, and the flow's first
    /// phase. The full `flow` itself is owned by [`DebateScheduler`],
    /// which is the only place the `nextPhase` lookup needs it.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::NotEnoughAgents`] if fewer than two agents are
    /// given.
    pub fn new(
        mut base: WorldState,
        topic: String,
        agent_ids: Vec<EntityId>,
        speaking_order: SpeakingOrder,
        tunables: DebateTunables,
        first_phase: &DebatePhaseConfig,
        max_total_rounds: u64,
    ) -> Result<Self, RuleError> {
        if agent_ids.len() < 2 {
            return Err(RuleError::NotEnoughAgents {
                minimum: 2,
                actual: agent_ids.len(),
            });
        }
        base.current_phase.phase_id.clone_from(&first_phase.phase_id);
        base.current_phase.phase_type.clone_from(&first_phase.phase_type);
        base.current_phase.phase_max_rounds = first_phase.max_rounds;

        let active_speaker = match speaking_order {
            SpeakingOrder::Free => None,
            SpeakingOrder::RoundRobin | SpeakingOrder::Moderated => agent_ids.first().copied(),
        };
        Ok(Self {
            base,
            topic,
            debate: DebateSubRecord {
                speaking_order,
                active_speaker,
                last_speaker_id: None,
                consecutive_speaks: 0,
                idle_rounds: 0,
                allow_interrupt: first_phase.allow_interrupt,
                intervention_level: 0,
                cold_threshold: tunables.cold_threshold,
                speak_counts: BTreeMap::new(),
                round_robin_index: 0,
                agent_ids,
            },
            max_total_rounds,
        })
    }

    fn is_speech_action(action_type: &str) -> bool {
        matches!(action_type, "speak" | "respond" | "question" | "interrupt")
    }
}

/// Validates and applies `speak`/`respond`/`question`/`interrupt`/`vote`/
/// `pass`, in that priority order: interrupt permission, turn order, then
/// phase-appropriateness.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebateRules {
    tunables: DebateTunables,
}

impl DebateRules {
    /// Build a rule engine with the given tunables.
    #[must_use]
    pub const fn new(tunables: DebateTunables) -> Self {
        Self { tunables }
    }
}

impl RuleEngine for DebateRules {
    type State = DebateState;

    fn validate(&self, action: &Action, state: &Self::State) -> ValidationOutcome {
        if !state.debate.agent_ids.contains(&action.agent_id) {
            return ValidationOutcome::invalid("agent is not a registered debate participant");
        }
        if matches!(action.action_type.as_str(), "speak" | "respond")
            && state.debate.last_speaker_id == Some(action.agent_id)
            && state.debate.consecutive_speaks >= 2
        {
            return ValidationOutcome::invalid("agent has already spoken twice in a row");
        }
        if action.action_type == "interrupt" && !state.debate.allow_interrupt {
            return ValidationOutcome::invalid("interrupts are not permitted in this phase");
        }
        if DebateState::is_speech_action(&action.action_type) {
            let turn_ok = match state.debate.speaking_order {
                SpeakingOrder::Free => true,
                SpeakingOrder::RoundRobin | SpeakingOrder::Moderated => {
                    action.action_type == "interrupt"
                        || state.debate.active_speaker == Some(action.agent_id)
                }
            };
            if !turn_ok {
                return ValidationOutcome::invalid("not the active speaker");
            }
        }
        if action.action_type == "vote" && state.base.current_phase.phase_type != "voting" {
            return ValidationOutcome::invalid("voting is not open in this phase");
        }
        if !matches!(
            action.action_type.as_str(),
            "speak" | "respond" | "question" | "interrupt" | "vote" | "pass"
        ) {
            return ValidationOutcome::invalid(format!(
                "unknown action type: {}",
                action.action_type
            ));
        }
        ValidationOutcome::valid()
    }

    fn apply(&mut self, action: &Action, state: &mut Self::State) -> ActionResult {
        let mut events = Vec::new();
        match action.action_type.as_str() {
            "speak" | "respond" | "question" | "interrupt" => {
                if state.debate.last_speaker_id == Some(action.agent_id) {
                    state.debate.consecutive_speaks = state.debate.consecutive_speaks.saturating_add(1);
                } else {
                    state.debate.consecutive_speaks = 1;
                }
                state.debate.last_speaker_id = Some(action.agent_id);
                state.debate.idle_rounds = 0;
                *state.debate.speak_counts.entry(action.agent_id).or_insert(0) += 1;
                if action.action_type == "interrupt" {
                    state.debate.active_speaker = Some(action.agent_id);
                } else if state.debate.speaking_order == SpeakingOrder::RoundRobin
                    && !state.debate.agent_ids.is_empty()
                {
                    state.debate.round_robin_index =
                        (state.debate.round_robin_index + 1) % state.debate.agent_ids.len();
                    state.debate.active_speaker =
                        Some(state.debate.agent_ids[state.debate.round_robin_index]);
                }
                let content = action
                    .params
                    .get("content")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                events.push(
                    WorldEvent::new("speech", action.agent_id.to_string())
                        .with_content(content)
                        .with_meta(serde_json::json!({
                            "mode": action.action_type,
                            "is_interrupt": action.action_type == "interrupt",
                        })),
                );
            }
            "vote" => {
                events.push(
                    WorldEvent::new("vote", action.agent_id.to_string())
                        .with_meta(action.params.clone()),
                );
            }
            _ => {}
        }
        ActionResult::success(action.clone(), Vec::new(), events)
    }

    fn enforce_constraints(&mut self, state: &mut Self::State) -> Vec<WorldEvent> {
        let total_speeches: u32 = state.debate.speak_counts.values().sum();
        if total_speeches == 0 {
            return Vec::new();
        }
        let mut events = Vec::new();
        for (agent_id, count) in &state.debate.speak_counts {
            #[allow(clippy::cast_precision_loss)]
            let ratio = f64::from(*count) / f64::from(total_speeches);
            if ratio > self.tunables.max_speak_ratio {
                warn!(agent_id = %agent_id, ratio, "agent exceeds max speak ratio");
                events.push(
                    WorldEvent::new("SPEAK_RATIO_WARNING", "system").with_meta(serde_json::json!({
                        "agent": agent_id.to_string(),
                        "ratio": ratio,
                    })),
                );
            }
        }
        events
    }

    fn rejection_event(&self, _action: &Action, errors: &[String]) -> WorldEvent {
        WorldEvent::new("speech_rejected", "system").with_content(errors.join("; "))
    }
}

/// Selects which proposed speech drives the round: drops `pass` entirely,
/// orders candidates interrupt-first then by priority then confidence, and
/// picks the single speaker `speaking_order` permits. Non-speech actions
/// (`vote`) pass through untouched. Drives the cold-start intervention via
/// [`Arbiter::handle_idle`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DebateArbiter;

impl Arbiter for DebateArbiter {
    type State = DebateState;

    fn resolve_conflicts(&self, actions: Vec<Action>, state: &Self::State) -> Vec<Action> {
        let (mut speech, other): (Vec<Action>, Vec<Action>) = actions
            .into_iter()
            .filter(|action| action.action_type != "pass")
            .partition(|action| DebateState::is_speech_action(&action.action_type));

        speech.retain(|action| {
            !(state.debate.last_speaker_id == Some(action.agent_id)
                && state.debate.consecutive_speaks >= 2)
        });

        speech.sort_by(|a, b| {
            let interrupt_a = a.action_type == "interrupt";
            let interrupt_b = b.action_type == "interrupt";
            interrupt_b
                .cmp(&interrupt_a)
                .then_with(|| b.priority_or_default().cmp(&a.priority_or_default()))
                .then_with(|| b.confidence.total_cmp(&a.confidence))
        });

        let selected = match state.debate.speaking_order {
            SpeakingOrder::Free => speech.into_iter().next(),
            SpeakingOrder::RoundRobin => {
                let turn_agent = if state.debate.agent_ids.is_empty() {
                    None
                } else {
                    state
                        .debate
                        .agent_ids
                        .get(state.debate.round_robin_index % state.debate.agent_ids.len())
                        .copied()
                };
                speech.into_iter().find(|action| {
                    Some(action.agent_id) == turn_agent
                        || (action.action_type == "interrupt"
                            && action.priority_or_default() >= 4
                            && state.debate.allow_interrupt)
                })
            }
            SpeakingOrder::Moderated => {
                let lowest = speech
                    .iter()
                    .min_by_key(|action| {
                        state
                            .debate
                            .speak_counts
                            .get(&action.agent_id)
                            .copied()
                            .unwrap_or(0)
                    })
                    .map(|action| action.agent_id);
                speech
                    .into_iter()
                    .find(|action| Some(action.agent_id) == lowest)
            }
        };

        let mut result: Vec<Action> = selected.into_iter().collect();
        result.extend(other);
        result
    }

    fn handle_idle(&mut self, state: &mut Self::State) -> Vec<WorldEvent> {
        state.debate.idle_rounds = state.debate.idle_rounds.saturating_add(1);
        let effective_threshold = state
            .debate
            .cold_threshold
            .saturating_add(state.debate.intervention_level);
        if state.debate.idle_rounds < effective_threshold {
            return Vec::new();
        }
        state.debate.idle_rounds = 0;
        state.debate.intervention_level = state.debate.intervention_level.saturating_add(1);

        let target = state
            .debate
            .speak_counts
            .iter()
            .min_by_key(|(_, count)| **count)
            .map(|(agent_id, _)| *agent_id)
            .or_else(|| state.debate.agent_ids.first().copied());
        let content = format!("debate stalled for {effective_threshold} rounds");
        let event = if state.debate.intervention_level >= 3 {
            WorldEvent::new("moderator_question", "system").with_content(content)
        } else {
            WorldEvent::new("moderator_call", "system").with_content(content)
        };
        vec![event.with_meta(serde_json::json!({
            "target": target.map(|id| id.to_string()),
        }))]
    }
}

/// Advances the round counter each step; switches to the next phase in
/// `flow` (via [`Scheduler::next_phase`]) once the current phase's round
/// budget is exhausted; ends the debate once `flow` is exhausted or
/// `max_total_rounds` is reached.
#[derive(Debug, Clone)]
pub struct DebateScheduler {
    flow: Vec<DebatePhaseConfig>,
}

impl DebateScheduler {
    /// Build a scheduler owning the debate's fixed phase sequence.
    #[must_use]
    pub const fn new(flow: Vec<DebatePhaseConfig>) -> Self {
        Self { flow }
    }

    /// The first phase in `flow`, used to seed [`DebateState::new`].
    #[must_use]
    pub fn first_phase(&self) -> Option<&DebatePhaseConfig> {
        self.flow.first()
    }

    fn is_last_phase(&self, phase_id: &str) -> bool {
        self.flow
            .last()
            .is_some_and(|last| last.phase_id == phase_id)
    }
}

impl Scheduler for DebateScheduler {
    type State = DebateState;

    fn should_advance_phase(&self, _state: &Self::State) -> bool {
        true
    }

    fn next_phase(&self, current_phase_id: &str) -> Option<PhaseConfig> {
        let index = self
            .flow
            .iter()
            .position(|phase| phase.phase_id == current_phase_id)?;
        let next = self.flow.get(index.saturating_add(1))?;
        Some(PhaseConfig {
            phase_id: next.phase_id.clone(),
            phase_type: next.phase_type.clone(),
            max_rounds: next.max_rounds,
            phase_rules: serde_json::json!({
                "allow_interrupt": next.allow_interrupt,
                "force_summary": next.force_summary,
            }),
        })
    }

    fn advance(&mut self, state: &mut Self::State) -> Vec<WorldEvent> {
        state.base.current_phase.phase_round = state.base.current_phase.phase_round.saturating_add(1);
        state.base.current_time.round = state.base.current_time.round.saturating_add(1);

        if state.base.phase_within_budget() {
            return Vec::new();
        }

        let Some(next) = self.next_phase(&state.base.current_phase.phase_id) else {
            return Vec::new();
        };
        let force_summary = next
            .phase_rules
            .get("force_summary")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        let allow_interrupt = next
            .phase_rules
            .get("allow_interrupt")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        state.base.current_phase.phase_id.clone_from(&next.phase_id);
        state.base.current_phase.phase_type.clone_from(&next.phase_type);
        state.base.current_phase.phase_round = 0;
        state.base.current_phase.phase_max_rounds = next.max_rounds;
        state.base.current_phase.started_at = chrono::Utc::now();
        state.base.current_phase.phase_rules = next.phase_rules.clone();
        state.debate.allow_interrupt = allow_interrupt;

        vec![WorldEvent::new("phase_switch", "system").with_meta(serde_json::json!({
            "phase": next.phase_id,
            "force_summary": force_summary,
        }))]
    }

    fn should_terminate(&self, state: &Self::State) -> bool {
        if state.base.current_time.round >= state.max_total_rounds {
            return true;
        }
        self.is_last_phase(&state.base.current_phase.phase_id) && !state.base.phase_within_budget()
    }

    fn termination_reason(&self, state: &Self::State) -> String {
        if state.base.current_time.round >= state.max_total_rounds {
            String::from("global round timeout reached")
        } else {
            String::from("flow exhausted")
        }
    }

    fn termination_event(&self, _state: &Self::State) -> WorldEvent {
        WorldEvent::new("debate_end", "system")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use wengine_types::{ActionId, CurrentPhase, CurrentTime, SessionId, WorldKind};

    use super::*;

    fn base_state() -> WorldState {
        WorldState {
            world_id: SessionId::new(),
            world_type: WorldKind::Debate,
            current_time: CurrentTime::zero(),
            current_phase: CurrentPhase {
                phase_id: String::from("opening"),
                phase_type: String::from("opening"),
                phase_round: 0,
                phase_max_rounds: 2,
                started_at: Utc::now(),
                phase_rules: serde_json::Value::Null,
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

    fn flow() -> Vec<DebatePhaseConfig> {
        vec![
            DebatePhaseConfig {
                phase_id: String::from("opening"),
                phase_type: String::from("opening"),
                max_rounds: 2,
                allow_interrupt: false,
                force_summary: false,
            },
            DebatePhaseConfig {
                phase_id: String::from("closing"),
                phase_type: String::from("closing"),
                max_rounds: 1,
                allow_interrupt: true,
                force_summary: true,
            },
        ]
    }

    fn two_agent_debate() -> (EntityId, EntityId, DebateState, DebateScheduler) {
        let a = EntityId::new();
        let b = EntityId::new();
        let scheduler = DebateScheduler::new(flow());
        let state = DebateState::new(
            base_state(),
            String::from("Should we colonize Mars?"),
            vec![a, b],
            SpeakingOrder::RoundRobin,
            DebateTunables::default(),
            scheduler.first_phase().expect("first phase"),
            50,
        )
        .expect("two agents");
        (a, b, state, scheduler)
    }

    fn speak_action(agent: EntityId) -> Action {
        Action {
            action_id: ActionId::new(),
            agent_id: agent,
            action_type: String::from("speak"),
            params: serde_json::json!({ "content": "hello" }),
            confidence: 1.0,
            timestamp: Utc::now(),
            target: None,
            priority: None,
        }
    }

    #[test]
    fn non_active_speaker_is_rejected_under_round_robin() {
        let (_a, b, state, _scheduler) = two_agent_debate();
        let rules = DebateRules::default();
        let outcome = rules.validate(&speak_action(b), &state);
        assert!(!outcome.is_valid);
    }

    #[test]
    fn active_speaker_may_speak_and_rotation_advances() {
        let (a, _b, mut state, _scheduler) = two_agent_debate();
        let mut rules = DebateRules::default();
        let action = speak_action(a);
        assert!(rules.validate(&action, &state).is_valid);
        rules.apply(&action, &mut state);
        assert_eq!(state.debate.last_speaker_id, Some(a));
        assert_ne!(state.debate.active_speaker, Some(a));
    }

    #[test]
    fn idle_rounds_trigger_moderator_intervention() {
        let (_a, _b, mut state, _scheduler) = two_agent_debate();
        let mut arbiter = DebateArbiter;
        for _ in 0..(state.debate.cold_threshold - 1) {
            let events = arbiter.handle_idle(&mut state);
            assert!(events.is_empty());
        }
        let events = arbiter.handle_idle(&mut state);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "moderator_call");
    }

    #[test]
    fn phase_advances_once_round_budget_is_exhausted() {
        let (_a, _b, mut state, mut scheduler) = two_agent_debate();
        scheduler.advance(&mut state);
        assert_eq!(state.base.current_phase.phase_id, "opening");
        scheduler.advance(&mut state);
        assert_eq!(state.base.current_phase.phase_id, "closing");
        assert!(state.debate.allow_interrupt);
    }

    #[test]
    fn debate_terminates_once_flow_is_exhausted() {
        let (_a, _b, mut state, mut scheduler) = two_agent_debate();
        scheduler.advance(&mut state);
        scheduler.advance(&mut state);
        scheduler.advance(&mut state);
        assert!(scheduler.should_terminate(&state));
    }

    fn priority_action(agent: EntityId, priority: u8) -> Action {
        let mut action = speak_action(agent);
        action.priority = Some(priority);
        action
    }

    #[test]
    fn round_robin_arbiter_drops_out_of_turn_speaker() {
        let (a, b, state, _scheduler) = two_agent_debate();
        let arbiter = DebateArbiter;
        let resolved = arbiter.resolve_conflicts(
            vec![priority_action(a, 3), priority_action(b, 5)],
            &state,
        );
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].agent_id, a);
    }

    #[test]
    fn arbiter_drops_pass_actions() {
        let (a, _b, state, _scheduler) = two_agent_debate();
        let arbiter = DebateArbiter;
        let mut pass = speak_action(a);
        pass.action_type = String::from("pass");
        let resolved = arbiter.resolve_conflicts(vec![pass], &state);
        assert!(resolved.is_empty());
    }

    #[test]
    fn arbiter_lets_a_qualifying_interrupt_through_out_of_turn() {
        let (_a, b, mut state, _scheduler) = two_agent_debate();
        state.debate.allow_interrupt = true;
        let arbiter = DebateArbiter;
        let mut interrupt = priority_action(b, 4);
        interrupt.action_type = String::from("interrupt");
        let resolved = arbiter.resolve_conflicts(vec![interrupt], &state);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].agent_id, b);
    }

    #[test]
    fn arbiter_drops_low_priority_interrupt_out_of_turn() {
        let (_a, b, mut state, _scheduler) = two_agent_debate();
        state.debate.allow_interrupt = true;
        let arbiter = DebateArbiter;
        let mut interrupt = priority_action(b, 3);
        interrupt.action_type = String::from("interrupt");
        let resolved = arbiter.resolve_conflicts(vec![interrupt], &state);
        assert!(resolved.is_empty());
    }

    #[test]
    fn arbiter_passes_votes_through_unfiltered() {
        let (a, b, state, _scheduler) = two_agent_debate();
        let arbiter = DebateArbiter;
        let mut vote_a = speak_action(a);
        vote_a.action_type = String::from("vote");
        let mut vote_b = speak_action(b);
        vote_b.action_type = String::from("vote");
        let resolved = arbiter.resolve_conflicts(vec![vote_a, vote_b], &state);
        assert_eq!(resolved.len(), 2);
    }
}
