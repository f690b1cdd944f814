//! The Logic world kind: collaborative formal derivation.
//!
//! Researchers propose steps (`derive`), challenge them (`refute`), widen
//! the problem (`extend`), or ratify a step against an open goal
//! (`accept`). The problem is solved once every goal has an accepted
//! conclusion matching its statement.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wengine_kernel::traits::{Arbiter, PhaseConfig, RuleEngine, Scheduler, ValidationOutcome};
use wengine_kernel::WorldStateExt;
use wengine_types::{
    Action, ActionResult, EntityId, GoalId, ProposalId, RefutationId, WorldEvent, WorldState,
};

use crate::config::LogicTunables;
use crate::error::RuleError;

/// A step proposed via `derive`, awaiting `accept` or `refute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingProposal {
    /// Unique id.
    pub proposal_id: ProposalId,
    /// The researcher who proposed it.
    pub proposed_by: EntityId,
    /// The LaTeX statement of the proposed step.
    pub statement: String,
    /// Ids of hypotheses/conclusions this step depends on.
    pub depends_on: Vec<String>,
}

/// An open goal the problem must derive a matching conclusion for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Unique id.
    pub goal_id: GoalId,
    /// The LaTeX statement that must be proved, compared by trimmed
    /// string equality against an accepted conclusion.
    pub statement: String,
    /// Whether a conclusion has already been accepted matching this goal.
    pub is_proved: bool,
}

/// A record of a `refute` call against a now-withdrawn proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refutation {
    /// Unique id.
    pub refutation_id: RefutationId,
    /// The proposal withdrawn.
    pub proposal_id: ProposalId,
    /// Who raised the refutation.
    pub raised_by: EntityId,
    /// The stated counterexample or objection.
    pub reason: String,
}

/// The problem-level record shared by every researcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemRecord {
    /// Unique id for this problem instance.
    pub problem_id: String,
    /// The top-level statement under derivation.
    pub statement: String,
    /// Accepted hypotheses (axioms/premises), as LaTeX strings.
    pub hypotheses: Vec<String>,
    /// Accepted conclusions, as LaTeX strings.
    pub conclusions: Vec<String>,
    /// Steps proposed but not yet accepted or refuted.
    pub pending_proposals: Vec<PendingProposal>,
    /// Goals this problem must close.
    pub goals: Vec<Goal>,
    /// History of refutations.
    pub refutations: Vec<Refutation>,
    /// Whether every goal has been proved.
    pub is_solved: bool,
}

/// Discussion-flow tracking, separate from the problem content itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscussionState {
    /// Rounds completed so far.
    pub current_round: u32,
    /// Round budget before a forced termination.
    pub max_rounds: u32,
}

/// The Logic world kind's full state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicState {
    /// Shared base state.
    pub base: WorldState,
    /// The problem under derivation.
    pub problem: ProblemRecord,
    /// The roster of participating researchers.
    pub researchers: Vec<EntityId>,
    /// Discussion-flow tracking.
    pub discussion: DiscussionState,
}

impl WorldStateExt for LogicState {
    fn base(&self) -> &WorldState {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WorldState {
        &mut self.base
    }
}

impl LogicState {
    /// Build a fresh research session from a problem statement, a set of
    /// starting hypotheses, open goals, and a roster of researchers.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::NotEnoughAgents`] if no researchers are given,
    /// or [`RuleError::InvalidInitParams`] if no goals are named.
    pub fn new(
        base: WorldState,
        problem_id: String,
        statement: String,
        hypotheses: Vec<String>,
        goal_statements: Vec<String>,
        researchers: Vec<EntityId>,
        tunables: LogicTunables,
        max_rounds: Option<u32>,
    ) -> Result<Self, RuleError> {
        if researchers.is_empty() {
            return Err(RuleError::NotEnoughAgents {
                minimum: 1,
                actual: 0,
            });
        }
        if goal_statements.is_empty() {
            return Err(RuleError::InvalidInitParams(String::from(
                "at least one goal is required",
            )));
        }
        let goals = goal_statements
            .into_iter()
            .map(|statement| Goal {
                goal_id: GoalId::new(),
                statement,
                is_proved: false,
            })
            .collect();
        Ok(Self {
            base,
            problem: ProblemRecord {
                problem_id,
                statement,
                hypotheses,
                conclusions: Vec::new(),
                pending_proposals: Vec::new(),
                goals,
                refutations: Vec::new(),
                is_solved: false,
            },
            researchers,
            discussion: DiscussionState {
                current_round: 0,
                max_rounds: max_rounds.unwrap_or(tunables.default_max_rounds),
            },
        })
    }
}

/// Validates and applies `derive`/`refute`/`extend`/`accept`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogicRules;

fn premises_param(action: &Action) -> Vec<String> {
    action
        .params
        .get("premises")
        .and_then(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Builds the `PendingProposal` common to `derive` and `extend` (which
/// delegates here with `premises=[base]`) and returns its `PROPOSAL` event.
fn propose(
    state: &mut LogicState,
    agent_id: EntityId,
    statement: String,
    premises: Vec<String>,
) -> WorldEvent {
    let proposal = PendingProposal {
        proposal_id: ProposalId::new(),
        proposed_by: agent_id,
        statement: statement.clone(),
        depends_on: premises,
    };
    let event = WorldEvent::new("PROPOSAL", agent_id.to_string())
        .with_content(statement)
        .with_meta(serde_json::json!({ "proposal_id": proposal.proposal_id }));
    state.problem.pending_proposals.push(proposal);
    event
}

impl RuleEngine for LogicRules {
    type State = LogicState;

    fn validate(&self, action: &Action, state: &Self::State) -> ValidationOutcome {
        if !state.researchers.contains(&action.agent_id) {
            return ValidationOutcome::invalid("agent is not a researcher on this problem");
        }
        match action.action_type.as_str() {
            "derive" => {
                if action
                    .params
                    .get("statement")
                    .and_then(serde_json::Value::as_str)
                    .is_none()
                {
                    return ValidationOutcome::invalid("a statement param is required");
                }
                for premise in premises_param(action) {
                    if !state.problem.hypotheses.iter().any(|h| h == &premise)
                        && !state.problem.conclusions.iter().any(|c| c == &premise)
                    {
                        return ValidationOutcome::invalid(format!(
                            "premise not found in hypotheses or conclusions: {premise}"
                        ));
                    }
                }
                ValidationOutcome::valid()
            }
            "extend" => {
                if action
                    .params
                    .get("statement")
                    .and_then(serde_json::Value::as_str)
                    .is_none()
                {
                    return ValidationOutcome::invalid("a statement param is required");
                }
                let Some(base) = action.params.get("base").and_then(serde_json::Value::as_str)
                else {
                    return ValidationOutcome::invalid("a base param is required");
                };
                if !state.problem.conclusions.iter().any(|c| c == base) {
                    return ValidationOutcome::invalid(
                        "base conclusion must already be accepted",
                    );
                }
                ValidationOutcome::valid()
            }
            "refute" | "accept" => {
                let has_proposal_id = action
                    .params
                    .get("proposal_id")
                    .and_then(serde_json::Value::as_str)
                    .is_some();
                if !has_proposal_id {
                    return ValidationOutcome::invalid("a proposal_id param is required");
                }
                ValidationOutcome::valid()
            }
            other => ValidationOutcome::invalid(format!("unknown action type: {other}")),
        }
    }

    fn apply(&mut self, action: &Action, state: &mut Self::State) -> ActionResult {
        let mut events = Vec::new();
        match action.action_type.as_str() {
            "derive" => {
                let statement = action
                    .params
                    .get("statement")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let premises = premises_param(action);
                events.push(propose(state, action.agent_id, statement, premises));
            }
            "extend" => {
                let statement = action
                    .params
                    .get("statement")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let base = action
                    .params
                    .get("base")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                events.push(propose(state, action.agent_id, statement, vec![base]));
            }
            "refute" => {
                if let Some(proposal_id) = action
                    .params
                    .get("proposal_id")
                    .and_then(serde_json::Value::as_str)
                {
                    if let Some(index) = state
                        .problem
                        .pending_proposals
                        .iter()
                        .position(|proposal| proposal.proposal_id.to_string() == proposal_id)
                    {
                        let proposal = state.problem.pending_proposals.remove(index);
                        let reason = action
                            .params
                            .get("reason")
                            .and_then(serde_json::Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        let is_contradiction = action
                            .params
                            .get("type")
                            .and_then(serde_json::Value::as_str)
                            == Some("contradiction");
                        state.problem.refutations.push(Refutation {
                            refutation_id: RefutationId::new(),
                            proposal_id: proposal.proposal_id,
                            raised_by: action.agent_id,
                            reason: reason.clone(),
                        });
                        events.push(
                            WorldEvent::new("REJECTED", action.agent_id.to_string())
                                .with_content(reason.clone()),
                        );
                        if is_contradiction {
                            events.push(
                                WorldEvent::new("CONTRADICTION", action.agent_id.to_string())
                                    .with_content(reason),
                            );
                        }
                    }
                }
            }
            "accept" => {
                if let Some(proposal_id) = action
                    .params
                    .get("proposal_id")
                    .and_then(serde_json::Value::as_str)
                {
                    if let Some(index) = state
                        .problem
                        .pending_proposals
                        .iter()
                        .position(|proposal| proposal.proposal_id.to_string() == proposal_id)
                    {
                        let proposal = state.problem.pending_proposals.remove(index);
                        let statement = proposal.statement.trim().to_string();
                        for goal in &mut state.problem.goals {
                            if goal.statement.trim() == statement {
                                goal.is_proved = true;
                            }
                        }
                        events.push(
                            WorldEvent::new("ACCEPTED", action.agent_id.to_string())
                                .with_content(statement.clone()),
                        );
                        state.problem.conclusions.push(statement);
                    }
                }
            }
            _ => {}
        }
        ActionResult::success(action.clone(), Vec::new(), events)
    }

    fn enforce_constraints(&mut self, state: &mut Self::State) -> Vec<WorldEvent> {
        let all_proved = state.problem.goals.iter().all(|goal| goal.is_proved);
        if all_proved && !state.problem.is_solved {
            state.problem.is_solved = true;
            return vec![WorldEvent::new("GOAL_PROVED", "system")
                .with_content(state.problem.statement.clone())];
        }
        Vec::new()
    }

    fn rejection_event(&self, _action: &Action, errors: &[String]) -> WorldEvent {
        WorldEvent::new("REJECTED", "system").with_content(errors.join("; "))
    }
}

/// Keeps at most one action per researcher, preferring `accept` over
/// `refute` over every other action type, then by confidence. Drops every
/// excluded action silently.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogicArbiter;

fn action_rank(action_type: &str) -> u8 {
    match action_type {
        "accept" => 0,
        "refute" => 1,
        _ => 2,
    }
}

impl Arbiter for LogicArbiter {
    type State = LogicState;

    fn resolve_conflicts(&self, actions: Vec<Action>, _state: &Self::State) -> Vec<Action> {
        let mut by_agent: BTreeMap<EntityId, Action> = BTreeMap::new();
        for action in actions {
            by_agent
                .entry(action.agent_id)
                .and_modify(|existing| {
                    let existing_rank = action_rank(&existing.action_type);
                    let candidate_rank = action_rank(&action.action_type);
                    if candidate_rank < existing_rank
                        || (candidate_rank == existing_rank
                            && action.confidence > existing.confidence)
                    {
                        *existing = action.clone();
                    }
                })
                .or_insert(action);
        }
        by_agent.into_values().collect()
    }
}

/// A single implicit `research` phase; ends the session once the problem
/// is solved or the round budget is exhausted.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogicScheduler;

impl Scheduler for LogicScheduler {
    type State = LogicState;

    fn should_advance_phase(&self, _state: &Self::State) -> bool {
        true
    }

    fn next_phase(&self, _current_phase_id: &str) -> Option<PhaseConfig> {
        None
    }

    fn advance(&mut self, state: &mut Self::State) -> Vec<WorldEvent> {
        state.discussion.current_round = state.discussion.current_round.saturating_add(1);
        state.base.current_time.round = state.base.current_time.round.saturating_add(1);
        Vec::new()
    }

    fn should_terminate(&self, state: &Self::State) -> bool {
        state.problem.is_solved || state.discussion.current_round >= state.discussion.max_rounds
    }

    fn termination_reason(&self, state: &Self::State) -> String {
        if state.problem.is_solved {
            String::from("all goals proved")
        } else {
            String::from("round budget exhausted")
        }
    }

    fn termination_event(&self, _state: &Self::State) -> WorldEvent {
        WorldEvent::new("PROBLEM_END", "system")
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
            world_type: WorldKind::Logic,
            current_time: CurrentTime::zero(),
            current_phase: CurrentPhase {
                phase_id: String::from("research"),
                phase_type: String::from("research"),
                phase_round: 0,
                phase_max_rounds: -1,
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

    fn sample_state() -> (EntityId, LogicState) {
        let researcher = EntityId::new();
        let state = LogicState::new(
            base_state(),
            String::from("p-1"),
            String::from("every even number > 2 is the sum of two primes"),
            vec![String::from("axiom of induction")],
            vec![String::from("Q.E.D.")],
            vec![researcher],
            LogicTunables::default(),
            Some(10),
        )
        .expect("valid init");
        (researcher, state)
    }

    fn derive_action(agent: EntityId, statement: &str) -> Action {
        Action {
            action_id: ActionId::new(),
            agent_id: agent,
            action_type: String::from("derive"),
            params: serde_json::json!({ "statement": statement }),
            confidence: 0.8,
            timestamp: Utc::now(),
            target: None,
            priority: None,
        }
    }

    #[test]
    fn derive_adds_a_pending_proposal() {
        let (researcher, mut state) = sample_state();
        let mut rules = LogicRules;
        let action = derive_action(researcher, "Q.E.D.");
        let result = rules.apply(&action, &mut state);
        assert_eq!(state.problem.pending_proposals.len(), 1);
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].event_type, "PROPOSAL");
    }

    #[test]
    fn derive_rejects_a_premise_that_does_not_exist() {
        let (researcher, state) = sample_state();
        let rules = LogicRules;
        let mut action = derive_action(researcher, "a new step");
        action.params = serde_json::json!({
            "statement": "a new step",
            "premises": ["nonexistent"],
        });
        assert!(!rules.validate(&action, &state).is_valid);
    }

    #[test]
    fn derive_accepts_a_premise_that_is_an_existing_hypothesis() {
        let (researcher, state) = sample_state();
        let rules = LogicRules;
        let mut action = derive_action(researcher, "a new step");
        action.params = serde_json::json!({
            "statement": "a new step",
            "premises": ["axiom of induction"],
        });
        assert!(rules.validate(&action, &state).is_valid);
    }

    #[test]
    fn accepting_a_proposal_matching_a_goal_proves_it() {
        let (researcher, mut state) = sample_state();
        let mut rules = LogicRules;
        rules.apply(&derive_action(researcher, "Q.E.D."), &mut state);
        let proposal_id = state.problem.pending_proposals[0].proposal_id.to_string();
        let accept = Action {
            action_id: ActionId::new(),
            agent_id: researcher,
            action_type: String::from("accept"),
            params: serde_json::json!({ "proposal_id": proposal_id }),
            confidence: 1.0,
            timestamp: Utc::now(),
            target: None,
            priority: None,
        };
        let result = rules.apply(&accept, &mut state);
        assert_eq!(result.events[0].event_type, "ACCEPTED");
        assert!(state.problem.goals[0].is_proved);
        let events = rules.enforce_constraints(&mut state);
        assert!(state.problem.is_solved);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "GOAL_PROVED");
    }

    #[test]
    fn extend_delegates_to_derive_and_requires_an_accepted_base() {
        let (researcher, mut state) = sample_state();
        let mut rules = LogicRules;
        let derive = derive_action(researcher, "Q.E.D.");
        rules.apply(&derive, &mut state);
        let proposal_id = state.problem.pending_proposals[0].proposal_id.to_string();
        let accept = Action {
            action_id: ActionId::new(),
            agent_id: researcher,
            action_type: String::from("accept"),
            params: serde_json::json!({ "proposal_id": proposal_id }),
            confidence: 1.0,
            timestamp: Utc::now(),
            target: None,
            priority: None,
        };
        rules.apply(&accept, &mut state);

        let unaccepted_extend = Action {
            action_id: ActionId::new(),
            agent_id: researcher,
            action_type: String::from("extend"),
            params: serde_json::json!({ "statement": "a wider claim", "base": "not accepted" }),
            confidence: 1.0,
            timestamp: Utc::now(),
            target: None,
            priority: None,
        };
        assert!(!rules.validate(&unaccepted_extend, &state).is_valid);

        let extend = Action {
            action_id: ActionId::new(),
            agent_id: researcher,
            action_type: String::from("extend"),
            params: serde_json::json!({ "statement": "a wider claim", "base": "Q.E.D." }),
            confidence: 1.0,
            timestamp: Utc::now(),
            target: None,
            priority: None,
        };
        assert!(rules.validate(&extend, &state).is_valid);
        let result = rules.apply(&extend, &mut state);
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].event_type, "PROPOSAL");
        assert_eq!(state.problem.pending_proposals.len(), 1);
        assert_eq!(
            state.problem.pending_proposals[0].depends_on,
            vec![String::from("Q.E.D.")]
        );
    }

    #[test]
    fn refute_removes_pending_proposal_without_touching_conclusions() {
        let (researcher, mut state) = sample_state();
        let mut rules = LogicRules;
        rules.apply(&derive_action(researcher, "Q.E.D."), &mut state);
        let proposal_id = state.problem.pending_proposals[0].proposal_id.to_string();
        let refute = Action {
            action_id: ActionId::new(),
            agent_id: researcher,
            action_type: String::from("refute"),
            params: serde_json::json!({ "proposal_id": proposal_id, "reason": "counterexample" }),
            confidence: 1.0,
            timestamp: Utc::now(),
            target: None,
            priority: None,
        };
        let result = rules.apply(&refute, &mut state);
        assert!(state.problem.pending_proposals.is_empty());
        assert!(state.problem.conclusions.is_empty());
        assert_eq!(state.problem.refutations.len(), 1);
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].event_type, "REJECTED");
    }

    #[test]
    fn refute_with_contradiction_type_also_emits_contradiction() {
        let (researcher, mut state) = sample_state();
        let mut rules = LogicRules;
        rules.apply(&derive_action(researcher, "Q.E.D."), &mut state);
        let proposal_id = state.problem.pending_proposals[0].proposal_id.to_string();
        let refute = Action {
            action_id: ActionId::new(),
            agent_id: researcher,
            action_type: String::from("refute"),
            params: serde_json::json!({
                "proposal_id": proposal_id,
                "reason": "contradicts hypothesis",
                "type": "contradiction",
            }),
            confidence: 1.0,
            timestamp: Utc::now(),
            target: None,
            priority: None,
        };
        let result = rules.apply(&refute, &mut state);
        assert_eq!(result.events.len(), 2);
        assert_eq!(result.events[0].event_type, "REJECTED");
        assert_eq!(result.events[1].event_type, "CONTRADICTION");
    }

    #[test]
    fn scheduler_terminates_once_solved() {
        let (_researcher, mut state) = sample_state();
        state.problem.is_solved = true;
        let scheduler = LogicScheduler;
        assert!(scheduler.should_terminate(&state));
        assert_eq!(scheduler.termination_reason(&state), "all goals proved");
    }

    #[test]
    fn arbiter_prefers_accept_over_refute_for_same_agent() {
        let (researcher, state) = sample_state();
        let arbiter = LogicArbiter;
        let accept = Action {
            action_id: ActionId::new(),
            agent_id: researcher,
            action_type: String::from("accept"),
            params: serde_json::json!({ "proposal_id": "x" }),
            confidence: 0.5,
            timestamp: Utc::now(),
            target: None,
            priority: None,
        };
        let mut refute = accept.clone();
        refute.action_type = String::from("refute");
        refute.confidence = 0.9;
        let resolved = arbiter.resolve_conflicts(vec![refute, accept], &state);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].action_type, "accept");
    }
}
