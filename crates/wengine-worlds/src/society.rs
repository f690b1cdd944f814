//! The Society world kind: tick-driven social simulation.
//!
//! Every active agent may act once per tick (`work`, `consume`, `talk`,
//! `help`, `conflict`, or `idle`). `enforce_constraints` runs the
//! tick-level bookkeeping every kind-specific action skips: hostile-talk
//! escalation, periodic world shocks, exit-threshold checks, and the
//! Gini-coefficient-based `stability_index`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wengine_kernel::traits::{Arbiter, PhaseConfig, RuleEngine, Scheduler, ValidationOutcome};
use wengine_kernel::WorldStateExt;
use wengine_types::{Action, ActionResult, EntityId, Relationship, WorldEvent, WorldState};

use crate::config::SocietyTunables;
use crate::error::RuleError;
use crate::rng::WorldRng;

/// One agent's social and economic state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocietyAgent {
    /// Social role (`"worker"`, `"leader"`, `"helper"`, or a free label).
    pub role: String,
    /// Personal resource balance. Never negative.
    pub resources: i64,
    /// Emotional state in `[-1, 1]`.
    pub mood: f64,
    /// Whether this agent still participates.
    pub is_active: bool,
    /// Consecutive ticks spent at zero resources.
    pub zero_resource_ticks: u32,
    /// Consecutive ticks spent below the low-mood threshold.
    pub low_mood_ticks: u32,
    /// The last tick this agent successfully acted.
    pub last_action_tick: u64,
}

/// World-owned resource pools.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SocietyGlobals {
    /// The shared community pool.
    pub community_pool: f64,
    /// The environment's regenerating pool.
    pub environment_pool: f64,
    /// Amount `environment_pool` grows by each tick.
    pub regeneration_rate: f64,
}

/// The Society world kind's full state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocietyState {
    /// Shared base state.
    pub base: WorldState,
    /// Per-agent state, keyed by entity id.
    pub agents: BTreeMap<EntityId, SocietyAgent>,
    /// World-owned resource pools.
    pub globals: SocietyGlobals,
    /// `1 - Gini(active agent resources)`, recomputed every tick.
    pub stability_index: f64,
    /// Tick budget before forced termination.
    pub max_ticks: u64,
}

impl WorldStateExt for SocietyState {
    fn base(&self) -> &WorldState {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WorldState {
        &mut self.base
    }
}

impl SocietyState {
    /// Build a fresh simulation from a roster of agents with starting
    /// resources and mood `0.0`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::NotEnoughAgents`] if the roster is empty.
    pub fn new(
        base: WorldState,
        agent_ids: Vec<EntityId>,
        starting_resources: i64,
        globals: SocietyGlobals,
        max_ticks: u64,
    ) -> Result<Self, RuleError> {
        if agent_ids.is_empty() {
            return Err(RuleError::NotEnoughAgents {
                minimum: 1,
                actual: 0,
            });
        }
        let agents = agent_ids
            .into_iter()
            .map(|id| {
                (
                    id,
                    SocietyAgent {
                        role: String::from("worker"),
                        resources: starting_resources,
                        mood: 0.0,
                        is_active: true,
                        zero_resource_ticks: 0,
                        low_mood_ticks: 0,
                        last_action_tick: 0,
                    },
                )
            })
            .collect();
        Ok(Self {
            base,
            agents,
            globals,
            stability_index: 1.0,
            max_ticks,
        })
    }

    fn active_agent_ids(&self) -> Vec<EntityId> {
        self.agents
            .iter()
            .filter(|(_, agent)| agent.is_active)
            .map(|(id, _)| *id)
            .collect()
    }

    fn relationship_strength(&self, from: EntityId, to: EntityId) -> f64 {
        self.base
            .relationships
            .iter()
            .find(|edge| edge.from_id == from && edge.to_id == to)
            .map_or(0.0, |edge| edge.strength)
    }

    fn adjust_relationship(&mut self, from: EntityId, to: EntityId, delta: f64) {
        if let Some(edge) = self
            .base
            .relationships
            .iter_mut()
            .find(|edge| edge.from_id == from && edge.to_id == to)
        {
            edge.strength = (edge.strength + delta).clamp(-1.0, 1.0);
            return;
        }
        self.base.relationships.push(Relationship {
            from_id: from,
            to_id: to,
            relation_type: String::from("peer"),
            strength: delta.clamp(-1.0, 1.0),
        });
    }
}

fn target_agent_id(action: &Action) -> Option<EntityId> {
    action.target.as_ref().map(|target| target.id)
}

fn intensity(action: &Action) -> usize {
    action
        .params
        .get("intensity")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(1)
        .clamp(1, 3) as usize
}

fn talk_tone(action: &Action) -> String {
    action
        .params
        .get("tone")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("neutral")
        .to_string()
}

/// Validates and applies `work`/`consume`/`talk`/`help`/`conflict`/`idle`.
#[derive(Debug, Clone)]
pub struct SocietyRules {
    tunables: SocietyTunables,
    rng: WorldRng,
}

impl SocietyRules {
    /// Build a rule engine with the given tunables and rng source.
    #[must_use]
    pub const fn new(tunables: SocietyTunables, rng: WorldRng) -> Self {
        Self { tunables, rng }
    }

    fn work_efficiency(&self, role: &str, tick: u64) -> f64 {
        let mut efficiency = if role == "worker" {
            self.tunables.work_role_bonus
        } else {
            1.0
        };
        if tick > self.tunables.work_diminishing_start_tick {
            let overage = tick.saturating_sub(self.tunables.work_diminishing_start_tick);
            #[allow(clippy::cast_precision_loss)]
            let penalty = overage as f64 * self.tunables.work_diminishing_rate;
            efficiency -= penalty;
        }
        efficiency.max(self.tunables.work_min_efficiency)
    }
}

impl RuleEngine for SocietyRules {
    type State = SocietyState;

    fn validate(&self, action: &Action, state: &Self::State) -> ValidationOutcome {
        let Some(actor) = state.agents.get(&action.agent_id) else {
            return ValidationOutcome::invalid("unknown agent");
        };
        if !actor.is_active {
            return ValidationOutcome::invalid("agent is no longer active");
        }
        match action.action_type.as_str() {
            "work" | "idle" => ValidationOutcome::valid(),
            "consume" => {
                if action.params.get("amount").and_then(serde_json::Value::as_i64).is_some() {
                    ValidationOutcome::valid()
                } else {
                    ValidationOutcome::invalid("consume requires an amount param")
                }
            }
            "talk" | "help" | "conflict" => {
                let Some(target_id) = target_agent_id(action) else {
                    return ValidationOutcome::invalid("action requires a target");
                };
                if target_id == action.agent_id {
                    return ValidationOutcome::invalid("cannot target self");
                }
                match state.agents.get(&target_id) {
                    Some(target) if target.is_active => ValidationOutcome::valid(),
                    Some(_) => ValidationOutcome::invalid("target is not active"),
                    None => ValidationOutcome::invalid("unknown target"),
                }
            }
            other => ValidationOutcome::invalid(format!("unknown action type: {other}")),
        }
    }

    fn apply(&mut self, action: &Action, state: &mut Self::State) -> ActionResult {
        let tick = state.base.current_time.tick;
        let mut events = Vec::new();
        match action.action_type.as_str() {
            "work" => {
                let level = intensity(action);
                let role = state
                    .agents
                    .get(&action.agent_id)
                    .map_or_else(|| String::from("worker"), |agent| agent.role.clone());
                let efficiency = self.work_efficiency(&role, tick);
                #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let reward = (f64::from(self.tunables.work_reward[level - 1]) * efficiency) as i64;
                if let Some(agent) = state.agents.get_mut(&action.agent_id) {
                    agent.resources = agent.resources.saturating_add(reward);
                    agent.last_action_tick = tick;
                }
                events.push(
                    WorldEvent::new("ACTION_ACCEPTED", action.agent_id.to_string()).with_meta(
                        serde_json::json!({ "intensity": level, "reward": reward }),
                    ),
                );
            }
            "consume" => {
                let amount = action
                    .params
                    .get("amount")
                    .and_then(serde_json::Value::as_i64)
                    .unwrap_or(0)
                    .max(0);
                if let Some(agent) = state.agents.get_mut(&action.agent_id) {
                    let indulgent = agent.mood > self.tunables.consume_indulgence_threshold;
                    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let cost = if indulgent {
                        (amount as f64 * self.tunables.consume_indulgence_cost_multiplier) as i64
                    } else {
                        amount
                    };
                    if agent.resources >= cost {
                        agent.resources = agent.resources.saturating_sub(cost);
                        agent.mood = (agent.mood + self.tunables.consume_mood_boost).clamp(-1.0, 1.0);
                        agent.last_action_tick = tick;
                        events.push(
                            WorldEvent::new("resource_consumed", action.agent_id.to_string())
                                .with_meta(serde_json::json!({ "cost": cost })),
                        );
                    } else {
                        agent.mood =
                            (agent.mood + self.tunables.consume_fail_mood_penalty).clamp(-1.0, 1.0);
                        events.push(WorldEvent::new(
                            "consume_failed",
                            action.agent_id.to_string(),
                        ));
                    }
                }
            }
            "talk" => {
                let target_id = target_agent_id(action).unwrap_or(action.agent_id);
                let tone = talk_tone(action);
                let role_bonus = state
                    .agents
                    .get(&action.agent_id)
                    .filter(|agent| agent.role == "leader" && tone == "friendly")
                    .map_or(1.0, |_| self.tunables.leader_role_bonus);
                let delta = match tone.as_str() {
                    "friendly" => self.tunables.talk_friendly_boost * role_bonus,
                    "hostile" => -self.tunables.talk_hostile_penalty,
                    _ => self.tunables.talk_neutral_boost,
                };
                state.adjust_relationship(action.agent_id, target_id, delta);
                events.push(
                    WorldEvent::new("talk", action.agent_id.to_string()).with_meta(
                        serde_json::json!({ "target": target_id.to_string(), "tone": tone }),
                    ),
                );
            }
            "help" => {
                let target_id = target_agent_id(action).unwrap_or(action.agent_id);
                let role_bonus = state
                    .agents
                    .get(&action.agent_id)
                    .filter(|agent| agent.role == "helper")
                    .map_or(1.0, |_| self.tunables.helper_role_bonus);
                state.adjust_relationship(action.agent_id, target_id, 0.05 * role_bonus);
                events.push(
                    WorldEvent::new("help_given", action.agent_id.to_string())
                        .with_content(target_id.to_string()),
                );
            }
            "conflict" => {
                let target_id = target_agent_id(action).unwrap_or(action.agent_id);
                let level = intensity(action);
                let loss = i64::from(self.tunables.conflict_resource_loss[level - 1]);
                if let Some(agent) = state.agents.get_mut(&action.agent_id) {
                    agent.resources = agent.resources.saturating_sub(loss);
                }
                if let Some(target) = state.agents.get_mut(&target_id) {
                    target.resources = target.resources.saturating_sub(loss);
                }
                #[allow(clippy::cast_precision_loss)]
                let penalty = self.tunables.conflict_relationship_penalty * level as f64;
                state.adjust_relationship(action.agent_id, target_id, -penalty);
                state.adjust_relationship(target_id, action.agent_id, -penalty);
                events.push(
                    WorldEvent::new("conflict_occurred", action.agent_id.to_string()).with_meta(
                        serde_json::json!({ "target": target_id.to_string(), "intensity": level }),
                    ),
                );
            }
            "idle" => {
                events.push(WorldEvent::new("idle", action.agent_id.to_string()));
            }
            _ => {}
        }
        ActionResult::success(action.clone(), Vec::new(), events)
    }

    fn enforce_constraints(&mut self, state: &mut Self::State) -> Vec<WorldEvent> {
        let mut events = Vec::new();
        let tick = state.base.current_time.tick;

        let hostile_pairs: Vec<(EntityId, EntityId)> = state
            .base
            .relationships
            .iter()
            .filter(|edge| edge.strength < self.tunables.conflict_escalation_threshold)
            .map(|edge| (edge.from_id, edge.to_id))
            .collect();
        for (from, to) in hostile_pairs {
            if self.rng.gen_ratio_sample() < self.tunables.conflict_escalation_probability {
                let loss = i64::from(self.tunables.conflict_resource_loss[0]);
                if let Some(agent) = state.agents.get_mut(&from) {
                    agent.resources = agent.resources.saturating_sub(loss);
                }
                events.push(
                    WorldEvent::new("CONFLICT_ESCALATION", "system").with_meta(serde_json::json!({
                        "from": from.to_string(),
                        "to": to.to_string(),
                    })),
                );
            }
        }

        if tick > 0 && tick % self.tunables.shock_interval == 0 {
            let active = state.active_agent_ids();
            let chosen = self
                .rng
                .choose_indices(active.len(), self.tunables.shock_agent_count);
            for index in chosen {
                let agent_id = active[index];
                let (low, high) = self.tunables.shock_resource_range;
                let resource_loss = self.rng.gen_range_inclusive_i64(low, high);
                let (mood_low, mood_high) = self.tunables.shock_mood_range;
                let mood_loss = self.rng.gen_range_inclusive_f64(mood_low, mood_high);
                if let Some(agent) = state.agents.get_mut(&agent_id) {
                    agent.resources = agent.resources.saturating_sub(resource_loss);
                    agent.mood = (agent.mood - mood_loss).clamp(-1.0, 1.0);
                }
                events.push(
                    WorldEvent::new("SHOCK_EVENT", "system").with_content(agent_id.to_string()),
                );
            }
        }

        let exiting: Vec<(EntityId, &'static str)> = state
            .agents
            .iter_mut()
            .filter_map(|(id, agent)| {
                if !agent.is_active {
                    return None;
                }
                if agent.resources <= 0 {
                    agent.zero_resource_ticks = agent.zero_resource_ticks.saturating_add(1);
                } else {
                    agent.zero_resource_ticks = 0;
                }
                if agent.mood < self.tunables.low_mood_threshold {
                    agent.low_mood_ticks = agent.low_mood_ticks.saturating_add(1);
                } else {
                    agent.low_mood_ticks = 0;
                }
                if agent.zero_resource_ticks >= self.tunables.zero_resource_exit_threshold {
                    Some((*id, "zero_resources"))
                } else if agent.low_mood_ticks >= self.tunables.low_mood_exit_threshold {
                    Some((*id, "low_mood"))
                } else {
                    None
                }
            })
            .collect();
        for (id, reason) in exiting {
            if let Some(agent) = state.agents.get_mut(&id) {
                agent.is_active = false;
            }
            events.push(
                WorldEvent::new("AGENT_EXIT", "system")
                    .with_meta(serde_json::json!({ "agent": id.to_string(), "reason": reason })),
            );
        }

        state.stability_index = 1.0 - gini_coefficient(
            &state
                .agents
                .values()
                .filter(|agent| agent.is_active)
                .map(|agent| agent.resources.max(0))
                .collect::<Vec<_>>(),
        );

        events
    }

    fn rejection_event(&self, _action: &Action, errors: &[String]) -> WorldEvent {
        WorldEvent::new("REJECTED", "system").with_content(errors.join("; "))
    }
}

/// The Gini coefficient of a resource distribution, `0.0` for perfect
/// equality (including the empty/singleton case).
fn gini_coefficient(values: &[i64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.iter().map(|value| *value as f64).collect();
    sorted.sort_by(f64::total_cmp);
    #[allow(clippy::cast_precision_loss)]
    let n = sorted.len() as f64;
    let sum: f64 = sorted.iter().sum();
    if sum <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(index, value)| {
            #[allow(clippy::cast_precision_loss)]
            let rank = (index + 1) as f64;
            rank * value
        })
        .sum();
    (2.0 * weighted) / (n * sum) - (n + 1.0) / n
}

/// Keeps at most one action per agent, preferring a non-`idle` action if
/// the same agent submitted both; drops every other excluded action
/// silently (no `rejected_event`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SocietyArbiter;

impl Arbiter for SocietyArbiter {
    type State = SocietyState;

    fn resolve_conflicts(&self, actions: Vec<Action>, _state: &Self::State) -> Vec<Action> {
        let mut by_agent: BTreeMap<EntityId, Action> = BTreeMap::new();
        for action in actions {
            by_agent
                .entry(action.agent_id)
                .and_modify(|existing| {
                    if existing.action_type == "idle" && action.action_type != "idle" {
                        *existing = action.clone();
                    }
                })
                .or_insert(action);
        }
        by_agent.into_values().collect()
    }
}

/// Ticks the simulation forward every step; ends it once no agents remain
/// active or `max_ticks` is exhausted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocietyScheduler;

impl Scheduler for SocietyScheduler {
    type State = SocietyState;

    fn should_advance_phase(&self, _state: &Self::State) -> bool {
        true
    }

    fn next_phase(&self, _current_phase_id: &str) -> Option<PhaseConfig> {
        None
    }

    fn advance(&mut self, state: &mut Self::State) -> Vec<WorldEvent> {
        state.base.current_time.tick = state.base.current_time.tick.saturating_add(1);
        state.globals.environment_pool += state.globals.regeneration_rate;
        vec![WorldEvent::new("TICK_END", "system").with_meta(serde_json::json!({
            "tick": state.base.current_time.tick,
            "stability_index": state.stability_index,
        }))]
    }

    fn should_terminate(&self, state: &Self::State) -> bool {
        state.active_agent_ids().is_empty() || state.base.current_time.tick >= state.max_ticks
    }

    fn termination_reason(&self, state: &Self::State) -> String {
        if state.active_agent_ids().is_empty() {
            String::from("no active agents remain")
        } else {
            String::from("max ticks reached")
        }
    }

    fn termination_event(&self, state: &Self::State) -> WorldEvent {
        WorldEvent::new("SOCIETY_END", "system").with_meta(serde_json::json!({
            "final_stability_index": state.stability_index,
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use wengine_types::{CurrentPhase, CurrentTime, SessionId, WorldKind};

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

    fn globals() -> SocietyGlobals {
        SocietyGlobals {
            community_pool: 0.0,
            environment_pool: 100.0,
            regeneration_rate: 1.0,
        }
    }

    #[test]
    fn gini_of_equal_distribution_is_zero() {
        assert!((gini_coefficient(&[10, 10, 10])).abs() < 1e-9);
    }

    #[test]
    fn gini_of_maximal_inequality_approaches_one() {
        let gini = gini_coefficient(&[0, 0, 0, 100]);
        assert!(gini > 0.6);
    }

    #[test]
    fn work_rewards_scale_with_role_bonus() {
        let a = EntityId::new();
        let mut state = SocietyState::new(base_state(), vec![a], 0, globals(), 200).expect("state");
        let mut rules = SocietyRules::new(SocietyTunables::default(), WorldRng::from_seed(1));
        let action = Action {
            action_id: wengine_types::ActionId::new(),
            agent_id: a,
            action_type: String::from("work"),
            params: serde_json::json!({ "intensity": 2 }),
            confidence: 1.0,
            timestamp: Utc::now(),
            target: None,
            priority: None,
        };
        let result = rules.apply(&action, &mut state);
        assert!(state.agents[&a].resources > 0);
        assert_eq!(result.events[0].event_type, "ACTION_ACCEPTED");
    }

    #[test]
    fn zero_resources_for_threshold_ticks_exits_agent() {
        let a = EntityId::new();
        let mut state = SocietyState::new(base_state(), vec![a], 0, globals(), 200).expect("state");
        let mut rules = SocietyRules::new(SocietyTunables::default(), WorldRng::from_seed(2));
        let mut events = Vec::new();
        for _ in 0..rules.tunables.zero_resource_exit_threshold {
            events = rules.enforce_constraints(&mut state);
        }
        assert!(!state.agents[&a].is_active);
        assert!(events.iter().any(|event| event.event_type == "AGENT_EXIT"));
    }

    #[test]
    fn world_shock_emits_shock_event() {
        let a = EntityId::new();
        let mut state = SocietyState::new(base_state(), vec![a], 10, globals(), 200).expect("state");
        let mut tunables = SocietyTunables::default();
        tunables.shock_interval = 1;
        tunables.shock_agent_count = 1;
        let mut rules = SocietyRules::new(tunables, WorldRng::from_seed(3));
        state.base.current_time.tick = 1;
        let events = rules.enforce_constraints(&mut state);
        assert!(events.iter().any(|event| event.event_type == "SHOCK_EVENT"));
    }

    #[test]
    fn scheduler_terminates_once_no_agents_remain_active() {
        let a = EntityId::new();
        let mut state = SocietyState::new(base_state(), vec![a], 0, globals(), 200).expect("state");
        state.agents.get_mut(&a).expect("agent").is_active = false;
        let scheduler = SocietyScheduler;
        assert!(scheduler.should_terminate(&state));
    }

    #[test]
    fn arbiter_keeps_one_action_per_agent_preferring_non_idle() {
        let a = EntityId::new();
        let state = SocietyState::new(base_state(), vec![a], 10, globals(), 200).expect("state");
        let idle = Action {
            action_id: wengine_types::ActionId::new(),
            agent_id: a,
            action_type: String::from("idle"),
            params: serde_json::json!({}),
            confidence: 1.0,
            timestamp: Utc::now(),
            target: None,
            priority: None,
        };
        let mut work = idle.clone();
        work.action_type = String::from("work");
        let arbiter = SocietyArbiter;
        let resolved = arbiter.resolve_conflicts(vec![idle, work], &state);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].action_type, "work");
    }
}
