//! The Game world kind: turn-based card combat.
//!
//! One agent acts per turn. `play_card` removes a named card from the
//! acting agent's hand and resolves its effect: `attack` moves a fixed hp
//! amount to a distinct living target, `heal` restores hp (to self by
//! default), any other card label is cosmetic. `draw` pushes a new card
//! into the hand, independent of `play_card`. The world ends when one
//! agent remains alive or `max_turns` is reached.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wengine_kernel::traits::{Arbiter, PhaseConfig, RuleEngine, Scheduler, ValidationOutcome};
use wengine_kernel::WorldStateExt;
use wengine_types::{Action, ActionResult, EntityId, WorldEvent, WorldState};

use crate::config::GameTunables;
use crate::error::RuleError;

/// One agent's combat state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameAgent {
    /// Current hit points.
    pub hp: u32,
    /// Maximum hit points, the ceiling `heal` clamps to.
    pub max_hp: u32,
    /// Card labels currently held.
    pub hand: Vec<String>,
    /// Whether this agent is still in the game.
    pub is_alive: bool,
}

/// Turn-order and outcome tracking for the match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePhaseState {
    /// The agent whose turn it currently is.
    pub current_turn_agent_id: Option<EntityId>,
    /// Fixed seating order, cycled by [`GameScheduler::advance`].
    pub turn_order: Vec<EntityId>,
    /// Index into `turn_order` of the current turn.
    pub turn_index: usize,
    /// Turns completed so far.
    pub total_turns: u64,
    /// Turn budget before a forced draw-by-exhaustion termination.
    pub max_turns: u64,
    /// `"playing"` or `"ended"`.
    pub game_phase: String,
    /// The winning agent, set once `game_phase` becomes `"ended"`.
    pub winner_id: Option<EntityId>,
}

/// The Game world kind's full state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Shared base state.
    pub base: WorldState,
    /// Per-agent combat state, keyed by entity id.
    pub agents: BTreeMap<EntityId, GameAgent>,
    /// Turn order and outcome tracking.
    pub game: GamePhaseState,
}

impl WorldStateExt for GameState {
    fn base(&self) -> &WorldState {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WorldState {
        &mut self.base
    }
}

impl GameState {
    /// Build the initial state for a fresh match from a fixed seating
    /// order. Every agent starts at full hp with an empty hand.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::NotEnoughAgents`] if fewer than two agents are
    /// supplied.
    pub fn new(
        base: WorldState,
        agent_ids: Vec<EntityId>,
        starting_hp: u32,
        max_turns: u64,
    ) -> Result<Self, RuleError> {
        if agent_ids.len() < 2 {
            return Err(RuleError::NotEnoughAgents {
                minimum: 2,
                actual: agent_ids.len(),
            });
        }
        let agents = agent_ids
            .iter()
            .map(|id| {
                (
                    *id,
                    GameAgent {
                        hp: starting_hp,
                        max_hp: starting_hp,
                        hand: Vec::new(),
                        is_alive: true,
                    },
                )
            })
            .collect();
        let first = agent_ids[0];
        Ok(Self {
            base,
            agents,
            game: GamePhaseState {
                current_turn_agent_id: Some(first),
                turn_order: agent_ids,
                turn_index: 0,
                total_turns: 0,
                max_turns,
                game_phase: String::from("playing"),
                winner_id: None,
            },
        })
    }

    fn alive_agent_ids(&self) -> Vec<EntityId> {
        self.agents
            .iter()
            .filter(|(_, agent)| agent.is_alive)
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Validates and applies `play_card` (carrying an `attack`/`heal`/cosmetic
/// `card` param) and `draw`.
#[derive(Debug, Clone, Default)]
pub struct GameRules {
    tunables: GameTunables,
}

impl GameRules {
    /// Build a rule engine with the given tunables.
    #[must_use]
    pub const fn new(tunables: GameTunables) -> Self {
        Self { tunables }
    }
}

fn target_agent_id(action: &Action) -> Option<EntityId> {
    action.target.as_ref().map(|target| target.id)
}

impl RuleEngine for GameRules {
    type State = GameState;

    fn validate(&self, action: &Action, state: &Self::State) -> ValidationOutcome {
        if state.game.current_turn_agent_id != Some(action.agent_id) {
            return ValidationOutcome::invalid("not your turn");
        }
        let Some(actor) = state.agents.get(&action.agent_id) else {
            return ValidationOutcome::invalid("unknown agent");
        };
        if !actor.is_alive {
            return ValidationOutcome::invalid("agent is not alive");
        }
        match action.action_type.as_str() {
            "play_card" => {
                let Some(card) = action
                    .params
                    .get("card")
                    .and_then(serde_json::Value::as_str)
                else {
                    return ValidationOutcome::invalid("play_card requires a card param");
                };
                if !actor.hand.iter().any(|held| held == card) {
                    return ValidationOutcome::invalid("card not in hand");
                }
                match card {
                    "attack" => {
                        let Some(target_id) = target_agent_id(action) else {
                            return ValidationOutcome::invalid("attack requires a target");
                        };
                        if target_id == action.agent_id {
                            return ValidationOutcome::invalid("attack requires a distinct target");
                        }
                        match state.agents.get(&target_id) {
                            Some(target) if target.is_alive => ValidationOutcome::valid(),
                            Some(_) => ValidationOutcome::invalid("target is not alive"),
                            None => ValidationOutcome::invalid("unknown target"),
                        }
                    }
                    "heal" => match target_agent_id(action) {
                        Some(target_id) => match state.agents.get(&target_id) {
                            Some(target) if target.is_alive => ValidationOutcome::valid(),
                            Some(_) => ValidationOutcome::invalid("target is not alive"),
                            None => ValidationOutcome::invalid("unknown target"),
                        },
                        None => ValidationOutcome::valid(),
                    },
                    _ => ValidationOutcome::valid(),
                }
            }
            "draw" => ValidationOutcome::valid(),
            other => ValidationOutcome::invalid(format!("unknown action type: {other}")),
        }
    }

    fn apply(&mut self, action: &Action, state: &mut Self::State) -> ActionResult {
        let mut events = Vec::new();
        match action.action_type.as_str() {
            "play_card" => {
                let Some(card) = action
                    .params
                    .get("card")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
                else {
                    return ActionResult::success(action.clone(), Vec::new(), events);
                };
                if let Some(agent) = state.agents.get_mut(&action.agent_id) {
                    if let Some(index) = agent.hand.iter().position(|held| held == &card) {
                        agent.hand.remove(index);
                    }
                }
                events.push(
                    WorldEvent::new("card_played", action.agent_id.to_string())
                        .with_content(card.clone()),
                );
                match card.as_str() {
                    "attack" => {
                        let target_id = target_agent_id(action).unwrap_or(action.agent_id);
                        if let Some(target) = state.agents.get_mut(&target_id) {
                            target.hp = target.hp.saturating_sub(self.tunables.attack_damage);
                            events.push(
                                WorldEvent::new("damage_dealt", action.agent_id.to_string())
                                    .with_meta(serde_json::json!({
                                        "target": target_id.to_string(),
                                        "amount": self.tunables.attack_damage,
                                        "remaining_hp": target.hp,
                                    })),
                            );
                            if target.hp == 0 {
                                target.is_alive = false;
                                events.push(
                                    WorldEvent::new("agent_died", "system")
                                        .with_content(target_id.to_string()),
                                );
                            }
                        }
                    }
                    "heal" => {
                        let target_id = target_agent_id(action).unwrap_or(action.agent_id);
                        if let Some(target) = state.agents.get_mut(&target_id) {
                            target.hp = target
                                .hp
                                .saturating_add(self.tunables.heal_amount)
                                .min(target.max_hp);
                            events.push(
                                WorldEvent::new("agent_healed", action.agent_id.to_string())
                                    .with_meta(serde_json::json!({
                                        "target": target_id.to_string(),
                                        "amount": self.tunables.heal_amount,
                                        "hp": target.hp,
                                    })),
                            );
                        }
                    }
                    _ => {}
                }
            }
            "draw" => {
                let label = format!("card-{}", state.game.total_turns);
                if let Some(agent) = state.agents.get_mut(&action.agent_id) {
                    agent.hand.push(label.clone());
                }
                events.push(
                    WorldEvent::new("card_drawn", action.agent_id.to_string())
                        .with_content(label),
                );
            }
            _ => {}
        }
        ActionResult::success(action.clone(), Vec::new(), events)
    }

    fn enforce_constraints(&mut self, state: &mut Self::State) -> Vec<WorldEvent> {
        if state.game.game_phase == "ended" {
            return Vec::new();
        }
        let alive = state.alive_agent_ids();
        if alive.len() == 1 {
            let winner = alive[0];
            state.game.game_phase = String::from("ended");
            state.game.winner_id = Some(winner);
            return vec![WorldEvent::new("game_end", "system")
                .with_meta(serde_json::json!({ "winner": winner.to_string() }))];
        }
        Vec::new()
    }

    fn rejection_event(&self, _action: &Action, errors: &[String]) -> WorldEvent {
        WorldEvent::new("REJECTED", "system").with_content(errors.join("; "))
    }
}

/// Keeps only the current turn's agent's single highest-`priority` action
/// (ties broken by proposal order); every other action is surfaced as
/// `action_rejected`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameArbiter;

impl Arbiter for GameArbiter {
    type State = GameState;

    fn resolve_conflicts(&self, actions: Vec<Action>, state: &Self::State) -> Vec<Action> {
        let Some(current) = state.game.current_turn_agent_id else {
            return Vec::new();
        };
        let mut mine: Vec<Action> = actions
            .into_iter()
            .filter(|action| action.agent_id == current)
            .collect();
        mine.sort_by(|a, b| b.priority_or_default().cmp(&a.priority_or_default()));
        mine.truncate(1);
        mine
    }

    fn rejected_event(&self, action: &Action) -> Option<WorldEvent> {
        Some(
            WorldEvent::new("action_rejected", "system").with_content(format!(
                "agent {} acted out of turn",
                action.agent_id
            )),
        )
    }
}

/// Advances to the next alive agent in seating order every step; ends the
/// match on single-survivor or `max_turns` exhaustion.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameScheduler;

impl Scheduler for GameScheduler {
    type State = GameState;

    fn step_start_event(&self, state: &Self::State) -> Option<WorldEvent> {
        state
            .game
            .current_turn_agent_id
            .map(|agent| WorldEvent::new("TURN_START", "system").with_content(agent.to_string()))
    }

    fn should_advance_phase(&self, state: &Self::State) -> bool {
        state.game.game_phase == "playing"
    }

    fn next_phase(&self, _current_phase_id: &str) -> Option<PhaseConfig> {
        None
    }

    fn advance(&mut self, state: &mut Self::State) -> Vec<WorldEvent> {
        let previous = state.game.current_turn_agent_id;
        state.game.total_turns = state.game.total_turns.saturating_add(1);

        let order_len = state.game.turn_order.len();
        if order_len == 0 {
            return Vec::new();
        }
        let mut next_index = state.game.turn_index;
        let mut next_agent = None;
        for _ in 0..order_len {
            next_index = (next_index + 1) % order_len;
            let candidate = state.game.turn_order[next_index];
            if state
                .agents
                .get(&candidate)
                .is_some_and(|agent| agent.is_alive)
            {
                next_agent = Some(candidate);
                break;
            }
        }
        state.game.turn_index = next_index;
        state.game.current_turn_agent_id = next_agent;

        let mut events = vec![WorldEvent::new("turn_end", "system").with_meta(
            serde_json::json!({ "agent": previous.map(|id| id.to_string()) }),
        )];
        if let Some(agent) = next_agent {
            events.push(
                WorldEvent::new("turn_start", "system").with_content(agent.to_string()),
            );
        }
        events
    }

    fn should_terminate(&self, state: &Self::State) -> bool {
        state.game.game_phase == "ended" || state.game.total_turns >= state.game.max_turns
    }

    fn termination_reason(&self, state: &Self::State) -> String {
        if state.game.game_phase == "ended" {
            String::from("single survivor")
        } else {
            String::from("max turns reached")
        }
    }

    fn termination_event(&self, state: &Self::State) -> WorldEvent {
        WorldEvent::new("game_end", "system").with_meta(serde_json::json!({
            "winner": state.game.winner_id.map(|id| id.to_string()),
            "total_turns": state.game.total_turns,
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use wengine_types::{CurrentPhase, CurrentTime, WorldKind};

    use super::*;

    fn base_state() -> WorldState {
        WorldState {
            world_id: wengine_types::SessionId::new(),
            world_type: WorldKind::Game,
            current_time: CurrentTime::zero(),
            current_phase: CurrentPhase {
                phase_id: String::from("playing"),
                phase_type: String::from("playing"),
                phase_round: 0,
                phase_max_rounds: -1,
                started_at: Utc::now(),
                phase_rules: serde_json::Value::Null,
            },
            entities: std::collections::BTreeMap::new(),
            relationships: Vec::new(),
            resources: std::collections::BTreeMap::new(),
            global_vars: std::collections::BTreeMap::new(),
            rule_states: std::collections::BTreeMap::new(),
            is_terminated: false,
            termination_reason: None,
        }
    }

    fn two_player_state() -> (EntityId, EntityId, GameState) {
        let a = EntityId::new();
        let b = EntityId::new();
        let mut state = GameState::new(base_state(), vec![a, b], 20, 100).expect("two agents");
        for agent in state.agents.values_mut() {
            agent.hand = vec![String::from("attack"), String::from("heal")];
        }
        (a, b, state)
    }

    fn attack_action(attacker: EntityId, target: EntityId) -> Action {
        Action {
            action_id: wengine_types::ActionId::new(),
            agent_id: attacker,
            action_type: String::from("play_card"),
            params: serde_json::json!({ "card": "attack" }),
            confidence: 1.0,
            timestamp: Utc::now(),
            target: Some(wengine_types::Target {
                target_type: wengine_types::EntityType::Agent,
                id: target,
                name: None,
            }),
            priority: None,
        }
    }

    #[test]
    fn attack_reduces_target_hp_by_fixed_amount() {
        let (a, b, mut state) = two_player_state();
        let mut rules = GameRules::default();
        let action = attack_action(a, b);
        assert!(rules.validate(&action, &state).is_valid);
        rules.apply(&action, &mut state);
        assert_eq!(state.agents[&b].hp, 0);
    }

    #[test]
    fn attack_via_play_card_emits_card_played_then_damage_dealt() {
        let (a, b, mut state) = two_player_state();
        let mut rules = GameRules::new(GameTunables {
            attack_damage: 100,
            heal_amount: 15,
        });
        let action = attack_action(a, b);
        let result = rules.apply(&action, &mut state);
        assert_eq!(result.events.len(), 3);
        assert_eq!(result.events[0].event_type, "card_played");
        assert_eq!(result.events[1].event_type, "damage_dealt");
        assert_eq!(result.events[2].event_type, "agent_died");
        assert!(!state.agents[&b].is_alive);
        assert!(!state.agents[&a].hand.contains(&String::from("attack")));
    }

    #[test]
    fn out_of_turn_action_fails_validation() {
        let (a, b, state) = two_player_state();
        let rules = GameRules::default();
        let action = attack_action(b, a);
        assert!(!rules.validate(&action, &state).is_valid);
    }

    #[test]
    fn play_card_requires_the_card_to_be_in_hand() {
        let (a, b, state) = two_player_state();
        let rules = GameRules::default();
        let mut action = attack_action(a, b);
        action.params = serde_json::json!({ "card": "fireball" });
        let outcome = rules.validate(&action, &state);
        assert!(!outcome.is_valid);
    }

    #[test]
    fn defeating_the_only_opponent_ends_the_game() {
        let (a, b, mut state) = two_player_state();
        let mut rules = GameRules::new(GameTunables {
            attack_damage: 100,
            heal_amount: 15,
        });
        let action = attack_action(a, b);
        rules.apply(&action, &mut state);
        let events = rules.enforce_constraints(&mut state);
        assert_eq!(state.game.game_phase, "ended");
        assert_eq!(state.game.winner_id, Some(a));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn scheduler_advances_to_next_alive_agent_and_skips_dead_ones() {
        let (a, b, mut state) = two_player_state();
        state.agents.get_mut(&b).expect("b").is_alive = false;
        state.game.current_turn_agent_id = Some(a);
        let mut scheduler = GameScheduler;
        scheduler.advance(&mut state);
        assert_eq!(state.game.current_turn_agent_id, Some(a));
    }

    #[test]
    fn arbiter_keeps_only_current_turn_agents_actions() {
        let (a, b, state) = two_player_state();
        let arbiter = GameArbiter;
        let actions = vec![attack_action(a, b), attack_action(b, a)];
        let resolved = arbiter.resolve_conflicts(actions, &state);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].agent_id, a);
    }

    #[test]
    fn arbiter_keeps_only_the_single_highest_priority_action() {
        let (a, b, state) = two_player_state();
        let arbiter = GameArbiter;
        let mut low = attack_action(a, b);
        low.priority = Some(2);
        let mut high = attack_action(a, b);
        high.priority = Some(9);
        let resolved = arbiter.resolve_conflicts(vec![low, high.clone()], &state);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].action_id, high.action_id);
    }
}
