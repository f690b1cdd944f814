//! [`AnyEngine`]: the four concrete world kinds unified behind one type so
//! a session manager can hold heterogeneous sessions in a single map.

use std::sync::Arc;

use serde_json::Value as Json;
use wengine_eventlog::EventLogStore;
use wengine_kernel::{Engine, KernelError, WorldStateExt};
use wengine_types::{Action, ActionResult, CreateSessionParams, EntityId, SessionId, WorldKind};

use crate::config::WorldTunables;
use crate::debate::{DebateArbiter, DebateRules, DebateScheduler, DebateState, SpeakingOrder};
use crate::error::RuleError;
use crate::game::{GameArbiter, GameRules, GameScheduler, GameState};
use crate::logic::{LogicArbiter, LogicRules, LogicScheduler, LogicState};
use crate::rng::WorldRng;
use crate::society::{SocietyArbiter, SocietyGlobals, SocietyRules, SocietyScheduler, SocietyState};

type DebateEngine = Engine<DebateState, DebateRules, DebateArbiter, DebateScheduler>;
type GameEngine = Engine<GameState, GameRules, GameArbiter, GameScheduler>;
type SocietyEngine = Engine<SocietyState, SocietyRules, SocietyArbiter, SocietyScheduler>;
type LogicEngine = Engine<LogicState, LogicRules, LogicArbiter, LogicScheduler>;

/// One of the four concrete world kinds, behind a single kernel-facing
/// interface. Every variant is built from the same
/// [`wengine_kernel::Engine`], instantiated with that kind's own
/// `RuleEngine`/`Arbiter`/`Scheduler`.
pub enum AnyEngine {
    /// Structured argumentation.
    Debate(Box<DebateEngine>),
    /// Turn-based card combat.
    Game(Box<GameEngine>),
    /// Tick-driven social simulation.
    Society(Box<SocietyEngine>),
    /// Collaborative formal derivation.
    Logic(Box<LogicEngine>),
}

impl AnyEngine {
    /// Which world kind this engine is running.
    #[must_use]
    pub const fn world_kind(&self) -> WorldKind {
        match self {
            Self::Debate(_) => WorldKind::Debate,
            Self::Game(_) => WorldKind::Game,
            Self::Society(_) => WorldKind::Society,
            Self::Logic(_) => WorldKind::Logic,
        }
    }

    /// Whether the underlying world has terminated.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        match self {
            Self::Debate(engine) => engine.is_terminated(),
            Self::Game(engine) => engine.is_terminated(),
            Self::Society(engine) => engine.is_terminated(),
            Self::Logic(engine) => engine.is_terminated(),
        }
    }

    /// A JSON snapshot of the underlying world state, for `getWorldState`
    /// and the `state_update` broadcast message. Falls back to `Json::Null`
    /// on the (practically unreachable) case that the state fails to
    /// serialize.
    #[must_use]
    pub fn state_json(&self) -> Json {
        match self {
            Self::Debate(engine) => serde_json::to_value(engine.state()),
            Self::Game(engine) => serde_json::to_value(engine.state()),
            Self::Society(engine) => serde_json::to_value(engine.state()),
            Self::Logic(engine) => serde_json::to_value(engine.state()),
        }
        .unwrap_or(Json::Null)
    }

    /// The termination reason recorded on the underlying world state, if
    /// it has terminated.
    #[must_use]
    pub fn termination_reason(&self) -> Option<String> {
        match self {
            Self::Debate(engine) => engine.state().base().termination_reason.clone(),
            Self::Game(engine) => engine.state().base().termination_reason.clone(),
            Self::Society(engine) => engine.state().base().termination_reason.clone(),
            Self::Logic(engine) => engine.state().base().termination_reason.clone(),
        }
    }

    /// Run one step against whichever concrete engine this wraps.
    ///
    /// # Errors
    ///
    /// Propagates [`KernelError`] from the underlying `step` call.
    pub async fn step(&mut self, actions: Vec<Action>) -> Result<Vec<ActionResult>, KernelError> {
        match self {
            Self::Debate(engine) => engine.step(actions).await,
            Self::Game(engine) => engine.step(actions).await,
            Self::Society(engine) => engine.step(actions).await,
            Self::Logic(engine) => engine.step(actions).await,
        }
    }

    /// Build a concrete engine for `params.world_kind`, parsing
    /// `params.init_params` per kind and applying `tunables` for whichever
    /// kind is selected.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if `init_params` is missing required fields
    /// or names too few agents for the requested kind.
    pub fn create(
        session_id: SessionId,
        params: &CreateSessionParams,
        event_log: Arc<dyn EventLogStore>,
        tunables: &WorldTunables,
    ) -> Result<Self, RuleError> {
        match params.world_kind {
            WorldKind::Debate => Self::create_debate(session_id, params, event_log, tunables),
            WorldKind::Game => Self::create_game(session_id, params, event_log, tunables),
            WorldKind::Society => Self::create_society(session_id, params, event_log, tunables),
            WorldKind::Logic => Self::create_logic(session_id, params, event_log, tunables),
        }
    }

    fn create_debate(
        session_id: SessionId,
        params: &CreateSessionParams,
        event_log: Arc<dyn EventLogStore>,
        tunables: &WorldTunables,
    ) -> Result<Self, RuleError> {
        let init = &params.init_params;
        let agent_ids = parse_agent_ids(init, "agentIds")?;
        let topic = params.title.clone();
        let order = match string_field(init, "speakingOrder").as_deref() {
            Some("free") => SpeakingOrder::Free,
            Some("moderated") => SpeakingOrder::Moderated,
            _ => SpeakingOrder::RoundRobin,
        };
        let flow = parse_debate_flow(init)?;
        let scheduler = DebateScheduler::new(flow);
        let first_phase = scheduler
            .first_phase()
            .ok_or_else(|| {
                RuleError::InvalidInitParams(String::from("flow must name at least one phase"))
            })?
            .clone();
        let base = new_base_state(session_id, WorldKind::Debate, &first_phase.phase_id);
        let state = DebateState::new(
            base,
            topic,
            agent_ids,
            order,
            tunables.debate,
            &first_phase,
            params.max_rounds.unwrap_or(200),
        )?;
        let engine = Engine::new(
            session_id,
            state,
            DebateRules::default(),
            DebateArbiter,
            scheduler,
            event_log,
        );
        Ok(Self::Debate(Box::new(engine)))
    }

    fn create_game(
        session_id: SessionId,
        params: &CreateSessionParams,
        event_log: Arc<dyn EventLogStore>,
        tunables: &WorldTunables,
    ) -> Result<Self, RuleError> {
        let init = &params.init_params;
        let agent_ids = parse_agent_ids(init, "agentIds")?;
        let starting_hp = u32_field(init, "startingHp").unwrap_or(100);
        let max_turns = params.max_rounds.unwrap_or(200);
        let base = new_base_state(session_id, WorldKind::Game, "playing");
        let state = GameState::new(base, agent_ids, starting_hp, max_turns)?;
        let engine = Engine::new(
            session_id,
            state,
            GameRules::new(tunables.game),
            GameArbiter,
            GameScheduler,
            event_log,
        );
        Ok(Self::Game(Box::new(engine)))
    }

    fn create_society(
        session_id: SessionId,
        params: &CreateSessionParams,
        event_log: Arc<dyn EventLogStore>,
        tunables: &WorldTunables,
    ) -> Result<Self, RuleError> {
        let init = &params.init_params;
        let agent_ids = parse_agent_ids(init, "agentIds")?;
        let starting_resources = i64_field(init, "startingResources").unwrap_or(50);
        let globals = SocietyGlobals {
            community_pool: init
                .get("communityPool")
                .and_then(Json::as_f64)
                .unwrap_or(0.0),
            environment_pool: init
                .get("environmentPool")
                .and_then(Json::as_f64)
                .unwrap_or(100.0),
            regeneration_rate: init
                .get("regenerationRate")
                .and_then(Json::as_f64)
                .unwrap_or(1.0),
        };
        let max_ticks = params.max_rounds.unwrap_or(500);
        let base = new_base_state(session_id, WorldKind::Society, "simulation");
        let state = SocietyState::new(base, agent_ids, starting_resources, globals, max_ticks)?;
        let seed = init.get("seed").and_then(Json::as_u64);
        let rng = seed.map_or_else(WorldRng::from_entropy, WorldRng::from_seed);
        let engine = Engine::new(
            session_id,
            state,
            SocietyRules::new(tunables.society.clone(), rng),
            SocietyArbiter,
            SocietyScheduler,
            event_log,
        );
        Ok(Self::Society(Box::new(engine)))
    }

    fn create_logic(
        session_id: SessionId,
        params: &CreateSessionParams,
        event_log: Arc<dyn EventLogStore>,
        tunables: &WorldTunables,
    ) -> Result<Self, RuleError> {
        let init = &params.init_params;
        let researchers = parse_agent_ids(init, "researcherIds")?;
        let statement = string_field(init, "statement")
            .ok_or_else(|| RuleError::InvalidInitParams(String::from("statement is required")))?;
        let hypotheses = string_array_field(init, "hypotheses");
        let goals = string_array_field(init, "goals");
        let problem_id = string_field(init, "problemId").unwrap_or_else(|| session_id.to_string());
        let base = new_base_state(session_id, WorldKind::Logic, "research");
        let max_rounds = params.max_rounds.and_then(|value| u32::try_from(value).ok());
        let state = LogicState::new(
            base,
            problem_id,
            statement,
            hypotheses,
            goals,
            researchers,
            tunables.logic,
            max_rounds,
        )?;
        let engine = Engine::new(
            session_id,
            state,
            LogicRules,
            LogicArbiter,
            LogicScheduler,
            event_log,
        );
        Ok(Self::Logic(Box::new(engine)))
    }
}

fn new_base_state(
    session_id: SessionId,
    world_kind: WorldKind,
    phase_id: &str,
) -> wengine_types::WorldState {
    wengine_types::WorldState {
        world_id: session_id,
        world_type: world_kind,
        current_time: wengine_types::CurrentTime::zero(),
        current_phase: wengine_types::CurrentPhase {
            phase_id: phase_id.to_string(),
            phase_type: phase_id.to_string(),
            phase_round: 0,
            phase_max_rounds: -1,
            started_at: chrono::Utc::now(),
            phase_rules: Json::Null,
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

fn string_field(value: &Json, key: &str) -> Option<String> {
    value.get(key).and_then(Json::as_str).map(str::to_string)
}

fn string_array_field(value: &Json, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Json::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Json::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn u32_field(value: &Json, key: &str) -> Option<u32> {
    value.get(key).and_then(Json::as_u64).and_then(|raw| u32::try_from(raw).ok())
}

fn i64_field(value: &Json, key: &str) -> Option<i64> {
    value.get(key).and_then(Json::as_i64)
}

fn parse_agent_ids(value: &Json, key: &str) -> Result<Vec<EntityId>, RuleError> {
    let items = value.get(key).and_then(Json::as_array).ok_or_else(|| {
        RuleError::InvalidInitParams(format!("{key} must be an array of agent ids"))
    })?;
    items
        .iter()
        .map(|item| {
            let raw = item.as_str().ok_or_else(|| {
                RuleError::InvalidInitParams(format!("{key} entries must be strings"))
            })?;
            uuid::Uuid::parse_str(raw)
                .map(EntityId::from)
                .map_err(|_| RuleError::InvalidInitParams(format!("invalid agent id: {raw}")))
        })
        .collect()
}

fn parse_debate_flow(
    value: &Json,
) -> Result<Vec<crate::debate::DebatePhaseConfig>, RuleError> {
    let phases = value.get("flow").and_then(Json::as_array).ok_or_else(|| {
        RuleError::InvalidInitParams(String::from("flow must be an array of phase configs"))
    })?;
    phases
        .iter()
        .map(|phase| {
            let phase_id = string_field(phase, "phaseId")
                .ok_or_else(|| RuleError::InvalidInitParams(String::from("phaseId is required")))?;
            let phase_type = string_field(phase, "phaseType").unwrap_or_else(|| phase_id.clone());
            let max_rounds = phase.get("maxRounds").and_then(Json::as_i64).unwrap_or(-1);
            let allow_interrupt = phase
                .get("allowInterrupt")
                .and_then(Json::as_bool)
                .unwrap_or(false);
            let force_summary = phase
                .get("forceSummary")
                .and_then(Json::as_bool)
                .unwrap_or(false);
            Ok(crate::debate::DebatePhaseConfig {
                phase_id,
                phase_type,
                max_rounds,
                allow_interrupt,
                force_summary,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use wengine_eventlog::MemoryEventLogStore;
    use wengine_types::WorldKind;

    use super::*;

    fn store() -> Arc<dyn EventLogStore> {
        Arc::new(MemoryEventLogStore::new())
    }

    fn params(world_kind: WorldKind, init_params: Json) -> CreateSessionParams {
        CreateSessionParams {
            world_kind,
            created_by: String::from("user-1"),
            title: String::from("test session"),
            init_params,
            max_rounds: Some(20),
            llm_config: None,
        }
    }

    #[test]
    fn create_game_builds_a_game_engine() {
        let a = EntityId::new();
        let b = EntityId::new();
        let init = serde_json::json!({ "agentIds": [a.to_string(), b.to_string()] });
        let engine = AnyEngine::create(
            SessionId::new(),
            &params(WorldKind::Game, init),
            store(),
            &WorldTunables::default(),
        )
        .expect("valid game params");
        assert_eq!(engine.world_kind(), WorldKind::Game);
        assert!(!engine.is_terminated());
    }

    #[test]
    fn create_debate_requires_a_flow() {
        let a = EntityId::new();
        let b = EntityId::new();
        let init = serde_json::json!({ "agentIds": [a.to_string(), b.to_string()] });
        let result = AnyEngine::create(
            SessionId::new(),
            &params(WorldKind::Debate, init),
            store(),
            &WorldTunables::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn create_logic_requires_a_statement() {
        let a = EntityId::new();
        let init = serde_json::json!({ "researcherIds": [a.to_string()], "goals": ["Q.E.D."] });
        let result = AnyEngine::create(
            SessionId::new(),
            &params(WorldKind::Logic, init),
            store(),
            &WorldTunables::default(),
        );
        assert!(result.is_err());
    }
}
