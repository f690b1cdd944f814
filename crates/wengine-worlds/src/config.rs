//! Per-world-kind tunables: thresholds, rewards, penalties, and intervals,
//! centralized here so numeric semantics live in one place per kind
//! rather than scattered through rule engines.
//!
//! Each struct derives `Deserialize` with `#[serde(default)]` at the
//! struct level, so a deployment's `EngineConfig` YAML can override a
//! single constant without restating the rest -- fields absent from the
//! input keep this struct's own `Default` value.

use serde::Deserialize;

/// Tunables for the Game world kind.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct GameTunables {
    /// Fixed damage dealt by an `attack` action (default: 20).
    pub attack_damage: u32,
    /// Fixed hp restored by a `heal` action (default: 15).
    pub heal_amount: u32,
}

impl Default for GameTunables {
    fn default() -> Self {
        Self {
            attack_damage: 20,
            heal_amount: 15,
        }
    }
}

/// Tunables for the Society world kind.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SocietyTunables {
    /// Base resource reward per `work` intensity level (1..=3), before
    /// role bonus and efficiency penalty (default: `[5, 10, 18]`).
    pub work_reward: [u32; 3],
    /// Resource multiplier applied when `role == worker` (default: 1.5).
    pub work_role_bonus: f64,
    /// Floor the efficiency penalty never drops below (default: 0.3).
    pub work_min_efficiency: f64,
    /// Tick at which the diminishing-returns penalty begins accruing
    /// (default: 100).
    pub work_diminishing_start_tick: u64,
    /// Efficiency lost per tick past `work_diminishing_start_tick`
    /// (default: 0.001).
    pub work_diminishing_rate: f64,
    /// Mood above which `consume` is treated as indulgent (default: 0.5).
    pub consume_indulgence_threshold: f64,
    /// Cost multiplier applied to indulgent consumption (default: 1.5).
    pub consume_indulgence_cost_multiplier: f64,
    /// Mood gained from a fully-paid `consume` (default: 0.1).
    pub consume_mood_boost: f64,
    /// Mood lost from a partially-paid `consume` (default: -0.05).
    pub consume_fail_mood_penalty: f64,
    /// Relationship strength below which a hostile `talk` may escalate to
    /// `conflict` (default: -0.5).
    pub conflict_escalation_threshold: f64,
    /// Probability a qualifying hostile `talk` escalates (default: 0.2).
    pub conflict_escalation_probability: f64,
    /// Relationship delta from a friendly `talk` (default: 0.05).
    pub talk_friendly_boost: f64,
    /// Relationship delta (magnitude) from a hostile `talk` (default: 0.08).
    pub talk_hostile_penalty: f64,
    /// Relationship delta from a neutral `talk` (default: 0.02).
    pub talk_neutral_boost: f64,
    /// Relationship-boost multiplier for a `leader` initiating a friendly
    /// `talk` (default: 1.3).
    pub leader_role_bonus: f64,
    /// Relationship-boost multiplier for a `helper` performing `help`
    /// (default: 1.2).
    pub helper_role_bonus: f64,
    /// Resources each party loses per `conflict` intensity level (1..=3)
    /// (default: `[5, 10, 20]`).
    pub conflict_resource_loss: [u32; 3],
    /// Relationship penalty per `conflict` intensity point (default: 0.1).
    pub conflict_relationship_penalty: f64,
    /// Ticks between world shocks (default: 20).
    pub shock_interval: u64,
    /// Agents sampled per shock (default: 2).
    pub shock_agent_count: usize,
    /// Inclusive resource-loss range sampled per shocked agent
    /// (default: `2..=10`).
    pub shock_resource_range: (i64, i64),
    /// Inclusive mood-loss range sampled per shocked agent
    /// (default: `0.05..=0.3`).
    pub shock_mood_range: (f64, f64),
    /// Consecutive zero-resource ticks before an agent exits (default: 5).
    pub zero_resource_exit_threshold: u32,
    /// Consecutive low-mood ticks before an agent exits (default: 5).
    pub low_mood_exit_threshold: u32,
    /// Mood below which a tick counts toward `low_mood_exit_threshold`
    /// (default: -0.6).
    pub low_mood_threshold: f64,
}

impl Default for SocietyTunables {
    fn default() -> Self {
        Self {
            work_reward: [5, 10, 18],
            work_role_bonus: 1.5,
            work_min_efficiency: 0.3,
            work_diminishing_start_tick: 100,
            work_diminishing_rate: 0.001,
            consume_indulgence_threshold: 0.5,
            consume_indulgence_cost_multiplier: 1.5,
            consume_mood_boost: 0.1,
            consume_fail_mood_penalty: -0.05,
            conflict_escalation_threshold: -0.5,
            conflict_escalation_probability: 0.2,
            talk_friendly_boost: 0.05,
            talk_hostile_penalty: 0.08,
            talk_neutral_boost: 0.02,
            leader_role_bonus: 1.3,
            helper_role_bonus: 1.2,
            conflict_resource_loss: [5, 10, 20],
            conflict_relationship_penalty: 0.1,
            shock_interval: 20,
            shock_agent_count: 2,
            shock_resource_range: (2, 10),
            shock_mood_range: (0.05, 0.3),
            zero_resource_exit_threshold: 5,
            low_mood_exit_threshold: 5,
            low_mood_threshold: -0.6,
        }
    }
}

/// Tunables for the Debate world kind.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DebateTunables {
    /// Idle rounds (scaled by intervention level) before the moderator
    /// intervenes (default: 3).
    pub cold_threshold: u32,
    /// Warn (never enforce) once an agent's speech share exceeds this
    /// fraction of the debate's total speeches (default: 0.5).
    pub max_speak_ratio: f64,
}

impl Default for DebateTunables {
    fn default() -> Self {
        Self {
            cold_threshold: 3,
            max_speak_ratio: 0.5,
        }
    }
}

/// Tunables for the Logic world kind.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogicTunables {
    /// Default round budget for a research session when none is supplied
    /// (default: 50).
    pub default_max_rounds: u32,
}

impl Default for LogicTunables {
    fn default() -> Self {
        Self {
            default_max_rounds: 50,
        }
    }
}

/// Every per-world-kind tunable bundle, grouped so a session manager can
/// load one nested config section and hand each kind its own tunables at
/// engine-construction time without restating the rest per kind.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorldTunables {
    /// Game's tunables (attack damage, heal amount, ...).
    #[serde(default)]
    pub game: GameTunables,
    /// Society's tunables (work reward, shock interval, ...).
    #[serde(default)]
    pub society: SocietyTunables,
    /// Debate's tunables (cold-debate threshold, max speak ratio).
    #[serde(default)]
    pub debate: DebateTunables,
    /// Logic's tunables (default max rounds).
    #[serde(default)]
    pub logic: LogicTunables,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_defaults_match_spec_constants() {
        let tunables = GameTunables::default();
        assert_eq!(tunables.attack_damage, 20);
        assert_eq!(tunables.heal_amount, 15);
    }

    #[test]
    fn society_shock_interval_matches_spec_constant() {
        assert_eq!(SocietyTunables::default().shock_interval, 20);
    }
}
