//! The four concrete world kinds -- Debate, Game, Society, Logic -- each
//! implementing `wengine_kernel`'s `RuleEngine`/`Arbiter`/`Scheduler`
//! contracts over its own state shape, plus [`kind::AnyEngine`] unifying
//! them behind one type.
//!
//! # Modules
//!
//! - [`config`] -- per-kind tunable constants (`GameTunables`,
//!   `SocietyTunables`, `DebateTunables`, `LogicTunables`).
//! - [`error`] -- [`error::RuleError`]: session-creation-time failures.
//! - [`rng`] -- [`rng::WorldRng`]: a seedable source for Game and Society.
//! - [`game`] -- turn-based card combat.
//! - [`society`] -- tick-driven social simulation.
//! - [`debate`] -- structured argumentation.
//! - [`logic`] -- collaborative formal derivation.
//! - [`kind`] -- [`kind::AnyEngine`]: the four kinds as one sum type.

pub mod config;
pub mod debate;
pub mod error;
pub mod game;
pub mod kind;
pub mod logic;
pub mod rng;
pub mod society;

pub use error::RuleError;
pub use kind::AnyEngine;
pub use rng::WorldRng;
