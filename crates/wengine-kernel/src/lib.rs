//! The generic `WorldEngine` step loop and the contracts every world kind
//! implements to plug into it.
//!
//! # Modules
//!
//! - [`traits`] -- [`traits::RuleEngine`], [`traits::Arbiter`],
//!   [`traits::Scheduler`], and [`traits::Narrator`]: the four pluggable
//!   contracts.
//! - [`engine`] -- [`engine::Engine`]: the step loop itself, written once
//!   and shared by Debate, Game, Society, and Logic.
//! - [`error`] -- [`error::KernelError`]: engine-contract-level failures.

pub mod engine;
pub mod error;
pub mod traits;

pub use engine::Engine;
pub use error::KernelError;
pub use traits::{
    Arbiter, Narrator, NarratorError, NarratorRequest, NullNarrator, PhaseConfig, RuleEngine,
    Scheduler, ValidationOutcome, WorldStateExt,
};
