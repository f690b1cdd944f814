//! Session lifecycle and the per-session tick loop.
//!
//! This crate sits between [`wengine_worlds::AnyEngine`] (the pluggable
//! kernel) and the HTTP/WebSocket surface (`wengine-observer`): it owns the
//! session table, drives each running session's engine on its own
//! background task, and fans out the resulting events.
//!
//! # Modules
//!
//! - [`error`] -- [`error::SessionError`]: 400/404-class interface failures.
//! - [`control`] -- [`control::SessionControl`]: pause/resume/stop signalling.
//! - [`inbox`] -- [`inbox::ActionInbox`]: the pending-action snapshot queue.
//! - [`decision_source`] -- [`decision_source::DecisionSource`]: the
//!   agent-decision boundary a tick driver calls each step.
//! - [`broadcast`] -- [`broadcast::BroadcastHub`]: the per-session fan-out
//!   boundary.
//! - [`driver`] -- [`driver::TickDriver`]: the per-session tick loop.
//! - [`live_state`] -- [`live_state::LiveState`]: the read-only world-state
//!   snapshot a running session publishes for the manager to read.
//! - [`manager`] -- [`manager::SessionManager`]: the session table.
//! - [`config`] -- [`config::EngineConfig`]: backend selection and
//!   per-kind tunables, loaded from YAML.

pub mod broadcast;
pub mod config;
pub mod control;
pub mod decision_source;
pub mod driver;
pub mod error;
pub mod inbox;
pub mod live_state;
pub mod manager;

pub use broadcast::{BroadcastHub, SessionMessage};
pub use decision_source::{DecisionSource, NullDecisionSource};
pub use error::SessionError;
pub use live_state::LiveState;
pub use manager::SessionManager;
