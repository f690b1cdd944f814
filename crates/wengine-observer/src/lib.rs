//! HTTP and `WebSocket` surface for the world engine.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **REST endpoints** under `/api/isolation` for session lifecycle
//!   (create, start, pause, resume, end, delete) and event-log queries.
//! - **`WebSocket` endpoint** (`/world-engine`) for the client-RPC /
//!   server-push protocol: `create_session`, `join_session`,
//!   `submit_actions`, `start_auto_simulation`, and `get_events` RPCs,
//!   answered by acks, plus unprompted `world_event`/`state_update`/
//!   `simulation_ended` pushes forwarded from the joined session's
//!   broadcast channel.
//!
//! # Architecture
//!
//! [`state::AppState`] wraps the single [`wengine_session::SessionManager`]
//! this process hosts. Handlers never hold their own state; they read
//! and mutate sessions exclusively through the manager, which owns the
//! session table, the broadcast hub, and the event log.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

pub use router::build_router;
pub use server::{start_server, ServerConfig, ServerError};
pub use startup::{spawn_observer, StartupError};
pub use state::AppState;
