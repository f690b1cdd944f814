//! Axum router construction for the observer API.
//!
//! Assembles the session/event REST routes under `/api/isolation` plus the
//! `/world-engine` `WebSocket` endpoint into one [`Router`], with CORS and
//! tracing middleware layered on top.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the observer server.
///
/// CORS is configured to allow any origin; restricting this to known
/// dashboard origins is a deployment-time concern outside this crate.
#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/isolation/sessions",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route(
            "/api/isolation/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route(
            "/api/isolation/sessions/{id}/start",
            post(handlers::start_session),
        )
        .route(
            "/api/isolation/sessions/{id}/pause",
            post(handlers::pause_session),
        )
        .route(
            "/api/isolation/sessions/{id}/resume",
            post(handlers::resume_session),
        )
        .route(
            "/api/isolation/sessions/{id}/end",
            post(handlers::end_session),
        )
        .route(
            "/api/isolation/sessions/{id}/actions",
            post(handlers::submit_actions),
        )
        .route(
            "/api/isolation/events/{session_id}",
            get(handlers::list_events),
        )
        .route(
            "/api/isolation/events/{session_id}/after/{sequence}",
            get(handlers::list_events_after),
        )
        .route(
            "/api/isolation/events/{session_id}/agent-view",
            get(handlers::list_events_agent_view),
        )
        .route("/world-engine", get(ws::world_engine_ws))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
