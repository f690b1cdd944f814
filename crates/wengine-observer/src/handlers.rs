//! REST endpoint handlers for the session and event routes, mounted
//! under `/api/isolation`.
//!
//! Every handler returns `{success, data}` on success and relies on
//! [`crate::error::ObserverError`]'s `IntoResponse` impl for the
//! `{success:false, error}` failure shape. Limits are clamped to `[1,100]`
//! throughout.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value as Json_;
use uuid::Uuid;
use wengine_types::{Action, CreateSessionParams, SessionId, WorldKind};

use crate::error::ObserverError;
use crate::state::AppState;

const MIN_LIMIT: usize = 1;
const MAX_LIMIT: usize = 100;
const DEFAULT_LIMIT: usize = 100;

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(MIN_LIMIT, MAX_LIMIT)
}

fn parse_session_id(raw: &str) -> Result<SessionId, ObserverError> {
    raw.parse::<Uuid>()
        .map(SessionId::from)
        .map_err(|error| ObserverError::InvalidUuid(format!("{raw}: {error}")))
}

fn success(data: Json_) -> Json<Json_> {
    Json(serde_json::json!({ "success": true, "data": data }))
}

// ---------------------------------------------------------------------------
// Session creation
// ---------------------------------------------------------------------------

/// Request body for `POST /sessions`.
///
/// Beyond `{title, topic, scenario, agents, maxRounds?, roundTimeLimit?,
/// llmConfig?}`, two fields the engine contract requires to build a
/// `CreateSessionParams` are accepted as required top-level fields:
/// `worldKind` and `createdBy`. `topic`/`scenario`/`agents`/
/// `roundTimeLimit` are folded into `init_params` unexamined, since each
/// world kind's constructor parses its own shape from that object.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Which world kind to instantiate.
    pub world_kind: WorldKind,
    /// Opaque caller id, never validated here.
    pub created_by: String,
    /// Display title.
    pub title: String,
    /// Debate topic, folded into `init_params.topic`.
    #[serde(default)]
    pub topic: Option<String>,
    /// World-kind-specific scenario payload, folded into
    /// `init_params.scenario`.
    #[serde(default)]
    pub scenario: Option<Json_>,
    /// Seed agent ids, folded into `init_params.agentIds`.
    #[serde(default)]
    pub agents: Option<Json_>,
    /// Optional cap on rounds/ticks before forced termination.
    pub max_rounds: Option<u64>,
    /// Optional per-round time limit, folded into
    /// `init_params.roundTimeLimit`.
    #[serde(default)]
    pub round_time_limit: Option<u64>,
    /// Opaque LLM configuration, passed through unexamined.
    #[serde(default)]
    pub llm_config: Option<Json_>,
}

impl From<CreateSessionRequest> for CreateSessionParams {
    fn from(request: CreateSessionRequest) -> Self {
        let mut init_params = serde_json::Map::new();
        if let Some(topic) = request.topic {
            init_params.insert(String::from("topic"), Json_::String(topic));
        }
        if let Some(scenario) = request.scenario {
            init_params.insert(String::from("scenario"), scenario);
        }
        if let Some(agents) = request.agents {
            init_params.insert(String::from("agentIds"), agents);
        }
        if let Some(round_time_limit) = request.round_time_limit {
            init_params.insert(
                String::from("roundTimeLimit"),
                Json_::from(round_time_limit),
            );
        }
        Self {
            world_kind: request.world_kind,
            created_by: request.created_by,
            title: request.title,
            init_params: Json_::Object(init_params),
            max_rounds: request.max_rounds,
            llm_config: request.llm_config,
        }
    }
}

/// `GET /api/isolation/sessions`
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sessions = state.manager.list_all();
    success(serde_json::json!(sessions))
}

/// `POST /api/isolation/sessions`
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let params: CreateSessionParams = request.into();
    let session = state.manager.create(&params)?;
    Ok(success(serde_json::json!(session)))
}

// ---------------------------------------------------------------------------
// Session detail and lifecycle
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/isolation/sessions/:id`.
#[derive(Debug, serde::Deserialize)]
pub struct SessionDetailQuery {
    /// Maximum number of events to include (default 100, clamped to
    /// `[1,100]`).
    pub limit: Option<usize>,
}

/// `GET /api/isolation/sessions/:id?limit=`
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<SessionDetailQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let session_id = parse_session_id(&id)?;
    let session = state.manager.get(session_id).await?;
    let world_state = state.manager.get_state(session_id).await?;
    let limit = clamp_limit(query.limit);
    let events = state.manager.event_log().get_recent(session_id, limit).await.map_err(|error| {
        ObserverError::InvalidRequest(format!("failed to read event log: {error}"))
    })?;

    Ok(success(serde_json::json!({
        "session": session,
        "state": world_state,
        "events": events,
        "eventCount": events.len(),
    })))
}

/// Request body for `POST /api/isolation/sessions/:id/end`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct EndSessionRequest {
    /// Why the caller is ending the session, for the `simulation_ended`
    /// push.
    #[serde(default)]
    pub reason: Option<String>,
}

/// `POST /api/isolation/sessions/:id/start`
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let session_id = parse_session_id(&id)?;
    state.manager.start(session_id)?;
    Ok(success(serde_json::json!({})))
}

/// `POST /api/isolation/sessions/:id/pause`
pub async fn pause_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let session_id = parse_session_id(&id)?;
    state.manager.pause(session_id)?;
    Ok(success(serde_json::json!({})))
}

/// `POST /api/isolation/sessions/:id/resume`
pub async fn resume_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let session_id = parse_session_id(&id)?;
    state.manager.resume(session_id)?;
    Ok(success(serde_json::json!({})))
}

/// `POST /api/isolation/sessions/:id/end`
///
/// The optional `reason` body field is accepted but isn't surfaced
/// anywhere yet -- `SessionManager::end` records only that the session
/// ended, not why; a future `simulation_ended` reason could be threaded
/// through here.
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<EndSessionRequest>>,
) -> Result<impl IntoResponse, ObserverError> {
    let session_id = parse_session_id(&id)?;
    let _reason = body.map(|Json(request)| request.reason).unwrap_or_default();
    state.manager.end(session_id)?;
    Ok(success(serde_json::json!({})))
}

/// `DELETE /api/isolation/sessions/:id`
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let session_id = parse_session_id(&id)?;
    state.manager.delete(session_id)?;
    Ok(success(serde_json::json!({})))
}

/// `POST /api/isolation/sessions/:id/actions` -- lets a non-WebSocket
/// client submit actions to a running session (the WebSocket
/// `submit_actions` RPC covers the same operation for connected clients).
#[derive(Debug, serde::Deserialize)]
pub struct SubmitActionsRequest {
    /// The actions to queue for the session's next step.
    pub actions: Vec<Action>,
}

/// `POST /api/isolation/sessions/:id/actions`
pub async fn submit_actions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<SubmitActionsRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let session_id = parse_session_id(&id)?;
    state.manager.submit_actions(session_id, request.actions).await?;
    Ok(success(serde_json::json!({})))
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/isolation/events/:sessionId`.
#[derive(Debug, serde::Deserialize)]
pub struct EventsQuery {
    /// Maximum number of events to return (default 100, clamped to
    /// `[1,100]`). Ignored when `type` is set, since
    /// `EventLogStore::get_by_type` returns every matching event.
    pub limit: Option<usize>,
    /// Filter to one event type; when set, `limit` doesn't apply.
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

/// `GET /api/isolation/events/:sessionId?limit=&type=`
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let session_id = parse_session_id(&session_id)?;
    let limit = clamp_limit(query.limit);
    let log = state.manager.event_log();
    let events = if let Some(event_type) = query.event_type {
        log.get_by_type(session_id, &event_type).await
    } else {
        log.get_recent(session_id, limit).await
    }
    .map_err(|error| ObserverError::InvalidRequest(format!("failed to read event log: {error}")))?;

    Ok(success(serde_json::json!(events)))
}

/// Query parameters for `GET /api/isolation/events/:sessionId/after/:sequence`.
#[derive(Debug, serde::Deserialize)]
pub struct EventsAfterQuery {
    /// Maximum number of events to return (default 100, clamped to
    /// `[1,100]`).
    pub limit: Option<usize>,
}

/// `GET /api/isolation/events/:sessionId/after/:sequence?limit=`
pub async fn list_events_after(
    State(state): State<Arc<AppState>>,
    Path((session_id, sequence)): Path<(String, u64)>,
    Query(query): Query<EventsAfterQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let session_id = parse_session_id(&session_id)?;
    let limit = clamp_limit(query.limit);
    let events = state
        .manager
        .event_log()
        .get_after_sequence(session_id, sequence, limit)
        .await
        .map_err(|error| {
            ObserverError::InvalidRequest(format!("failed to read event log: {error}"))
        })?;

    Ok(success(serde_json::json!(events)))
}

/// Query parameters for `GET /api/isolation/events/:sessionId/agent-view`.
///
/// `EventLogStore::get_agent_visible` needs the agent to filter by, so
/// it is accepted here as a required `agentId` query parameter.
#[derive(Debug, serde::Deserialize)]
pub struct AgentViewQuery {
    /// Maximum number of events to return (default 100, clamped to
    /// `[1,100]`).
    pub limit: Option<usize>,
    /// The agent whose visible events to return, as a UUID string.
    pub agent_id: String,
}

/// `GET /api/isolation/events/:sessionId/agent-view?limit=&agentId=`
pub async fn list_events_agent_view(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<AgentViewQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let session_id = parse_session_id(&session_id)?;
    let agent_id = query
        .agent_id
        .parse::<Uuid>()
        .map(wengine_types::EntityId::from)
        .map_err(|error| ObserverError::InvalidUuid(format!("{}: {error}", query.agent_id)))?;
    let limit = clamp_limit(query.limit);
    let events = state
        .manager
        .event_log()
        .get_agent_visible(session_id, agent_id, limit)
        .await
        .map_err(|error| {
            ObserverError::InvalidRequest(format!("failed to read event log: {error}"))
        })?;

    Ok(success(serde_json::json!(events)))
}
