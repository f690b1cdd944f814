//! `WebSocket` handler for the `/world-engine` namespace.
//!
//! Client RPCs arrive as `{"id", "rpc", "payload"}` envelopes and are
//! answered with a matching `{"id", "success", "data"|"error"}` ack.
//! Server pushes ride the same socket unprompted, forwarding whatever
//! [`wengine_session::SessionMessage`] the joined session's broadcast
//! channel produces. A single `tokio::select!` loop races the broadcast
//! receiver against the client socket, with one session subscription per
//! socket (join/leave) layered under a request/ack protocol.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::{debug, warn};
use uuid::Uuid;
use wengine_types::{Action, CreateSessionParams, SessionId};

use crate::handlers::CreateSessionRequest;
use crate::state::AppState;

/// One client request, with an id the caller uses to match the ack.
#[derive(Debug, Deserialize)]
struct ClientRpc {
    id: String,
    rpc: String,
    #[serde(default)]
    payload: Json,
}

/// The ack a client RPC receives back.
#[derive(Debug, Serialize)]
struct RpcAck {
    #[serde(rename = "type")]
    kind: &'static str,
    id: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl RpcAck {
    fn ok(id: String, data: Json) -> Self {
        Self {
            kind: "ack",
            id,
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(id: String, error: impl ToString) -> Self {
        Self {
            kind: "ack",
            id,
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

/// Upgrade an HTTP request to a `WebSocket` connection on the
/// `/world-engine` namespace.
pub async fn world_engine_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("world-engine client connected");
    let mut joined: Option<(SessionId, tokio::sync::broadcast::Receiver<wengine_session::SessionMessage>)> =
        None;

    loop {
        let push = async {
            match &mut joined {
                Some((_, rx)) => Some(rx.recv().await),
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            result = push => {
                match result {
                    Some(Ok(message)) => {
                        if !forward(&mut socket, &message).await {
                            return;
                        }
                    }
                    Some(Err(tokio::sync::broadcast::error::RecvError::Lagged(n))) => {
                        debug!(skipped = n, "world-engine client lagged, skipping ahead");
                    }
                    Some(Err(tokio::sync::broadcast::error::RecvError::Closed)) | None => {
                        joined = None;
                    }
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_rpc(&mut socket, &state, &mut joined, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("world-engine client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(error)) => {
                        debug!(%error, "world-engine socket error");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}

async fn forward(socket: &mut WebSocket, message: &wengine_session::SessionMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(text) => socket.send(Message::Text(text.into())).await.is_ok(),
        Err(error) => {
            warn!(%error, "failed to serialize session message");
            true
        }
    }
}

async fn handle_rpc(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    joined: &mut Option<(SessionId, tokio::sync::broadcast::Receiver<wengine_session::SessionMessage>)>,
    text: &str,
) {
    let request: ClientRpc = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(error) => {
            warn!(%error, "malformed world-engine rpc");
            return;
        }
    };

    let ack = match request.rpc.as_str() {
        "create_session" => create_session_rpc(state, request.id, request.payload).await,
        "join_session" => join_session_rpc(state, joined, request.id, &request.payload),
        "submit_actions" => submit_actions_rpc(state, request.id, &request.payload).await,
        "start_auto_simulation" => start_auto_simulation_rpc(state, request.id, &request.payload).await,
        "get_events" => get_events_rpc(state, request.id, &request.payload).await,
        other => RpcAck::err(request.id, format!("unknown rpc \"{other}\"")),
    };

    if let Ok(text) = serde_json::to_string(&ack) {
        let _unused = socket.send(Message::Text(text.into())).await;
    }
}

fn session_id_from(payload: &Json) -> Result<SessionId, String> {
    payload
        .get("sessionId")
        .and_then(Json::as_str)
        .ok_or_else(|| String::from("missing sessionId"))
        .and_then(|raw| {
            raw.parse::<Uuid>()
                .map(SessionId::from)
                .map_err(|error| format!("invalid sessionId: {error}"))
        })
}

async fn create_session_rpc(state: &Arc<AppState>, id: String, payload: Json) -> RpcAck {
    let request: CreateSessionRequest = match serde_json::from_value(payload) {
        Ok(request) => request,
        Err(error) => return RpcAck::err(id, error),
    };
    let params: CreateSessionParams = request.into();
    match state.manager.create(&params) {
        Ok(session) => RpcAck::ok(id, serde_json::json!(session)),
        Err(error) => RpcAck::err(id, error),
    }
}

fn join_session_rpc(
    state: &Arc<AppState>,
    joined: &mut Option<(SessionId, tokio::sync::broadcast::Receiver<wengine_session::SessionMessage>)>,
    id: String,
    payload: &Json,
) -> RpcAck {
    let session_id = match session_id_from(payload) {
        Ok(session_id) => session_id,
        Err(error) => return RpcAck::err(id, error),
    };
    if !state.manager.contains(session_id) {
        return RpcAck::err(id, format!("no session {session_id}"));
    }
    let receiver = state.manager.broadcast().subscribe(session_id);
    *joined = Some((session_id, receiver));
    RpcAck::ok(id, serde_json::json!({ "sessionId": session_id }))
}

async fn submit_actions_rpc(state: &Arc<AppState>, id: String, payload: &Json) -> RpcAck {
    let session_id = match session_id_from(payload) {
        Ok(session_id) => session_id,
        Err(error) => return RpcAck::err(id, error),
    };
    let actions: Vec<Action> = match payload
        .get("actions")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
    {
        Ok(actions) => actions.unwrap_or_default(),
        Err(error) => return RpcAck::err(id, error),
    };
    match state.manager.submit_actions(session_id, actions).await {
        Ok(()) => RpcAck::ok(id, serde_json::json!({})),
        Err(error) => RpcAck::err(id, error),
    }
}

async fn start_auto_simulation_rpc(state: &Arc<AppState>, id: String, payload: &Json) -> RpcAck {
    let session_id = match session_id_from(payload) {
        Ok(session_id) => session_id,
        Err(error) => return RpcAck::err(id, error),
    };
    match state.manager.start(session_id) {
        Ok(()) => RpcAck::ok(id, serde_json::json!({})),
        Err(error) => RpcAck::err(id, error),
    }
}

async fn get_events_rpc(state: &Arc<AppState>, id: String, payload: &Json) -> RpcAck {
    let session_id = match session_id_from(payload) {
        Ok(session_id) => session_id,
        Err(error) => return RpcAck::err(id, error),
    };
    let limit = payload
        .get("limit")
        .and_then(Json::as_u64)
        .and_then(|limit| usize::try_from(limit).ok())
        .unwrap_or(100)
        .clamp(1, 100);
    match state.manager.event_log().get_recent(session_id, limit).await {
        Ok(events) => RpcAck::ok(id, serde_json::json!(events)),
        Err(error) => RpcAck::err(id, error),
    }
}
