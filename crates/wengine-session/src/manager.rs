//! [`SessionManager`]: the top-level session table.
//!
//! A `dashmap::DashMap` keyed by session id gives lock-free concurrent
//! lookups across HTTP handlers and tick-driver tasks.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{info, instrument};
use wengine_eventlog::EventLogStore;
use wengine_types::{CreateSessionParams, Session, SessionId, SessionStatus};
use wengine_worlds::config::WorldTunables;
use wengine_worlds::AnyEngine;

use crate::broadcast::BroadcastHub;
use crate::control::SessionControl;
use crate::decision_source::DecisionSource;
use crate::driver::TickDriver;
use crate::error::SessionError;
use crate::inbox::ActionInbox;
use crate::live_state::LiveState;

/// The default tick interval used when a session's world kind doesn't
/// specify one (500ms default for Society; the other kinds are
/// event-driven in spirit but still polled at this interval to check for
/// newly submitted actions).
const DEFAULT_TICK_INTERVAL_MS: u64 = 500;

/// Everything the manager holds for one live session: its summary record,
/// its engine (while not running), and the handles a running driver needs.
struct SessionHandle {
    session: Session,
    engine: Option<AnyEngine>,
    control: Arc<SessionControl>,
    inbox: Arc<ActionInbox>,
    live_state: Arc<LiveState>,
    driver_task: Option<JoinHandle<()>>,
}

/// Maintains `sessionId -> {config, state, engine}` and enforces the
/// `Pending -> Running -> Paused/Ended/Failed` status transitions.
pub struct SessionManager {
    sessions: DashMap<SessionId, SessionHandle>,
    event_log: Arc<dyn EventLogStore>,
    broadcast: Arc<BroadcastHub>,
    decisions: Arc<dyn DecisionSource>,
    tunables: WorldTunables,
}

impl SessionManager {
    /// Build a new, empty session manager over the given event log
    /// backend and decision source, using each world kind's default
    /// tunables.
    #[must_use]
    pub fn new(event_log: Arc<dyn EventLogStore>, decisions: Arc<dyn DecisionSource>) -> Self {
        Self::with_tunables(event_log, decisions, WorldTunables::default())
    }

    /// Build a new, empty session manager with explicit per-world-kind
    /// tunables, applied to every session this manager creates.
    #[must_use]
    pub fn with_tunables(
        event_log: Arc<dyn EventLogStore>,
        decisions: Arc<dyn DecisionSource>,
        tunables: WorldTunables,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            event_log,
            broadcast: Arc::new(BroadcastHub::new()),
            decisions,
            tunables,
        }
    }

    /// The broadcast hub subscribers should use to observe session
    /// activity.
    #[must_use]
    pub fn broadcast(&self) -> Arc<BroadcastHub> {
        Arc::clone(&self.broadcast)
    }

    /// The event log backing every session in this table.
    #[must_use]
    pub fn event_log(&self) -> Arc<dyn EventLogStore> {
        Arc::clone(&self.event_log)
    }

    /// Whether a session with this id is currently in the table.
    #[must_use]
    pub fn contains(&self, session_id: SessionId) -> bool {
        self.sessions.contains_key(&session_id)
    }

    /// Validate `params`, instantiate the requested world kind's engine,
    /// and record the session as `Pending`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidParams`] if `params` don't build a
    /// valid engine for the requested world kind.
    #[instrument(skip(self, params), fields(world_kind = ?params.world_kind))]
    pub fn create(&self, params: &CreateSessionParams) -> Result<Session, SessionError> {
        let session_id = SessionId::new();
        let engine = AnyEngine::create(
            session_id,
            params,
            Arc::clone(&self.event_log),
            &self.tunables,
        )?;
        let session = Session::new(session_id, params);
        self.sessions.insert(
            session_id,
            SessionHandle {
                session: session.clone(),
                engine: Some(engine),
                control: Arc::new(SessionControl::new(DEFAULT_TICK_INTERVAL_MS)),
                inbox: Arc::new(ActionInbox::new()),
                live_state: Arc::new(LiveState::new()),
                driver_task: None,
            },
        );
        info!(%session_id, "session created");
        Ok(session)
    }

    /// `Pending -> Running`: spawn a [`TickDriver`] for this session.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] if no such session exists;
    /// [`SessionError::InvalidTransition`] if it isn't `Pending`.
    pub fn start(&self, session_id: SessionId) -> Result<(), SessionError> {
        let mut handle = self
            .sessions
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound { session_id })?;
        if handle.session.status != SessionStatus::Pending {
            return Err(SessionError::InvalidTransition {
                session_id,
                current: handle.session.status,
                attempted: "start",
            });
        }
        let engine = handle
            .engine
            .take()
            .ok_or(SessionError::NotFound { session_id })?;

        let driver = TickDriver::new(
            session_id,
            engine,
            Arc::clone(&self.event_log),
            Arc::clone(&self.broadcast),
            Arc::clone(&handle.control),
            Arc::clone(&handle.inbox),
            Arc::clone(&self.decisions),
            Arc::clone(&handle.live_state),
        );
        handle.driver_task = Some(tokio::spawn(async move {
            let _end_reason = driver.run().await;
        }));
        handle.session.status = SessionStatus::Running;
        handle.session.started_at = Some(chrono::Utc::now());
        info!(%session_id, "session started");
        Ok(())
    }

    /// `Running -> Paused`.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] if no such session exists;
    /// [`SessionError::InvalidTransition`] if it isn't `Running`.
    pub fn pause(&self, session_id: SessionId) -> Result<(), SessionError> {
        let mut handle = self
            .sessions
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound { session_id })?;
        if handle.session.status != SessionStatus::Running {
            return Err(SessionError::InvalidTransition {
                session_id,
                current: handle.session.status,
                attempted: "pause",
            });
        }
        handle.control.pause();
        handle.session.status = SessionStatus::Paused;
        Ok(())
    }

    /// `Paused -> Running`.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] if no such session exists;
    /// [`SessionError::InvalidTransition`] if it isn't `Paused`.
    pub fn resume(&self, session_id: SessionId) -> Result<(), SessionError> {
        let mut handle = self
            .sessions
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound { session_id })?;
        if handle.session.status != SessionStatus::Paused {
            return Err(SessionError::InvalidTransition {
                session_id,
                current: handle.session.status,
                attempted: "resume",
            });
        }
        handle.control.resume();
        handle.session.status = SessionStatus::Running;
        Ok(())
    }

    /// Any non-terminal status `-> Ended`: stop the driver and mark the
    /// session terminal. Idempotent: ending an already-ended session is a
    /// no-op success, not an error.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] if no such session exists.
    pub fn end(&self, session_id: SessionId) -> Result<(), SessionError> {
        let mut handle = self
            .sessions
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound { session_id })?;
        if handle.session.is_terminal() {
            return Ok(());
        }
        handle.control.request_stop();
        handle.control.resume();
        // The driver observes the stop request and exits on its own; we
        // don't wait for it here, but drop our handle so the task isn't
        // held alive by this struct after the session is gone.
        drop(handle.driver_task.take());
        handle.session.status = SessionStatus::Ended;
        handle.session.ended_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// Remove a non-running session from the table. The event log is left
    /// in place; callers that want it pruned call
    /// [`wengine_eventlog::EventLogStore::clear`] separately.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] if no such session exists;
    /// [`SessionError::InvalidTransition`] if it is `Running`.
    pub fn delete(&self, session_id: SessionId) -> Result<(), SessionError> {
        let status = self
            .sessions
            .get(&session_id)
            .ok_or(SessionError::NotFound { session_id })?
            .session
            .status;
        if status == SessionStatus::Running {
            return Err(SessionError::InvalidTransition {
                session_id,
                current: status,
                attempted: "delete",
            });
        }
        self.sessions.remove(&session_id);
        self.broadcast.remove(session_id);
        Ok(())
    }

    /// Fetch a session's summary record, with `current_round` refreshed
    /// from its [`LiveState`] snapshot if it has ever stepped.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] if no such session exists.
    pub async fn get(&self, session_id: SessionId) -> Result<Session, SessionError> {
        let (mut session, live_state) = {
            let handle = self
                .sessions
                .get(&session_id)
                .ok_or(SessionError::NotFound { session_id })?;
            (handle.session.clone(), Arc::clone(&handle.live_state))
        };
        session.current_round = live_state.current_round().await;
        Ok(session)
    }

    /// Fetch a session's latest published world-state snapshot, or
    /// [`serde_json::Value::Null`] if it hasn't stepped yet.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] if no such session exists.
    pub async fn get_state(
        &self,
        session_id: SessionId,
    ) -> Result<serde_json::Value, SessionError> {
        let live_state = {
            let handle = self
                .sessions
                .get(&session_id)
                .ok_or(SessionError::NotFound { session_id })?;
            Arc::clone(&handle.live_state)
        };
        Ok(live_state.get().await.unwrap_or(serde_json::Value::Null))
    }

    /// Every session created by `user_id`, most-recently-created first.
    #[must_use]
    pub fn list_by_user(&self, user_id: &str) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| entry.session.created_by == user_id)
            .map(|entry| entry.session.clone())
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions
    }

    /// Every session in the table, regardless of owner.
    #[must_use]
    pub fn list_all(&self) -> Vec<Session> {
        self.sessions
            .iter()
            .map(|entry| entry.session.clone())
            .collect()
    }

    /// Submit actions for a running session's next step.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] if no such session exists.
    pub async fn submit_actions(
        &self,
        session_id: SessionId,
        actions: Vec<wengine_types::Action>,
    ) -> Result<(), SessionError> {
        let inbox = {
            let handle = self
                .sessions
                .get(&session_id)
                .ok_or(SessionError::NotFound { session_id })?;
            Arc::clone(&handle.inbox)
        };
        inbox.submit(actions).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wengine_eventlog::MemoryEventLogStore;
    use wengine_types::{CreateSessionParams, SessionStatus, WorldKind};

    use super::SessionManager;
    use crate::decision_source::NullDecisionSource;

    fn manager() -> SessionManager {
        SessionManager::new(
            Arc::new(MemoryEventLogStore::new()),
            Arc::new(NullDecisionSource::new()),
        )
    }

    fn game_params() -> CreateSessionParams {
        let a = wengine_types::EntityId::new();
        let b = wengine_types::EntityId::new();
        CreateSessionParams {
            world_kind: WorldKind::Game,
            created_by: String::from("user-1"),
            title: String::from("duel"),
            init_params: serde_json::json!({ "agentIds": [a.to_string(), b.to_string()] }),
            max_rounds: Some(20),
            llm_config: None,
        }
    }

    #[tokio::test]
    async fn create_records_a_pending_session() {
        let manager = manager();
        let session = manager.create(&game_params()).expect("valid params");
        assert_eq!(session.status, SessionStatus::Pending);
        let fetched = manager
            .get(session.session_id)
            .await
            .expect("session exists");
        assert_eq!(fetched.session_id, session.session_id);
    }

    #[test]
    fn starting_an_already_running_session_is_rejected() {
        let manager = manager();
        let session = manager.create(&game_params()).expect("valid params");
        manager.start(session.session_id).expect("first start");
        let result = manager.start(session.session_id);
        assert!(result.is_err());
    }

    #[test]
    fn ending_an_ended_session_is_a_no_op() {
        let manager = manager();
        let session = manager.create(&game_params()).expect("valid params");
        manager.end(session.session_id).expect("first end");
        manager.end(session.session_id).expect("second end is a no-op");
    }

    #[test]
    fn deleting_a_running_session_is_rejected() {
        let manager = manager();
        let session = manager.create(&game_params()).expect("valid params");
        manager.start(session.session_id).expect("start");
        let result = manager.delete(session.session_id);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unknown_session_id_is_not_found() {
        let manager = manager();
        let result = manager.get(wengine_types::SessionId::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn get_state_is_null_before_the_first_step() {
        let manager = manager();
        let session = manager.create(&game_params()).expect("valid params");
        let state = manager
            .get_state(session.session_id)
            .await
            .expect("session exists");
        assert_eq!(state, serde_json::Value::Null);
    }

    #[test]
    fn list_by_user_filters_and_orders_by_recency() {
        let manager = manager();
        let mut first_params = game_params();
        first_params.created_by = String::from("alice");
        let mut second_params = game_params();
        second_params.created_by = String::from("alice");
        let mut other_params = game_params();
        other_params.created_by = String::from("bob");

        manager.create(&first_params).expect("first session");
        manager.create(&second_params).expect("second session");
        manager.create(&other_params).expect("third session");

        let alice_sessions = manager.list_by_user("alice");
        assert_eq!(alice_sessions.len(), 2);
        assert!(alice_sessions.iter().all(|s| s.created_by == "alice"));
    }
}
