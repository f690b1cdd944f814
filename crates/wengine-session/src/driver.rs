//! The per-session tick loop.
//!
//! A wait/collect/step/publish/sleep cycle, one driver per session,
//! operating on an [`AnyEngine`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};
use wengine_eventlog::EventLogStore;
use wengine_types::SessionId;
use wengine_worlds::AnyEngine;

use crate::broadcast::{BroadcastHub, SessionMessage};
use crate::control::SessionControl;
use crate::decision_source::DecisionSource;
use crate::inbox::ActionInbox;
use crate::live_state::LiveState;

/// Why a [`TickDriver`] stopped running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEndReason {
    /// The scheduler decided the world is over.
    Terminated,
    /// `SessionManager::end` (or a process shutdown) requested a stop.
    Stopped,
    /// An event log append failed; fatal for the session.
    LogAppendFailed,
}

/// Drives one session's engine: waits for its tick interval, collects
/// pending actions, steps the engine, and publishes the results.
pub struct TickDriver {
    session_id: SessionId,
    engine: AnyEngine,
    event_log: Arc<dyn EventLogStore>,
    broadcast: Arc<BroadcastHub>,
    control: Arc<SessionControl>,
    inbox: Arc<ActionInbox>,
    decisions: Arc<dyn DecisionSource>,
    live_state: Arc<LiveState>,
}

impl TickDriver {
    /// Build a new driver for `session_id`, owning `engine` exclusively.
    #[must_use]
    pub fn new(
        session_id: SessionId,
        engine: AnyEngine,
        event_log: Arc<dyn EventLogStore>,
        broadcast: Arc<BroadcastHub>,
        control: Arc<SessionControl>,
        inbox: Arc<ActionInbox>,
        decisions: Arc<dyn DecisionSource>,
        live_state: Arc<LiveState>,
    ) -> Self {
        Self {
            session_id,
            engine,
            event_log,
            broadcast,
            control,
            inbox,
            decisions,
            live_state,
        }
    }

    /// Run the tick loop until the world terminates, a stop is requested,
    /// or a log append fails.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn run(mut self) -> DriverEndReason {
        loop {
            self.control.wait_if_paused().await;
            if self.control.is_stop_requested() {
                return self.finish(DriverEndReason::Stopped).await;
            }

            tokio::time::sleep(Duration::from_millis(self.control.tick_interval_ms())).await;

            if self.control.is_stop_requested() {
                return self.finish(DriverEndReason::Stopped).await;
            }

            let mut actions = self.inbox.drain().await;
            let eligible_agents = eligible_agents(&self.engine);
            actions.extend(
                self.decisions
                    .collect_actions(self.session_id, &eligible_agents)
                    .await,
            );

            match self.engine.step(actions).await {
                Ok(results) => {
                    for result in &results {
                        for event in &result.events {
                            self.broadcast.publish(
                                self.session_id,
                                SessionMessage::WorldEvent {
                                    session_id: self.session_id,
                                    event: event.clone(),
                                },
                            );
                        }
                    }
                    let state = self.engine.state_json();
                    self.live_state.set(state.clone()).await;
                    self.broadcast.publish(
                        self.session_id,
                        SessionMessage::StateUpdate {
                            session_id: self.session_id,
                            state,
                        },
                    );
                    if self.engine.is_terminated() {
                        return self.finish(DriverEndReason::Terminated).await;
                    }
                }
                Err(error) => {
                    warn!(%error, "event log append failed, session entering failed state");
                    return self.finish(DriverEndReason::LogAppendFailed).await;
                }
            }
        }
    }

    async fn finish(self, reason: DriverEndReason) -> DriverEndReason {
        let reason_text = match &reason {
            DriverEndReason::Terminated => self.engine.termination_reason(),
            DriverEndReason::Stopped => Some(String::from("stopped")),
            DriverEndReason::LogAppendFailed => Some(String::from("log_append_failed")),
        };
        self.broadcast.publish(
            self.session_id,
            SessionMessage::SimulationEnded {
                session_id: self.session_id,
                reason: reason_text,
            },
        );
        info!(?reason, "tick driver stopped");
        reason
    }
}

/// The agents a decision source should be queried for this step.
///
/// Every registered agent is eligible; the kernel itself (via each kind's
/// `Arbiter::handle_idle`) tolerates agents that propose nothing.
fn eligible_agents(engine: &AnyEngine) -> Vec<wengine_types::EntityId> {
    let state = engine.state_json();
    let Some(entities) = state.get("entities").and_then(serde_json::Value::as_object) else {
        return Vec::new();
    };
    entities
        .keys()
        .filter_map(|key| uuid::Uuid::parse_str(key).ok())
        .map(wengine_types::EntityId::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wengine_eventlog::MemoryEventLogStore;
    use wengine_types::{CreateSessionParams, SessionId, WorldKind};

    use super::{DriverEndReason, TickDriver};
    use crate::broadcast::BroadcastHub;
    use crate::control::SessionControl;
    use crate::decision_source::NullDecisionSource;
    use crate::inbox::ActionInbox;
    use crate::live_state::LiveState;

    fn game_params() -> CreateSessionParams {
        let a = wengine_types::EntityId::new();
        let b = wengine_types::EntityId::new();
        CreateSessionParams {
            world_kind: WorldKind::Game,
            created_by: String::from("user-1"),
            title: String::from("duel"),
            init_params: serde_json::json!({ "agentIds": [a.to_string(), b.to_string()] }),
            max_rounds: Some(1),
            llm_config: None,
        }
    }

    #[tokio::test]
    async fn driver_stops_immediately_when_stop_is_requested_up_front() {
        let session_id = SessionId::new();
        let event_log = Arc::new(MemoryEventLogStore::new());
        let engine = wengine_worlds::AnyEngine::create(
            session_id,
            &game_params(),
            event_log.clone(),
            &wengine_worlds::config::WorldTunables::default(),
        )
        .expect("valid params");
        let control = Arc::new(SessionControl::new(1));
        control.request_stop();

        let driver = TickDriver::new(
            session_id,
            engine,
            event_log,
            Arc::new(BroadcastHub::new()),
            control,
            Arc::new(ActionInbox::new()),
            Arc::new(NullDecisionSource::new()),
            Arc::new(LiveState::new()),
        );

        let reason = driver.run().await;
        assert_eq!(reason, DriverEndReason::Stopped);
    }
}
