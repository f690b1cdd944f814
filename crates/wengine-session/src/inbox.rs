//! The pending action queue a session's callers (`submit_actions` over
//! HTTP/WS) write into between ticks.
//!
//! Per Open Question (iv) in `DESIGN.md`, the [`crate::driver::TickDriver`]
//! snapshots whatever is queued the moment it fires `step` -- actions
//! that arrive after the snapshot is taken stay queued for the next step.
//! No caller blocks waiting for a "complete" action set.

use tokio::sync::Mutex;
use wengine_types::Action;

/// A per-session FIFO of actions awaiting the next `step`.
#[derive(Debug, Default)]
pub struct ActionInbox {
    pending: Mutex<Vec<Action>>,
}

impl ActionInbox {
    /// Build an empty inbox.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Queue actions for the next step.
    pub async fn submit(&self, actions: impl IntoIterator<Item = Action>) {
        self.pending.lock().await.extend(actions);
    }

    /// Take every action queued so far, leaving the inbox empty.
    pub async fn drain(&self) -> Vec<Action> {
        std::mem::take(&mut *self.pending.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use wengine_types::{Action, ActionId, EntityId};

    use super::ActionInbox;

    fn sample_action() -> Action {
        Action {
            action_id: ActionId::new(),
            agent_id: EntityId::new(),
            action_type: String::from("speak"),
            params: serde_json::json!({}),
            confidence: 1.0,
            timestamp: Utc::now(),
            target: None,
            priority: None,
        }
    }

    #[tokio::test]
    async fn drain_returns_submitted_actions_and_empties_the_inbox() {
        let inbox = ActionInbox::new();
        inbox.submit(vec![sample_action(), sample_action()]).await;
        let drained = inbox.drain().await;
        assert_eq!(drained.len(), 2);
        assert!(inbox.drain().await.is_empty());
    }

    #[tokio::test]
    async fn submissions_after_a_drain_are_kept_for_the_next_one() {
        let inbox = ActionInbox::new();
        inbox.submit(vec![sample_action()]).await;
        let _ = inbox.drain().await;
        inbox.submit(vec![sample_action()]).await;
        assert_eq!(inbox.drain().await.len(), 1);
    }
}
