//! The boundary between a [`crate::driver::TickDriver`] and whatever
//! decides what each agent does this step (an LLM provider, a scripted
//! test harness, a human operator).
//!
//! A narrow, swappable contract the driver calls once per step, plus a
//! stub implementation that lets the tick cycle be exercised before any
//! real provider is wired in.

use async_trait::async_trait;
use wengine_types::{Action, EntityId, SessionId};

/// A source of proposed actions for one step.
///
/// Implementations are expected to be cheap to hold as
/// `Arc<dyn DecisionSource>` and safe to call concurrently across
/// sessions. A per-agent failure is not reported as an error here -- it
/// simply contributes no action for that agent, which the engine treats
/// as idle for the step.
#[async_trait]
pub trait DecisionSource: Send + Sync {
    /// Collect whatever actions `eligible_agents` want to take this step.
    ///
    /// Returning fewer actions than `eligible_agents.len()` is normal: an
    /// agent with no action this step is simply idle.
    async fn collect_actions(
        &self,
        session_id: SessionId,
        eligible_agents: &[EntityId],
    ) -> Vec<Action>;
}

/// A [`DecisionSource`] that never proposes an action.
///
/// Lets a session run end-to-end (scheduler-driven termination, phase
/// advancement, idle handling) before a real agent/LLM runner exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDecisionSource;

impl NullDecisionSource {
    /// Build a new null decision source.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DecisionSource for NullDecisionSource {
    async fn collect_actions(
        &self,
        _session_id: SessionId,
        _eligible_agents: &[EntityId],
    ) -> Vec<Action> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use wengine_types::SessionId;

    use super::{DecisionSource, NullDecisionSource};

    #[tokio::test]
    async fn null_decision_source_never_proposes_actions() {
        let source = NullDecisionSource::new();
        let actions = source.collect_actions(SessionId::new(), &[]).await;
        assert!(actions.is_empty());
    }
}
