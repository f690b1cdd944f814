//! The generic step loop, written once and shared by
//! every world kind. Per-kind behavior comes entirely from the
//! [`RuleEngine`], [`Arbiter`], and [`Scheduler`] implementations the
//! caller supplies; this module never branches on world kind.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use wengine_eventlog::EventLogStore;
use wengine_types::{Action, ActionId, ActionResult, FailureReason, SessionId, WorldEvent};

use crate::error::KernelError;
use crate::traits::{Arbiter, RuleEngine, Scheduler, WorldStateExt};

/// Drives one world kind's `step` against its rule engine, arbiter, and
/// scheduler, appending every event it produces to an [`EventLogStore`].
pub struct Engine<State, Rules, Arb, Sched> {
    session_id: SessionId,
    state: State,
    rules: Rules,
    arbiter: Arb,
    scheduler: Sched,
    event_log: Arc<dyn EventLogStore>,
}

impl<State, Rules, Arb, Sched> Engine<State, Rules, Arb, Sched>
where
    State: WorldStateExt,
    Rules: RuleEngine<State = State>,
    Arb: Arbiter<State = State>,
    Sched: Scheduler<State = State>,
{
    /// Assemble an engine around an already-initialized world state.
    pub fn new(
        session_id: SessionId,
        state: State,
        rules: Rules,
        arbiter: Arb,
        scheduler: Sched,
        event_log: Arc<dyn EventLogStore>,
    ) -> Self {
        Self {
            session_id,
            state,
            rules,
            arbiter,
            scheduler,
            event_log,
        }
    }

    /// Borrow the current world state.
    pub const fn state(&self) -> &State {
        &self.state
    }

    /// Whether the world has terminated.
    pub fn is_terminated(&self) -> bool {
        self.state.base().is_terminated
    }

    async fn append(&self, event: WorldEvent) -> Result<WorldEvent, KernelError> {
        self.event_log
            .append(self.session_id, event)
            .await
            .map_err(KernelError::from)
    }

    /// The rejection record for an action the arbiter excluded from
    /// `resolved`: appends an `action_rejected` event for Game, drops
    /// silently (returns `None`) for every other kind.
    async fn reject_unresolved(
        &self,
        action: Action,
    ) -> Result<Option<ActionResult>, KernelError> {
        let Some(event) = self.arbiter.rejected_event(&action) else {
            return Ok(None);
        };
        let event = self.append(event).await?;
        Ok(Some(ActionResult::failure(
            action,
            FailureReason::new("rejected_by_arbiter", "rejected by arbiter/turn"),
            vec![event],
        )))
    }

    /// Run one complete step: arbitration, validation+application,
    /// constraint enforcement, phase advancement, and termination check.
    ///
    /// Once the world has terminated, every subsequent call is an
    /// idempotent no-op that returns an empty result set without touching
    /// state or the event log.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::EventLog`] if any event fails to append --
    /// this is fatal for the owning session.
    #[instrument(skip_all, fields(session_id = %self.session_id))]
    pub async fn step(&mut self, actions: Vec<Action>) -> Result<Vec<ActionResult>, KernelError> {
        if self.state.base().is_terminated {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();

        if let Some(start_event) = self.scheduler.step_start_event(&self.state) {
            self.append(start_event).await?;
        }

        let proposed = actions.clone();
        let resolved = self.arbiter.resolve_conflicts(actions, &self.state);
        let resolved_ids: HashSet<ActionId> =
            resolved.iter().map(|action| action.action_id).collect();

        if resolved.is_empty() {
            for event in self.arbiter.handle_idle(&mut self.state) {
                self.append(event).await?;
            }
        }

        for action in proposed {
            if resolved_ids.contains(&action.action_id) {
                continue;
            }
            if let Some(result) = self.reject_unresolved(action).await? {
                results.push(result);
            }
        }

        for action in resolved {
            let validation = self.rules.validate(&action, &self.state);
            if !validation.is_valid {
                let event = self
                    .append(self.rules.rejection_event(&action, &validation.errors))
                    .await?;
                warn!(action_id = %action.action_id, errors = ?validation.errors, "action rejected");
                results.push(ActionResult::failure(
                    action,
                    FailureReason::new("validation_failed", validation.errors.join("; ")),
                    vec![event],
                ));
                continue;
            }

            let mut applied = self.rules.apply(&action, &mut self.state);
            let mut sequenced_events = Vec::with_capacity(applied.events.len());
            for event in applied.events {
                sequenced_events.push(self.append(event).await?);
            }
            applied.events = sequenced_events;
            results.push(applied);
        }

        for event in self.rules.enforce_constraints(&mut self.state) {
            self.append(event).await?;
        }

        if self.scheduler.should_advance_phase(&self.state) {
            for event in self.scheduler.advance(&mut self.state) {
                self.append(event).await?;
            }
        }

        if !self.state.base().is_terminated && self.scheduler.should_terminate(&self.state) {
            let reason = self.scheduler.termination_reason(&self.state);
            let event = self.scheduler.termination_event(&self.state);
            self.append(event).await?;
            let base = self.state.base_mut();
            base.is_terminated = true;
            base.termination_reason = Some(reason);
            info!(session_id = %self.session_id, "world terminated");
        }

        debug!(
            session_id = %self.session_id,
            results = results.len(),
            "step complete"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use wengine_eventlog::{EventLogError, MemoryEventLogStore};
    use wengine_types::{CurrentPhase, CurrentTime, EntityId, WorldKind, WorldState};

    use super::*;
    use crate::traits::{PhaseConfig, ValidationOutcome};

    fn base_state() -> WorldState {
        WorldState {
            world_id: SessionId::new(),
            world_type: WorldKind::Logic,
            current_time: CurrentTime::zero(),
            current_phase: CurrentPhase {
                phase_id: String::from("simulation"),
                phase_type: String::from("simulation"),
                phase_round: 0,
                phase_max_rounds: -1,
                started_at: chrono::Utc::now(),
                phase_rules: serde_json::Value::Null,
            },
            entities: BTreeMap::new(),
            relationships: Vec::new(),
            resources: BTreeMap::new(),
            global_vars: BTreeMap::new(),
            rule_states: BTreeMap::new(),
            is_terminated: false,
            termination_reason: None,
        }
    }

    #[derive(Debug, Clone)]
    struct CounterState {
        base: WorldState,
        counter: u64,
    }

    impl WorldStateExt for CounterState {
        fn base(&self) -> &WorldState {
            &self.base
        }
        fn base_mut(&mut self) -> &mut WorldState {
            &mut self.base
        }
    }

    struct CounterRules;

    impl RuleEngine for CounterRules {
        type State = CounterState;

        fn validate(&self, action: &Action, _state: &Self::State) -> ValidationOutcome {
            if action.action_type == "increment" {
                ValidationOutcome::valid()
            } else {
                ValidationOutcome::invalid("unknown action type")
            }
        }

        fn apply(&mut self, action: &Action, state: &mut Self::State) -> ActionResult {
            state.counter = state.counter.saturating_add(1);
            ActionResult::success(action.clone(), Vec::new(), Vec::new())
        }

        fn enforce_constraints(&mut self, _state: &mut Self::State) -> Vec<WorldEvent> {
            Vec::new()
        }

        fn rejection_event(&self, _action: &Action, errors: &[String]) -> WorldEvent {
            WorldEvent::new("ACTION_REJECTED", "system").with_content(errors.join("; "))
        }
    }

    struct PassThroughArbiter;

    impl Arbiter for PassThroughArbiter {
        type State = CounterState;

        fn resolve_conflicts(&self, actions: Vec<Action>, _state: &Self::State) -> Vec<Action> {
            actions
        }
    }

    struct NeverAdvanceScheduler;

    impl Scheduler for NeverAdvanceScheduler {
        type State = CounterState;

        fn should_advance_phase(&self, _state: &Self::State) -> bool {
            false
        }

        fn next_phase(&self, _current_phase_id: &str) -> Option<PhaseConfig> {
            None
        }

        fn advance(&mut self, _state: &mut Self::State) -> Vec<WorldEvent> {
            Vec::new()
        }

        fn should_terminate(&self, state: &Self::State) -> bool {
            state.counter >= 3
        }

        fn termination_reason(&self, _state: &Self::State) -> String {
            String::from("counter reached limit")
        }

        fn termination_event(&self, _state: &Self::State) -> WorldEvent {
            WorldEvent::new("PROBLEM_END", "system")
        }
    }

    fn action(action_type: &str) -> Action {
        Action {
            action_id: ActionId::new(),
            agent_id: EntityId::new(),
            action_type: action_type.to_string(),
            params: serde_json::json!({}),
            confidence: 1.0,
            timestamp: chrono::Utc::now(),
            target: None,
            priority: None,
        }
    }

    fn make_engine() -> Engine<CounterState, CounterRules, PassThroughArbiter, NeverAdvanceScheduler>
    {
        let store: Arc<dyn EventLogStore> = Arc::new(MemoryEventLogStore::new());
        Engine::new(
            SessionId::new(),
            CounterState {
                base: base_state(),
                counter: 0,
            },
            CounterRules,
            PassThroughArbiter,
            NeverAdvanceScheduler,
            store,
        )
    }

    #[tokio::test]
    async fn valid_action_increments_counter_and_succeeds() {
        let mut engine = make_engine();
        let results = engine
            .step(vec![action("increment")])
            .await
            .expect("step");
        assert_eq!(results.len(), 1);
        assert!(results[0].success);
        assert_eq!(engine.state().counter, 1);
    }

    #[tokio::test]
    async fn invalid_action_produces_rejection_event() {
        let mut engine = make_engine();
        let results = engine.step(vec![action("teleport")]).await.expect("step");
        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert_eq!(results[0].events.len(), 1);
        assert_eq!(results[0].events[0].sequence, 1);
    }

    #[tokio::test]
    async fn terminates_once_counter_reaches_limit() {
        let mut engine = make_engine();
        for _ in 0..3 {
            engine
                .step(vec![action("increment")])
                .await
                .expect("step");
        }
        assert!(engine.is_terminated());
    }

    struct RefutingArbiter;

    impl Arbiter for RefutingArbiter {
        type State = CounterState;

        fn resolve_conflicts(&self, _actions: Vec<Action>, _state: &Self::State) -> Vec<Action> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn actions_rejected_by_silent_arbiter_produce_no_results() {
        let store: Arc<dyn EventLogStore> = Arc::new(MemoryEventLogStore::new());
        let mut engine = Engine::new(
            SessionId::new(),
            CounterState {
                base: base_state(),
                counter: 0,
            },
            CounterRules,
            RefutingArbiter,
            NeverAdvanceScheduler,
            store,
        );
        let results = engine
            .step(vec![action("increment")])
            .await
            .expect("step");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn step_after_termination_is_a_no_op() {
        let mut engine = make_engine();
        for _ in 0..3 {
            engine
                .step(vec![action("increment")])
                .await
                .expect("step");
        }
        assert!(engine.is_terminated());
        let counter_before = engine.state().counter;

        let results = engine
            .step(vec![action("increment")])
            .await
            .expect("step");

        assert!(results.is_empty());
        assert_eq!(engine.state().counter, counter_before);
    }

    fn _assert_error_is_from_event_log(err: EventLogError) -> KernelError {
        KernelError::from(err)
    }
}
