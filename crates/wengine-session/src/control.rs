//! Pause/resume/stop signalling for one session's [`crate::driver::TickDriver`].
//!
//! An `AtomicBool` + `tokio::sync::Notify` pair, trimmed to what a
//! per-session driver needs -- tick-rate tuning and the real-time/tick
//! ceilings live on each world kind's own `Scheduler` instead of here.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Notify;

/// Shared control surface between [`crate::manager::SessionManager`] (the
/// writer) and a running [`crate::driver::TickDriver`] (the reader).
#[derive(Debug)]
pub struct SessionControl {
    paused: AtomicBool,
    resume_notify: Notify,
    stop_requested: AtomicBool,
    tick_interval_ms: AtomicU64,
}

impl SessionControl {
    /// Build a fresh control surface, running and not yet asked to stop.
    #[must_use]
    pub fn new(tick_interval_ms: u64) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(tick_interval_ms),
        }
    }

    /// Whether the driver should currently be parked.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Park the driver at the next opportunity.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Wake a parked driver.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Block the calling task while paused; returns immediately once
    /// [`Self::resume`] is called (or if never paused to begin with).
    pub async fn wait_if_paused(&self) {
        while self.is_paused() {
            self.resume_notify.notified().await;
        }
    }

    /// Ask the driver to exit at the next opportunity.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        // Unpark a paused driver so it can observe the stop request.
        self.resume_notify.notify_one();
    }

    /// Whether [`Self::request_stop`] has been called.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// The current tick interval in milliseconds.
    #[must_use]
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Change the tick interval for subsequent ticks.
    pub fn set_tick_interval_ms(&self, ms: u64) {
        self.tick_interval_ms.store(ms, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::SessionControl;

    #[tokio::test]
    async fn wait_if_paused_returns_immediately_when_not_paused() {
        let control = SessionControl::new(500);
        tokio::time::timeout(Duration::from_millis(50), control.wait_if_paused())
            .await
            .expect("should not block");
    }

    #[tokio::test]
    async fn resume_unblocks_a_paused_waiter() {
        let control = Arc::new(SessionControl::new(500));
        control.pause();
        let waiter = {
            let control = Arc::clone(&control);
            tokio::spawn(async move {
                control.wait_if_paused().await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        control.resume();
        tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("resume should unblock the waiter")
            .expect("task should not panic");
    }

    #[tokio::test]
    async fn request_stop_wakes_a_paused_waiter() {
        let control = Arc::new(SessionControl::new(500));
        control.pause();
        let waiter = {
            let control = Arc::clone(&control);
            tokio::spawn(async move {
                control.wait_if_paused().await;
                control.is_stop_requested()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        control.request_stop();
        control.resume();
        let stopped = tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("request_stop should wake the waiter")
            .expect("task should not panic");
        assert!(stopped);
    }
}
