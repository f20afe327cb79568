//! Scheduler module: decides which targets are due and runs their checks.
//!
//! One periodic driver evaluates due-ness once per tick. Each due target is
//! claimed in the store (status becomes CHECKING) before its check is spawned,
//! so a slow target never delays the others and is never checked twice at once.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::notify::Dispatcher;
use crate::probe::{CheckRequest, Checker};
use crate::store::{Status, Target, TargetId, TargetStore, Transition};

/// Cadence of the due-ness evaluation.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Whether `target` should be checked at `now` (epoch millis).
pub fn is_due(target: &Target, now: i64) -> bool {
    if target.paused || target.status == Status::Checking {
        return false;
    }
    match target.last_checked {
        None => true,
        Some(last) => now.saturating_sub(last) >= target.effective_interval_secs() as i64 * 1000,
    }
}

/// The main scheduler that orchestrates check execution.
pub struct Scheduler {
    store: Arc<TargetStore>,
    checker: Arc<dyn Checker>,
    dispatcher: Arc<Dispatcher>,
    enabled: AtomicBool,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(
        store: Arc<TargetStore>,
        checker: Arc<dyn Checker>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            store,
            checker,
            dispatcher,
            enabled: AtomicBool::new(true),
            driver: Mutex::new(None),
        }
    }

    /// Start the tick loop. Calling it again while running is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut driver = self.driver.lock();
        if driver.is_some() {
            return;
        }

        tracing::info!("Starting scheduler with {} targets", self.store.len());

        let weak: Weak<Self> = Arc::downgrade(self);
        *driver = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let Some(scheduler) = weak.upgrade() else {
                    break;
                };
                scheduler.tick();
            }
        }));
    }

    /// Stop the tick loop. In-flight checks still complete.
    pub fn stop(&self) {
        if let Some(handle) = self.driver.lock().take() {
            handle.abort();
            tracing::info!("Scheduler stopped");
        }
    }

    /// Suspend or resume scheduling without touching target state.
    pub fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        if was != enabled {
            let verb = if enabled { "resumed" } else { "suspended" };
            tracing::info!("Monitoring {}", verb);
            self.store.activity().info(format!("Monitoring {}", verb));
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// One evaluation pass at the current time.
    pub fn tick(&self) -> Vec<JoinHandle<()>> {
        self.tick_at(Utc::now().timestamp_millis())
    }

    /// One evaluation pass at `now`. Returns the handles of the checks started.
    pub fn tick_at(&self, now: i64) -> Vec<JoinHandle<()>> {
        if !self.is_enabled() {
            return Vec::new();
        }

        let due: Vec<TargetId> = self.store.read(|targets| {
            targets
                .iter()
                .filter(|t| is_due(t, now))
                .map(|t| t.id.clone())
                .collect()
        });

        if !due.is_empty() {
            tracing::debug!("{} targets due", due.len());
        }
        due.iter().filter_map(|id| self.dispatch(id)).collect()
    }

    /// Check one target right away, ignoring its interval and pause flag.
    /// Returns `None` if it is absent or already being checked.
    pub fn check_now(&self, id: &TargetId) -> Option<JoinHandle<()>> {
        self.dispatch(id)
    }

    /// Check every non-paused target right away, ignoring intervals.
    pub fn check_all(&self) -> Vec<JoinHandle<()>> {
        let ids: Vec<TargetId> = self.store.read(|targets| {
            targets
                .iter()
                .filter(|t| !t.paused)
                .map(|t| t.id.clone())
                .collect()
        });
        ids.iter().filter_map(|id| self.dispatch(id)).collect()
    }

    /// Claim the target and spawn its check. The claim happens synchronously,
    /// before anything is awaited.
    fn dispatch(&self, id: &TargetId) -> Option<JoinHandle<()>> {
        let request = self.store.begin_check(id)?;
        Some(tokio::spawn(run_check(
            request,
            self.store.clone(),
            self.checker.clone(),
            self.dispatcher.clone(),
        )))
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.driver.get_mut().take() {
            handle.abort();
        }
    }
}

/// Run one check to completion and apply its result.
async fn run_check(
    request: CheckRequest,
    store: Arc<TargetStore>,
    checker: Arc<dyn Checker>,
    dispatcher: Arc<Dispatcher>,
) {
    let outcome = checker.run(&request).await;
    let now = Utc::now().timestamp_millis();

    let Some(applied) = store.apply_result(&request.id, &outcome, now) else {
        tracing::debug!("Discarding result for removed target {}", request.id);
        return;
    };

    match applied.transition {
        Some(Transition::WentDown) => {
            tracing::warn!("{} is DOWN: {}", applied.url, outcome.detail);
            store.activity().error(format!("{} is DOWN: {}", applied.url, outcome.detail));
        }
        Some(Transition::Restored) => {
            tracing::info!("{} is back up ({}ms)", applied.url, outcome.latency_ms);
            store.activity().success(format!("{} is back up", applied.url));
        }
        None => {}
    }

    if let Some(transition) = applied.transition {
        // Fire-and-forget; delivery tasks run on their own
        dispatcher.on_transition(&applied.url, transition, &outcome.detail);
    }
}
