//! Recurring maintenance scheduler.
//!
//! A single background task sleeps until the next trigger instant, computed
//! fresh from wall-clock time on every cycle, then runs the usage reset. Runs
//! never overlap: a trigger that arrives while a run is in flight is dropped.
//! Nothing is persisted, so missed periods are not caught up after a restart.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::db::usage::UsageCounterStore;

use super::schedule::TriggerRule;
use super::usage_reset::{reset_usage_counters, ResetSummary};

/// Upper bound on a single sleep, so wall-clock adjustments are noticed.
const MAX_WAIT: Duration = Duration::from_secs(3600);

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The host clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Lifecycle of one maintenance run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Triggered,
    Running,
}

/// What happened when the trigger fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(ResetSummary),
    /// A run was already in flight; this trigger was dropped.
    Skipped,
    /// The store rejected the reset. Next period's trigger retries.
    Failed,
}

pub struct MaintenanceScheduler {
    rule: TriggerRule,
    store: Arc<dyn UsageCounterStore>,
    clock: Arc<dyn Clock>,
    state: Mutex<RunState>,
}

/// Returns the scheduler to `Idle` when the run ends, however it ends.
struct RunGuard<'a> {
    state: &'a Mutex<RunState>,
}

impl RunGuard<'_> {
    fn set(&self, next: RunState) {
        *self.state.lock() = next;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock() = RunState::Idle;
    }
}

impl MaintenanceScheduler {
    pub fn new(rule: TriggerRule, store: Arc<dyn UsageCounterStore>) -> Self {
        Self::with_clock(rule, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        rule: TriggerRule,
        store: Arc<dyn UsageCounterStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rule,
            store,
            clock,
            state: Mutex::new(RunState::Idle),
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    /// Next scheduled trigger instant.
    pub fn next_trigger(&self) -> Option<DateTime<Utc>> {
        self.rule.next_after(self.clock.now())
    }

    /// Move `Idle → Triggered`, or refuse if a run is in flight.
    fn begin(&self) -> Option<RunGuard<'_>> {
        let mut state = self.state.lock();
        if *state != RunState::Idle {
            return None;
        }
        *state = RunState::Triggered;
        Some(RunGuard { state: &self.state })
    }

    /// Fire the trigger once. Used by the timer loop and the admin route.
    pub async fn trigger(&self) -> RunOutcome {
        let Some(guard) = self.begin() else {
            warn!(state = ?self.state(), "usage reset already in flight, trigger dropped");
            return RunOutcome::Skipped;
        };

        guard.set(RunState::Running);
        let now = self.clock.now();

        match reset_usage_counters(self.store.as_ref(), now, self.rule.timezone()).await {
            Ok(summary) => {
                info!(
                    period_start = %summary.period_start,
                    records_reset = summary.records_reset,
                    "recruiter usage counters reset"
                );
                RunOutcome::Completed(summary)
            }
            Err(e) => {
                error!(error = %e, "recruiter usage reset failed; next period will retry");
                RunOutcome::Failed
            }
        }
    }

    /// Timer loop. Returns when `shutdown` is cancelled. A run that has
    /// started is always allowed to finish.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(timezone = %self.rule.timezone(), "maintenance scheduler started");

        loop {
            let now = self.clock.now();
            let Some(next) = self.rule.next_after(now) else {
                warn!("maintenance rule has no upcoming trigger, scheduler stopping");
                break;
            };

            let wait = (next - now).to_std().unwrap_or(Duration::ZERO).min(MAX_WAIT);
            debug!(next = %next, ?wait, "waiting for next maintenance trigger");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.cancelled() => {
                    info!("maintenance scheduler received shutdown signal");
                    break;
                }
            }

            if self.clock.now() < next {
                continue;
            }

            self.trigger().await;
        }
    }
}
