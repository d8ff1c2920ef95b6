//! Recurring tick schedule for one run.
//!
//! A schedule is a spawned task that fires the first tick immediately and then
//! one tick per interval. A tick always runs to completion before the next slot
//! is awaited; slots that pass while it is in flight are dropped. The shared
//! tick gate keeps ticks of consecutive runs from overlapping as well.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::tick::{TickReport, skipped_slots};
use crate::client::TransactionClient;
use crate::dispatch::Dispatcher;
use crate::domain::RunPlan;

/// Handle to a running tick schedule
pub struct TickSchedule {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TickSchedule {
    /// Spawn the schedule task; reports go to `reports`
    pub fn spawn<C>(
        dispatcher: Arc<Dispatcher<C>>,
        plan: Arc<RunPlan>,
        reports: mpsc::Sender<TickReport>,
        gate: Arc<Mutex<()>>,
    ) -> Self
    where
        C: TransactionClient + 'static,
    {
        let (cancel, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(run_schedule(dispatcher, plan, reports, gate, cancel_rx));
        Self { cancel, handle }
    }

    /// Stop scheduling new ticks. A tick already in flight still reports.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// True once the task has exited, after its last report was sent
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to exit. Call at most once to completion.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    #[cfg(test)]
    pub(crate) fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for TickSchedule {
    fn drop(&mut self) {
        self.cancel.send_replace(true);
    }
}

fn ticker(plan: &RunPlan) -> Option<Interval> {
    let period = plan.config.tick_interval;
    if period.is_zero() {
        return None;
    }
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    Some(ticker)
}

async fn run_schedule<C>(
    dispatcher: Arc<Dispatcher<C>>,
    plan: Arc<RunPlan>,
    reports: mpsc::Sender<TickReport>,
    gate: Arc<Mutex<()>>,
    mut cancel_rx: watch::Receiver<bool>,
) where
    C: TransactionClient + 'static,
{
    let interval = plan.config.tick_interval;
    let mut ticker = ticker(&plan);
    let mut tick = 0u64;

    log::debug!("Schedule started: {} accounts every {:?}", plan.accounts.len(), interval);

    loop {
        // Deadline of the slot this tick belongs to
        let slot = match ticker.as_mut() {
            Some(ticker) => {
                tokio::select! {
                    biased;
                    _ = cancel_rx.changed() => break,
                    deadline = ticker.tick() => deadline,
                }
            }
            // Zero interval: back to back, but let the runtime breathe
            None => {
                tokio::task::yield_now().await;
                Instant::now()
            }
        };
        if *cancel_rx.borrow() {
            break;
        }

        let _gate = gate.lock().await;
        if *cancel_rx.borrow() {
            break;
        }

        tick += 1;
        let started = Instant::now();
        let outcomes = dispatcher.dispatch_tick(&plan.accounts, &plan.config).await;
        let skipped = skipped_slots(slot.elapsed(), interval);
        let report = TickReport::from_outcomes(tick, &outcomes, started.elapsed(), skipped);

        log::debug!(
            "Tick {} settled in {:?}: {} ok, {} failed",
            report.tick,
            report.elapsed,
            report.successes,
            report.failures
        );
        if report.skipped > 0 {
            log::warn!("Tick {} overran the interval, skipping {} slot(s)", report.tick, report.skipped);
        }

        if reports.send(report).await.is_err() {
            log::debug!("Report receiver gone, ending schedule");
            break;
        }
    }

    log::debug!("Schedule ended after {} ticks", tick);
}
