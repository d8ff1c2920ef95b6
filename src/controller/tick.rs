//! Tick reports and run counters.

use std::time::Duration;

use crate::classify::classify;
use crate::domain::{Account, LogEntry, TxOutcome};

/// Everything one completed tick hands back to the controller
#[derive(Debug, Clone)]
pub struct TickReport {
    /// 1-based tick number within its schedule
    pub tick: u64,
    /// One entry per account, in account order
    pub entries: Vec<LogEntry>,
    pub successes: u64,
    pub failures: u64,
    /// Scheduled slots dropped because this tick was still in flight
    pub skipped: u64,
    pub elapsed: Duration,
}

impl TickReport {
    /// Classify a tick's outcomes
    pub fn from_outcomes(tick: u64, outcomes: &[(Account, TxOutcome)], elapsed: Duration, skipped: u64) -> Self {
        let mut entries = Vec::with_capacity(outcomes.len());
        let mut successes = 0;
        for (account, outcome) in outcomes {
            let classified = classify(account, outcome);
            successes += classified.success_delta;
            entries.push(classified.entry);
        }

        Self {
            tick,
            entries,
            successes,
            failures: outcomes.len() as u64 - successes,
            skipped,
            elapsed,
        }
    }
}

/// Slots that will not fire because a tick was still in flight.
///
/// `since_slot` is measured from the deadline of the slot the tick belongs
/// to, not from when it started, so a late start is accounted for. The first
/// overdue slot still fires right away; the rest are dropped.
pub fn skipped_slots(since_slot: Duration, interval: Duration) -> u64 {
    if interval.is_zero() {
        return 0;
    }
    let overdue = since_slot.as_nanos() / interval.as_nanos();
    (overdue as u64).saturating_sub(1)
}

/// Run counters, kept across stop/start
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    /// Successful submissions
    pub success_count: u64,
    /// Failed submissions
    pub failure_count: u64,
    /// Ticks applied
    pub ticks: u64,
    /// Scheduled slots skipped to avoid overlapping ticks
    pub skipped_ticks: u64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a tick report into the counters
    pub fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.success_count += report.successes;
        self.failure_count += report.failures;
        self.skipped_ticks += report.skipped;
    }

    /// Total submissions so far
    pub fn submissions(&self) -> u64 {
        self.success_count + self.failure_count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
