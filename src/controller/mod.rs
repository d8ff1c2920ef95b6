//! Run controller - the start/stop state machine.
//!
//! The controller owns the dispatcher, the log stream and the counters. Ticks
//! run on a spawned schedule and come back as [`TickReport`]s over a channel;
//! only the controller mutates the log and counters, when the owner calls
//! [`RunController::next_report`].
//!
//! ```text
//!          start(draft) ok
//!   Idle ───────────────────▶ Running
//!    ▲  start(draft) err         │
//!    └──(stays Idle) ◀── stop() ─┘
//! ```

mod schedule;
mod tick;

pub use schedule::TickSchedule;
pub use tick::{Counters, TickReport, skipped_slots};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinError;

use crate::client::TransactionClient;
use crate::dispatch::{DispatchConfig, Dispatcher};
use crate::domain::{DEFAULT_LOG_CAPACITY, LogEntry, LogStream, RunDraft, RunPlan, ValidationError, validate};

/// How often an idle controller checks whether retired schedules are done
const RETIRED_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
}

/// What woke a controller waiting on its live schedule
enum Wake {
    Report(Option<TickReport>),
    Ended(Result<(), JoinError>),
}

/// Settings fixed for the lifetime of a controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub log_capacity: usize,
    pub dispatch: DispatchConfig,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            dispatch: DispatchConfig::default(),
        }
    }
}

pub struct RunController<C>
where
    C: TransactionClient + 'static,
{
    dispatcher: Arc<Dispatcher<C>>,
    state: RunState,
    log: LogStream,
    counters: Counters,
    /// Schedule of the current run
    schedule: Option<TickSchedule>,
    /// Cancelled schedules that may still have a tick in flight
    retired: Vec<TickSchedule>,
    tick_gate: Arc<Mutex<()>>,
    report_tx: mpsc::Sender<TickReport>,
    report_rx: mpsc::Receiver<TickReport>,
    plan: Option<Arc<RunPlan>>,
}

impl<C> RunController<C>
where
    C: TransactionClient + 'static,
{
    pub fn new(client: Arc<C>) -> Self {
        Self::with_settings(client, ControllerSettings::default())
    }

    pub fn with_settings(client: Arc<C>, settings: ControllerSettings) -> Self {
        let (report_tx, report_rx) = mpsc::channel(100);
        Self {
            dispatcher: Arc::new(Dispatcher::with_config(client, settings.dispatch)),
            state: RunState::Idle,
            log: LogStream::with_capacity(settings.log_capacity),
            counters: Counters::new(),
            schedule: None,
            retired: Vec::new(),
            tick_gate: Arc::new(Mutex::new(())),
            report_tx,
            report_rx,
            plan: None,
        }
    }

    /// Validate `draft` and begin ticking.
    ///
    /// A no-op while already running. On a validation failure one error entry
    /// is logged and the controller stays idle.
    pub fn start(&mut self, draft: &RunDraft) -> Result<(), ValidationError> {
        if self.state == RunState::Running {
            log::debug!("start ignored: already running");
            return Ok(());
        }

        let plan = match validate(draft) {
            Ok(plan) => Arc::new(plan),
            Err(e) => {
                log::warn!("Run not started: {}", e);
                self.log.push(LogEntry::error(e.to_string()));
                return Err(e);
            }
        };

        let schedule = TickSchedule::spawn(
            self.dispatcher.clone(),
            plan.clone(),
            self.report_tx.clone(),
            self.tick_gate.clone(),
        );

        let message = format!(
            "started: {} accounts, {}, every {} ms",
            plan.accounts.len(),
            describe_destination(&plan),
            plan.config.tick_interval.as_millis()
        );
        log::info!("Run {}", message);
        self.log.push(LogEntry::info(message));

        self.schedule = Some(schedule);
        self.plan = Some(plan);
        self.state = RunState::Running;
        Ok(())
    }

    /// Stop scheduling ticks. A tick in flight still completes and is logged
    /// by a later [`next_report`](Self::next_report) or [`settle`](Self::settle).
    pub fn stop(&mut self) {
        if let Some(schedule) = self.schedule.take() {
            schedule.cancel();
            self.retired.push(schedule);
        }
        if self.state == RunState::Running {
            log::info!("Run stopped after {} successes", self.counters.success_count);
            self.log.push(LogEntry::info("stopped"));
        }
        self.state = RunState::Idle;
    }

    /// Empty the log stream; counters are kept
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    pub fn reset_counters(&mut self) {
        self.counters.reset();
    }

    /// Wait for the next tick report and fold it into the log and counters.
    ///
    /// Returns `None` once idle with no tick left in flight. A schedule that
    /// exits on its own while running leaves the controller idle.
    pub async fn next_report(&mut self) -> Option<TickReport> {
        loop {
            self.retired.retain(|schedule| !schedule.is_finished());

            if let Ok(report) = self.report_rx.try_recv() {
                self.apply(&report);
                return Some(report);
            }
            if self.schedule.is_none() && self.retired.is_empty() {
                return None;
            }

            let wake = match self.schedule.as_mut() {
                Some(schedule) => {
                    let reports = &mut self.report_rx;
                    tokio::select! {
                        biased;
                        report = reports.recv() => Wake::Report(report),
                        joined = schedule.join() => Wake::Ended(joined),
                    }
                }
                None => Wake::Report(
                    tokio::time::timeout(RETIRED_POLL, self.report_rx.recv())
                        .await
                        .ok()
                        .flatten(),
                ),
            };

            match wake {
                Wake::Report(Some(report)) => {
                    self.apply(&report);
                    return Some(report);
                }
                Wake::Report(None) => {}
                Wake::Ended(joined) => self.schedule_ended(joined),
            }
        }
    }

    /// The live schedule exited without being stopped
    fn schedule_ended(&mut self, joined: Result<(), JoinError>) {
        self.schedule = None;
        self.state = RunState::Idle;
        let message = match joined {
            Ok(()) => "run ended unexpectedly".to_string(),
            Err(e) => format!("run ended unexpectedly: {}", e),
        };
        log::error!("{}", message);
        self.log.push(LogEntry::error(message));
    }

    /// Apply every report that is ready without waiting
    pub fn poll_reports(&mut self) -> Vec<TickReport> {
        let mut reports = Vec::new();
        while let Ok(report) = self.report_rx.try_recv() {
            self.apply(&report);
            reports.push(report);
        }
        reports
    }

    /// After `stop`, wait for in-flight ticks to drain and apply their reports.
    ///
    /// While running this only applies reports that are already waiting.
    pub async fn settle(&mut self) -> Vec<TickReport> {
        if self.is_running() {
            return self.poll_reports();
        }
        let mut reports = Vec::new();
        while let Some(report) = self.next_report().await {
            reports.push(report);
        }
        reports
    }

    fn apply(&mut self, report: &TickReport) {
        self.log.extend(report.entries.iter().cloned());
        if report.skipped > 0 {
            self.log.push(LogEntry::info(format!(
                "skipped {} tick(s) while tick {} was in flight",
                report.skipped, report.tick
            )));
        }
        self.counters.record(report);
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Log entries, newest first
    pub fn logs(&self) -> &LogStream {
        &self.log
    }

    pub fn success_count(&self) -> u64 {
        self.counters.success_count
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Plan of the current or most recent run
    pub fn plan(&self) -> Option<&RunPlan> {
        self.plan.as_deref()
    }
}

fn describe_destination(plan: &RunPlan) -> String {
    match plan.config.recipient {
        Some(recipient) => format!("to {}", recipient.short()),
        None => "each to itself".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockTransactionClient, TransactionClient, TxRequest};
    use crate::domain::{Account, Address, DestinationMode, Severity, SubmitError, TxId};

    /// Panics on every submission from `target`
    struct PanickingClient {
        target: Address,
    }

    #[async_trait::async_trait]
    impl TransactionClient for PanickingClient {
        async fn submit(&self, account: &Account, _request: TxRequest) -> Result<TxId, SubmitError> {
            if account.address == self.target {
                panic!("signer unavailable");
            }
            Ok(TxId(format!("0x{}", hex::encode(account.address.as_bytes()))))
        }
    }

    fn draft(accounts: usize, interval_ms: u64) -> RunDraft {
        RunDraft {
            key_lines: (1..=accounts).map(|i| format!("{:064x}", i)).collect(),
            mode: DestinationMode::SelfReturn,
            payload: "0x".into(),
            tick_interval_ms: interval_ms,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_start_and_first_tick() {
        let client = Arc::new(MockTransactionClient::new());
        let mut controller = RunController::new(client);

        controller.start(&draft(3, 60_000)).unwrap();
        assert!(controller.is_running());
        assert_eq!(controller.logs().len(), 1);

        let report = controller.next_report().await.unwrap();
        assert_eq!(report.successes, 3);
        assert_eq!(controller.success_count(), 3);
        assert_eq!(controller.logs().len(), 4);

        controller.stop();
        assert_eq!(controller.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn test_invalid_draft_stays_idle() {
        let mut controller = RunController::new(Arc::new(MockTransactionClient::new()));
        let d = RunDraft {
            mode: DestinationMode::SingleRecipient,
            recipient: "0x123".into(),
            ..draft(1, 100)
        };

        assert_eq!(controller.start(&d), Err(ValidationError::NoRecipient));
        assert_eq!(controller.state(), RunState::Idle);
        assert_eq!(controller.logs().len(), 1);
        assert_eq!(controller.logs().newest().unwrap().severity, Severity::Error);
        assert!(controller.next_report().await.is_none());
    }

    #[tokio::test]
    async fn test_start_while_running_is_noop() {
        let client = Arc::new(MockTransactionClient::new());
        let mut controller = RunController::new(client);

        controller.start(&draft(1, 60_000)).unwrap();
        controller.start(&draft(2, 60_000)).unwrap();

        assert_eq!(controller.plan().unwrap().accounts.len(), 1);
        assert_eq!(controller.logs().len(), 1);
        controller.stop();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut controller = RunController::new(Arc::new(MockTransactionClient::new()));
        controller.stop();
        assert!(controller.logs().is_empty());

        controller.start(&draft(1, 60_000)).unwrap();
        controller.stop();
        controller.stop();
        assert_eq!(controller.logs().iter().filter(|e| e.message == "stopped").count(), 1);
    }

    #[tokio::test]
    async fn test_failure_logged_without_counting() {
        let client = Arc::new(MockTransactionClient::new());
        let d = draft(2, 60_000);
        let plan = validate(&d).unwrap();
        client.fail_for(plan.accounts.get(0).unwrap().address, SubmitError::network("refused"));

        let mut controller = RunController::new(client);
        controller.start(&d).unwrap();
        let report = controller.next_report().await.unwrap();
        controller.stop();

        assert_eq!(report.failures, 1);
        assert_eq!(controller.success_count(), 1);
        assert_eq!(controller.counters().failure_count, 1);
    }

    #[tokio::test]
    async fn test_skipped_slots_are_logged() {
        let client = Arc::new(MockTransactionClient::new().with_latency(Duration::from_millis(40)));
        let mut controller = RunController::new(client);

        controller.start(&draft(1, 5)).unwrap();
        let report = controller.next_report().await.unwrap();
        controller.stop();

        assert!(report.skipped > 0);
        assert!(controller.counters().skipped_ticks >= report.skipped);
        assert!(controller.logs().iter().any(|e| e.message.starts_with("skipped ")));
    }

    #[tokio::test]
    async fn test_reset_counters() {
        let mut controller = RunController::new(Arc::new(MockTransactionClient::new()));
        controller.start(&draft(2, 60_000)).unwrap();
        controller.next_report().await.unwrap();
        controller.stop();
        controller.settle().await;

        controller.reset_counters();
        assert_eq!(controller.success_count(), 0);
        assert_eq!(controller.counters(), &Counters::default());
    }

    #[tokio::test]
    async fn test_log_capacity_setting() {
        let settings = ControllerSettings {
            log_capacity: 2,
            ..Default::default()
        };
        let mut controller = RunController::with_settings(Arc::new(MockTransactionClient::new()), settings);
        controller.start(&draft(3, 60_000)).unwrap();
        controller.next_report().await.unwrap();
        controller.stop();

        assert_eq!(controller.logs().len(), 2);
        assert_eq!(controller.success_count(), 3);
    }

    #[tokio::test]
    async fn test_client_panic_fails_one_account() {
        let d = draft(3, 10);
        let target = validate(&d).unwrap().accounts.get(1).unwrap().address;
        let mut controller = RunController::new(Arc::new(PanickingClient { target }));

        controller.start(&d).unwrap();
        let report = tokio::time::timeout(Duration::from_secs(1), controller.next_report())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.successes, 2);
        assert_eq!(report.failures, 1);
        assert_eq!(report.entries[1].severity, Severity::Error);
        assert_eq!(report.entries[1].message, "unknown error");
        assert!(controller.is_running());
        assert_eq!(controller.success_count(), 2);

        // The schedule survives and keeps ticking
        let next = tokio::time::timeout(Duration::from_secs(1), controller.next_report())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.tick, 2);
        controller.stop();
    }

    #[tokio::test]
    async fn test_schedule_exit_moves_to_idle() {
        let mut controller = RunController::new(Arc::new(MockTransactionClient::new()));
        controller.start(&draft(1, 60_000)).unwrap();
        controller.next_report().await.unwrap();

        controller.schedule.as_ref().unwrap().abort();

        let next = tokio::time::timeout(Duration::from_secs(1), controller.next_report())
            .await
            .unwrap();
        assert!(next.is_none());
        assert_eq!(controller.state(), RunState::Idle);
        let newest = controller.logs().newest().unwrap();
        assert_eq!(newest.severity, Severity::Error);
        assert!(newest.message.starts_with("run ended unexpectedly"));
    }
}
