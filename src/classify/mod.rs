//! Result classification - turns raw outcomes into log entries and counter deltas.
//!
//! Total over `TxOutcome`: every outcome yields exactly one entry, and only
//! successes move the success counter.

use crate::domain::{Account, ErrorKind, LogEntry, Severity, TxOutcome};

/// One classified outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub entry: LogEntry,
    /// Amount to add to the success count
    pub success_delta: u64,
}

/// Human-readable failure text for a failure kind
pub fn failure_message(kind: ErrorKind, detail: &str) -> String {
    let detail = detail.trim();
    match kind {
        ErrorKind::Network if !detail.is_empty() => format!("network error: {}", detail),
        ErrorKind::Execution if !detail.is_empty() => format!("transaction failed: {}", detail),
        ErrorKind::Network => "network error".to_string(),
        ErrorKind::Execution => "transaction failed".to_string(),
        ErrorKind::Timeout => "request timed out".to_string(),
        ErrorKind::Unknown => "unknown error".to_string(),
    }
}

/// Classify one account's outcome
pub fn classify(account: &Account, outcome: &TxOutcome) -> Classified {
    let address = Some(account.address.short());
    match outcome {
        TxOutcome::Success { tx_id } => Classified {
            entry: LogEntry::new(address, tx_id.to_string(), Severity::Success),
            success_delta: 1,
        },
        TxOutcome::Failure { kind, detail } => Classified {
            entry: LogEntry::new(address, failure_message(*kind, detail), Severity::Error),
            success_delta: 0,
        },
    }
}
