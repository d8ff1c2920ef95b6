//! Per-account submission outcome types.

use std::fmt;

use thiserror::Error;

/// Closed set of submission failure kinds reported by a transaction client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The endpoint could not be reached or the connection broke
    Network,
    /// The node refused or failed to execute the transaction
    Execution,
    /// No answer within the submission deadline
    Timeout,
    /// Anything the client could not classify
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::Execution => "execution",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Typed failure returned by `TransactionClient::submit`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error: {detail}")]
pub struct SubmitError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl SubmitError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, detail)
    }

    pub fn execution(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Execution, detail)
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, detail)
    }

    pub fn unknown(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, detail)
    }
}

/// Transaction identifier (hash) returned by the client
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxId(pub String);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of one account's submission in one tick. Never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    Success { tx_id: TxId },
    Failure { kind: ErrorKind, detail: String },
}

impl TxOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TxOutcome::Success { .. })
    }
}

impl From<Result<TxId, SubmitError>> for TxOutcome {
    fn from(result: Result<TxId, SubmitError>) -> Self {
        match result {
            Ok(tx_id) => TxOutcome::Success { tx_id },
            Err(e) => TxOutcome::Failure {
                kind: e.kind,
                detail: e.detail,
            },
        }
    }
}
