//! Domain types for Polaris
//!
//! This module contains all core domain types:
//! - Address: 20-byte account address with checksum and short display forms
//! - Account / AccountSet: signing identities derived from key lines
//! - Amount / Payload: transaction value and calldata
//! - RunDraft / RunConfig: raw and validated run parameters
//! - TxOutcome: per-account result of one submission
//! - LogEntry / LogStream: the user-facing run log

pub mod account;
pub mod address;
pub mod amount;
pub mod outcome;
pub mod payload;
pub mod run_config;
pub mod run_log;

pub use account::{Account, AccountSet, Signer, parse_key_line};
pub use address::{Address, AddressError};
pub use amount::{Amount, AmountError};
pub use outcome::{ErrorKind, SubmitError, TxId, TxOutcome};
pub use payload::{Payload, PayloadError};
pub use run_config::{DestinationMode, GasPolicy, RunConfig, RunDraft, RunPlan, ValidationError, validate};
pub use run_log::{DEFAULT_LOG_CAPACITY, LogEntry, LogStream, Severity};
