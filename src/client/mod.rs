//! Transaction client boundary.
//!
//! This module provides:
//! - TransactionClient trait: "submit this request from this account"
//! - RpcClient: JSON-RPC implementation over HTTP or WebSocket
//! - MockTransactionClient: scripted client for tests and dry runs

pub mod mock;
pub mod rpc;
pub mod transport;

use async_trait::async_trait;

use crate::domain::{Account, Address, Amount, Payload, SubmitError, TxId};

pub use mock::MockTransactionClient;
pub use rpc::RpcClient;
pub use transport::{HttpTransport, Scheme, Transport, TransportError, WsTransport};

/// Gas fields attached to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasSpec {
    /// Flat `gasPrice`
    GasPrice(Amount),
    /// `maxPriorityFeePerGas` only; the client fills in the rest
    PriorityFee(Amount),
}

/// One outbound transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub value: Amount,
    pub data: Payload,
    /// `None` leaves gas to the client's default policy
    pub gas: Option<GasSpec>,
}

/// Submits signed transactions on behalf of an account.
///
/// Implementations must report every failure as a `SubmitError`; a submission
/// never affects another account's submission.
#[async_trait]
pub trait TransactionClient: Send + Sync {
    async fn submit(&self, account: &Account, request: TxRequest) -> Result<TxId, SubmitError>;
}
