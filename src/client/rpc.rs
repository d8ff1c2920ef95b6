//! JSON-RPC transaction client.
//!
//! Submits with `eth_sendTransaction`, leaving nonce, gas limit and signing to
//! the node. Any JSON-RPC error object is treated as the node refusing the
//! transaction.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::transport::{HttpTransport, Scheme, Transport, TransportError, WsTransport};
use super::{GasSpec, TransactionClient, TxRequest};
use crate::domain::{Account, ErrorKind, SubmitError, TxId};
use crate::error::{PolarisError, Result};

/// Transaction client backed by an RPC endpoint
pub struct RpcClient {
    endpoint: String,
    transport: Box<dyn Transport>,
}

impl RpcClient {
    /// Connect to an endpoint, choosing the transport from its scheme
    pub async fn connect(endpoint: &str, timeout: Duration) -> Result<Self> {
        let transport: Box<dyn Transport> = match Scheme::of(endpoint)? {
            Scheme::Http => Box::new(HttpTransport::new(endpoint, timeout)?),
            Scheme::WebSocket => Box::new(WsTransport::connect(endpoint, timeout).await?),
        };

        log::info!("RPC client ready for {}", endpoint);
        Ok(Self::with_transport(endpoint, transport))
    }

    /// Use an already constructed transport
    pub fn with_transport(endpoint: &str, transport: Box<dyn Transport>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            transport,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Chain id reported by the endpoint (`eth_chainId`)
    pub async fn chain_id(&self) -> Result<u64> {
        let value = self.transport.request("eth_chainId", json!([])).await?;
        let hex = value
            .as_str()
            .ok_or_else(|| PolarisError::Transport(format!("unexpected eth_chainId result: {}", value)))?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|e| PolarisError::Transport(format!("bad chain id {}: {}", hex, e)))
    }
}

/// `eth_sendTransaction` parameter object
pub fn transaction_params(account: &Account, request: &TxRequest) -> Value {
    let mut tx = json!({
        "from": account.address.to_checksum(),
        "to": request.to.to_checksum(),
        "value": request.value.to_quantity(),
        "data": request.data.to_hex(),
    });

    match request.gas {
        Some(GasSpec::GasPrice(price)) => tx["gasPrice"] = json!(price.to_quantity()),
        Some(GasSpec::PriorityFee(tip)) => tx["maxPriorityFeePerGas"] = json!(tip.to_quantity()),
        None => {}
    }

    tx
}

fn into_submit_error(err: TransportError) -> SubmitError {
    match err {
        TransportError::Network(detail) => SubmitError::new(ErrorKind::Network, detail),
        TransportError::Timeout(after) => SubmitError::new(ErrorKind::Timeout, format!("no response after {:?}", after)),
        TransportError::Rpc { code, message } => SubmitError::new(ErrorKind::Execution, format!("{} (code {})", message, code)),
        TransportError::InvalidResponse(detail) => SubmitError::new(ErrorKind::Unknown, detail),
    }
}

#[async_trait]
impl TransactionClient for RpcClient {
    async fn submit(&self, account: &Account, request: TxRequest) -> std::result::Result<TxId, SubmitError> {
        let params = json!([transaction_params(account, &request)]);
        let value = self
            .transport
            .request("eth_sendTransaction", params)
            .await
            .map_err(into_submit_error)?;

        match value.as_str() {
            Some(hash) => Ok(TxId(hash.to_string())),
            None => Err(SubmitError::unknown(format!("unexpected transaction hash: {}", value))),
        }
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient").field("endpoint", &self.endpoint).finish()
    }
}
