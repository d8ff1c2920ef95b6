//! Scripted transaction client for tests and `--dry-run`.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sha3::{Digest, Keccak256};

use super::{TransactionClient, TxRequest};
use crate::domain::{Account, Address, SubmitError, TxId};

/// Transaction client that never touches the network.
///
/// By default every submission succeeds with a synthetic hash. Per-address
/// failures, one-shot scripted results and latency can be configured.
#[derive(Debug, Default)]
pub struct MockTransactionClient {
    failures: Mutex<HashMap<Address, SubmitError>>,
    scripted: Mutex<HashMap<Address, VecDeque<Result<TxId, SubmitError>>>>,
    latency: Mutex<HashMap<Address, Duration>>,
    default_latency: Duration,
    submitted: Mutex<Vec<(Address, TxRequest)>>,
    counter: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransactionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every submission by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.default_latency = latency;
        self
    }

    /// Fail every submission from `address`
    pub fn fail_for(&self, address: Address, error: SubmitError) {
        self.failures.lock().unwrap().insert(address, error);
    }

    /// Queue one result for the next submission from `address`
    pub fn push_result(&self, address: Address, result: Result<TxId, SubmitError>) {
        self.scripted.lock().unwrap().entry(address).or_default().push_back(result);
    }

    /// Delay submissions from `address` by `latency`
    pub fn set_latency(&self, address: Address, latency: Duration) {
        self.latency.lock().unwrap().insert(address, latency);
    }

    /// Every request received so far, in arrival order
    pub fn submitted(&self) -> Vec<(Address, TxRequest)> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submit_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    /// Highest number of submissions that were pending at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Keccak over the sender's public key and a running counter
    fn synthetic_hash(&self, account: &Account) -> TxId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let mut hasher = Keccak256::new();
        hasher.update(account.signer().public_key());
        hasher.update(n.to_be_bytes());
        TxId(format!("0x{}", hex::encode(hasher.finalize())))
    }
}

#[async_trait]
impl TransactionClient for MockTransactionClient {
    async fn submit(&self, account: &Account, request: TxRequest) -> Result<TxId, SubmitError> {
        let from = account.address;
        self.submitted.lock().unwrap().push((from, request));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = self
            .latency
            .lock()
            .unwrap()
            .get(&from)
            .copied()
            .unwrap_or(self.default_latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self.scripted.lock().unwrap().get_mut(&from).and_then(|q| q.pop_front());
        if let Some(result) = scripted {
            return result;
        }
        if let Some(error) = self.failures.lock().unwrap().get(&from) {
            return Err(error.clone());
        }
        Ok(self.synthetic_hash(account))
    }
}
