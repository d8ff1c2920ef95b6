//! Dispatcher - fans one tick out to every account.
//!
//! Each account gets one request built from the run config. All submissions of a
//! tick are in flight together (optionally capped) and the tick ends only when
//! every one of them has settled. Outcomes come back in account order,
//! whatever order the network answers in.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::stream;
use futures::{FutureExt, StreamExt};

use crate::client::{GasSpec, TransactionClient, TxRequest};
use crate::domain::{Account, AccountSet, GasPolicy, RunConfig, SubmitError, TxOutcome};

/// Concurrency and deadline settings for a dispatcher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Maximum submissions in flight at once; 0 means one per account
    pub max_in_flight: usize,
    /// Per-submission deadline; `None` waits for the client
    pub submit_timeout: Option<Duration>,
}

impl DispatchConfig {
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = Some(timeout);
        self
    }
}

/// Gas fields for a run, or `None` when the gas value is zero
pub fn gas_spec(config: &RunConfig) -> Option<GasSpec> {
    if config.gas.is_zero() {
        return None;
    }
    Some(match config.gas_policy {
        GasPolicy::Legacy => GasSpec::GasPrice(config.gas),
        GasPolicy::PriorityTip => GasSpec::PriorityFee(config.gas),
    })
}

/// The request `account` sends in every tick
pub fn build_request(account: &Account, config: &RunConfig) -> TxRequest {
    TxRequest {
        to: config.destination_for(&account.address),
        value: config.value,
        data: config.payload.clone(),
        gas: gas_spec(config),
    }
}

/// Issues the submissions of one tick through a transaction client
pub struct Dispatcher<C>
where
    C: TransactionClient,
{
    client: Arc<C>,
    config: DispatchConfig,
}

impl<C> Dispatcher<C>
where
    C: TransactionClient,
{
    pub fn new(client: Arc<C>) -> Self {
        Self::with_config(client, DispatchConfig::default())
    }

    pub fn with_config(client: Arc<C>, config: DispatchConfig) -> Self {
        Self { client, config }
    }

    /// Submit one transaction per account and wait for all of them.
    ///
    /// Returns exactly one outcome per account, in `accounts` order.
    pub async fn dispatch_tick(&self, accounts: &AccountSet, config: &RunConfig) -> Vec<(Account, TxOutcome)> {
        let limit = match self.config.max_in_flight {
            0 => accounts.len().max(1),
            n => n,
        };

        stream::iter(accounts.iter().cloned())
            .map(|account| async move {
                let request = build_request(&account, config);
                let outcome = self.submit_one(&account, request).await;
                (account, outcome)
            })
            .buffered(limit)
            .collect()
            .await
    }

    async fn submit_one(&self, account: &Account, request: TxRequest) -> TxOutcome {
        // A panicking client fails only this account's submission
        let submission = AssertUnwindSafe(self.client.submit(account, request))
            .catch_unwind()
            .map(|caught| {
                caught.unwrap_or_else(|panic| {
                    log::error!("Client panicked submitting for {}", account.address);
                    Err(SubmitError::unknown(panic_message(panic.as_ref())))
                })
            });
        let result = match self.config.submit_timeout {
            Some(deadline) => tokio::time::timeout(deadline, submission)
                .await
                .unwrap_or_else(|_| Err(SubmitError::timeout(format!("no response after {:?}", deadline)))),
            None => submission.await,
        };

        match &result {
            Ok(tx_id) => log::debug!("{} submitted {}", account.address, tx_id),
            Err(e) => log::debug!("{} failed: {}", account.address, e),
        }
        result.into()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("client panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("client panicked: {}", message)
    } else {
        "client panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTransactionClient;
    use crate::domain::{Address, Amount, DestinationMode, ErrorKind, Payload, TxId};

    const RECIPIENT: &str = "0x1832e00DfF829547E1F564f92401C2886F3236b4";

    fn keys(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{:064x}", i)).collect()
    }

    fn run_config(mode: DestinationMode, gas_policy: GasPolicy, gas: Amount) -> RunConfig {
        RunConfig {
            mode,
            recipient: match mode {
                DestinationMode::SingleRecipient => Some(Address::parse(RECIPIENT).unwrap()),
                DestinationMode::SelfReturn => None,
            },
            payload: Payload::parse("0xabcd").unwrap(),
            value: Amount::from_ether("0.00182").unwrap(),
            gas_policy,
            gas,
            tick_interval: Duration::ZERO,
        }
    }

    #[test]
    fn test_build_request_self_return() {
        let accounts = AccountSet::parse(keys(2));
        let config = run_config(DestinationMode::SelfReturn, GasPolicy::Legacy, Amount::ZERO);

        for account in &accounts {
            let request = build_request(account, &config);
            assert_eq!(request.to, account.address);
            assert_eq!(request.value, config.value);
            assert_eq!(request.data, config.payload);
        }
    }

    #[test]
    fn test_build_request_single_recipient() {
        let accounts = AccountSet::parse(keys(1));
        let config = run_config(DestinationMode::SingleRecipient, GasPolicy::Legacy, Amount::ZERO);
        let request = build_request(accounts.get(0).unwrap(), &config);
        assert_eq!(request.to, Address::parse(RECIPIENT).unwrap());
    }

    #[test]
    fn test_gas_spec_by_policy() {
        let gwei = Amount::from_gwei("1").unwrap();

        let legacy = run_config(DestinationMode::SelfReturn, GasPolicy::Legacy, gwei);
        assert_eq!(gas_spec(&legacy), Some(GasSpec::GasPrice(gwei)));

        let tip = run_config(DestinationMode::SelfReturn, GasPolicy::PriorityTip, gwei);
        assert_eq!(gas_spec(&tip), Some(GasSpec::PriorityFee(gwei)));

        let zero = run_config(DestinationMode::SelfReturn, GasPolicy::PriorityTip, Amount::ZERO);
        assert_eq!(gas_spec(&zero), None);
    }

    #[tokio::test]
    async fn test_dispatch_one_outcome_per_account() {
        let client = Arc::new(MockTransactionClient::new());
        let dispatcher = Dispatcher::new(client.clone());
        let accounts = AccountSet::parse(keys(4));
        let config = run_config(DestinationMode::SelfReturn, GasPolicy::Legacy, Amount::ZERO);

        let outcomes = dispatcher.dispatch_tick(&accounts, &config).await;

        assert_eq!(outcomes.len(), 4);
        assert_eq!(client.submit_count(), 4);
        assert!(outcomes.iter().all(|(_, o)| o.is_success()));
    }

    #[tokio::test]
    async fn test_dispatch_failure_does_not_affect_others() {
        let client = Arc::new(MockTransactionClient::new());
        let accounts = AccountSet::parse(keys(3));
        let failing = accounts.get(1).unwrap().address;
        client.fail_for(failing, SubmitError::execution("insufficient funds"));

        let dispatcher = Dispatcher::new(client);
        let config = run_config(DestinationMode::SelfReturn, GasPolicy::Legacy, Amount::ZERO);
        let outcomes = dispatcher.dispatch_tick(&accounts, &config).await;

        assert!(outcomes[0].1.is_success());
        assert_eq!(
            outcomes[1].1,
            TxOutcome::Failure {
                kind: ErrorKind::Execution,
                detail: "insufficient funds".into()
            }
        );
        assert!(outcomes[2].1.is_success());
    }

    #[tokio::test]
    async fn test_dispatch_preserves_account_order() {
        let client = Arc::new(MockTransactionClient::new());
        let accounts = AccountSet::parse(keys(3));
        // First account answers last
        client.set_latency(accounts.get(0).unwrap().address, Duration::from_millis(60));
        client.set_latency(accounts.get(1).unwrap().address, Duration::from_millis(30));

        let dispatcher = Dispatcher::new(client.clone());
        let config = run_config(DestinationMode::SelfReturn, GasPolicy::Legacy, Amount::ZERO);
        let outcomes = dispatcher.dispatch_tick(&accounts, &config).await;

        let returned: Vec<_> = outcomes.iter().map(|(a, _)| a.address).collect();
        assert_eq!(returned, accounts.addresses());
        assert_eq!(client.max_in_flight(), 3);
    }

    #[tokio::test]
    async fn test_dispatch_respects_max_in_flight() {
        let client = Arc::new(MockTransactionClient::new().with_latency(Duration::from_millis(10)));
        let dispatcher = Dispatcher::with_config(client.clone(), DispatchConfig::default().with_max_in_flight(2));
        let accounts = AccountSet::parse(keys(5));
        let config = run_config(DestinationMode::SelfReturn, GasPolicy::Legacy, Amount::ZERO);

        let outcomes = dispatcher.dispatch_tick(&accounts, &config).await;

        assert_eq!(outcomes.len(), 5);
        assert!(client.max_in_flight() <= 2);
    }

    #[tokio::test]
    async fn test_dispatch_submit_timeout() {
        let client = Arc::new(MockTransactionClient::new());
        let accounts = AccountSet::parse(keys(2));
        client.set_latency(accounts.get(0).unwrap().address, Duration::from_secs(5));

        let dispatcher = Dispatcher::with_config(
            client,
            DispatchConfig::default().with_submit_timeout(Duration::from_millis(20)),
        );
        let config = run_config(DestinationMode::SelfReturn, GasPolicy::Legacy, Amount::ZERO);
        let outcomes = dispatcher.dispatch_tick(&accounts, &config).await;

        assert!(matches!(
            outcomes[0].1,
            TxOutcome::Failure {
                kind: ErrorKind::Timeout,
                ..
            }
        ));
        assert!(outcomes[1].1.is_success());
    }

    /// Panics for one address, succeeds for the rest
    struct PanickingClient {
        target: Address,
    }

    #[async_trait::async_trait]
    impl TransactionClient for PanickingClient {
        async fn submit(&self, account: &Account, _request: TxRequest) -> Result<TxId, SubmitError> {
            if account.address == self.target {
                panic!("nonce cache corrupted");
            }
            Ok(TxId(format!("0x{}", hex::encode(account.address.as_bytes()))))
        }
    }

    #[tokio::test]
    async fn test_dispatch_client_panic_is_unknown_failure() {
        let accounts = AccountSet::parse(keys(3));
        let client = Arc::new(PanickingClient {
            target: accounts.get(1).unwrap().address,
        });
        let dispatcher = Dispatcher::new(client);
        let config = run_config(DestinationMode::SelfReturn, GasPolicy::Legacy, Amount::ZERO);

        let outcomes = dispatcher.dispatch_tick(&accounts, &config).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].1.is_success());
        assert_eq!(
            outcomes[1].1,
            TxOutcome::Failure {
                kind: ErrorKind::Unknown,
                detail: "client panicked: nonce cache corrupted".into()
            }
        );
        assert!(outcomes[2].1.is_success());
    }

    #[test]
    fn test_panic_message() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("boom"));
        assert_eq!(panic_message(owned.as_ref()), "client panicked: boom");
        let opaque: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(opaque.as_ref()), "client panicked");
    }

    #[tokio::test]
    async fn test_dispatch_empty_set() {
        let dispatcher = Dispatcher::new(Arc::new(MockTransactionClient::new()));
        let config = run_config(DestinationMode::SelfReturn, GasPolicy::Legacy, Amount::ZERO);
        let outcomes = dispatcher.dispatch_tick(&AccountSet::default(), &config).await;
        assert!(outcomes.is_empty());
    }
}
