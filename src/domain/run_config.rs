//! Run configuration: the editable draft and its validated, immutable form.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::account::AccountSet;
use super::address::Address;
use super::amount::Amount;
use super::payload::{Payload, PayloadError};

/// Where each account's transaction is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DestinationMode {
    /// Every account sends to its own address
    #[serde(alias = "me-to-me")]
    SelfReturn,
    /// Every account sends to one configured recipient
    #[default]
    #[serde(alias = "many-to-one")]
    SingleRecipient,
}

/// How the configured gas value is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GasPolicy {
    /// Flat gas price
    #[default]
    Legacy,
    /// Priority fee on top of the base fee
    #[serde(alias = "tip")]
    PriorityTip,
}

/// Reasons a draft cannot start a run.
///
/// The first three are checked in declaration order; the number checks follow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no valid private keys")]
    NoAccounts,

    #[error("no valid recipient address")]
    NoRecipient,

    #[error("no payload")]
    NoPayload,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("invalid value: {0}")]
    InvalidAmount(String),

    #[error("invalid gas: {0}")]
    InvalidGas(String),
}

/// User-editable run parameters, as raw input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunDraft {
    /// One private key per line
    pub key_lines: Vec<String>,
    pub mode: DestinationMode,
    pub recipient: String,
    pub payload: String,
    /// Decimal ether amount sent with each transaction
    pub value: String,
    pub gas_policy: GasPolicy,
    /// Decimal gwei amount; zero leaves gas to the client
    pub gas: String,
    pub tick_interval_ms: u64,
}

/// Validated, immutable parameters for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub mode: DestinationMode,
    /// Present iff `mode` is `SingleRecipient`
    pub recipient: Option<Address>,
    pub payload: Payload,
    pub value: Amount,
    pub gas_policy: GasPolicy,
    pub gas: Amount,
    pub tick_interval: Duration,
}

impl RunConfig {
    /// Destination for a transaction sent by `sender`
    pub fn destination_for(&self, sender: &Address) -> Address {
        match (self.mode, self.recipient) {
            (DestinationMode::SingleRecipient, Some(recipient)) => recipient,
            _ => *sender,
        }
    }
}

/// Everything a run needs, produced by a successful validation
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub accounts: AccountSet,
    pub config: RunConfig,
}

/// Validate a draft into a run plan.
///
/// Pure: the same draft always yields the same result.
pub fn validate(draft: &RunDraft) -> Result<RunPlan, ValidationError> {
    let accounts = AccountSet::parse(&draft.key_lines);
    if accounts.is_empty() {
        return Err(ValidationError::NoAccounts);
    }

    let recipient = match draft.mode {
        DestinationMode::SingleRecipient => {
            Some(Address::parse(&draft.recipient).map_err(|_| ValidationError::NoRecipient)?)
        }
        DestinationMode::SelfReturn => None,
    };

    let payload = Payload::parse(&draft.payload).map_err(|e| match e {
        PayloadError::Empty => ValidationError::NoPayload,
        PayloadError::InvalidHex(detail) => ValidationError::InvalidPayload(detail),
    })?;

    let value = if draft.value.trim().is_empty() {
        Amount::ZERO
    } else {
        Amount::from_ether(&draft.value).map_err(|e| ValidationError::InvalidAmount(e.to_string()))?
    };

    let gas = if draft.gas.trim().is_empty() {
        Amount::ZERO
    } else {
        Amount::from_gwei(&draft.gas).map_err(|e| ValidationError::InvalidGas(e.to_string()))?
    };

    Ok(RunPlan {
        accounts,
        config: RunConfig {
            mode: draft.mode,
            recipient,
            payload,
            value,
            gas_policy: draft.gas_policy,
            gas,
            tick_interval: Duration::from_millis(draft.tick_interval_ms),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";
    const RECIPIENT: &str = "0x1832e00DfF829547E1F564f92401C2886F3236b4";

    fn draft() -> RunDraft {
        RunDraft {
            key_lines: vec![KEY.to_string()],
            mode: DestinationMode::SingleRecipient,
            recipient: RECIPIENT.to_string(),
            payload: "0x".to_string(),
            value: "0.00182".to_string(),
            gas_policy: GasPolicy::Legacy,
            gas: "1".to_string(),
            tick_interval_ms: 250,
        }
    }

    #[test]
    fn test_validate_ok() {
        let plan = validate(&draft()).unwrap();
        assert_eq!(plan.accounts.len(), 1);
        assert_eq!(plan.config.recipient, Some(Address::parse(RECIPIENT).unwrap()));
        assert_eq!(plan.config.value.wei(), 1_820_000_000_000_000);
        assert_eq!(plan.config.gas.wei(), 1_000_000_000);
        assert_eq!(plan.config.tick_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_no_accounts_checked_first() {
        let d = RunDraft {
            key_lines: vec!["nope".to_string()],
            recipient: String::new(),
            payload: String::new(),
            ..draft()
        };
        assert_eq!(validate(&d).unwrap_err(), ValidationError::NoAccounts);
    }

    #[test]
    fn test_no_recipient_checked_before_payload() {
        let d = RunDraft {
            recipient: String::new(),
            payload: String::new(),
            ..draft()
        };
        assert_eq!(validate(&d).unwrap_err(), ValidationError::NoRecipient);

        let d = RunDraft {
            recipient: "0x1234".to_string(),
            ..draft()
        };
        assert_eq!(validate(&d).unwrap_err(), ValidationError::NoRecipient);
    }

    #[test]
    fn test_self_return_ignores_recipient() {
        let d = RunDraft {
            mode: DestinationMode::SelfReturn,
            recipient: String::new(),
            ..draft()
        };
        let plan = validate(&d).unwrap();
        assert!(plan.config.recipient.is_none());

        let sender = plan.accounts.get(0).unwrap().address;
        assert_eq!(plan.config.destination_for(&sender), sender);
    }

    #[test]
    fn test_no_payload() {
        let d = RunDraft {
            payload: "   ".to_string(),
            ..draft()
        };
        assert_eq!(validate(&d).unwrap_err(), ValidationError::NoPayload);
    }

    #[test]
    fn test_invalid_payload() {
        let d = RunDraft {
            payload: "0x123".to_string(),
            ..draft()
        };
        assert!(matches!(validate(&d).unwrap_err(), ValidationError::InvalidPayload(_)));
    }

    #[test]
    fn test_invalid_numbers() {
        let d = RunDraft {
            value: "abc".to_string(),
            ..draft()
        };
        assert!(matches!(validate(&d).unwrap_err(), ValidationError::InvalidAmount(_)));

        let d = RunDraft {
            gas: "-1".to_string(),
            ..draft()
        };
        assert!(matches!(validate(&d).unwrap_err(), ValidationError::InvalidGas(_)));
    }

    #[test]
    fn test_empty_numbers_default_to_zero() {
        let d = RunDraft {
            value: String::new(),
            gas: String::new(),
            ..draft()
        };
        let plan = validate(&d).unwrap();
        assert!(plan.config.value.is_zero());
        assert!(plan.config.gas.is_zero());
    }

    #[test]
    fn test_validate_is_repeatable() {
        let d = draft();
        assert_eq!(validate(&d).unwrap().config, validate(&d).unwrap().config);

        let bad = RunDraft {
            payload: String::new(),
            ..draft()
        };
        assert_eq!(validate(&bad).unwrap_err(), validate(&bad).unwrap_err());
    }

    #[test]
    fn test_mode_serde_aliases() {
        let mode: DestinationMode = serde_yaml::from_str("me-to-me").unwrap();
        assert_eq!(mode, DestinationMode::SelfReturn);
        let mode: DestinationMode = serde_yaml::from_str("single-recipient").unwrap();
        assert_eq!(mode, DestinationMode::SingleRecipient);
        let policy: GasPolicy = serde_yaml::from_str("tip").unwrap();
        assert_eq!(policy, GasPolicy::PriorityTip);
    }
}
