//! Fixed-point amounts held in wei.

use std::fmt;

use thiserror::Error;

/// Decimals of one ether
pub const ETHER_DECIMALS: u32 = 18;

/// Decimals of one gwei
pub const GWEI_DECIMALS: u32 = 9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("'{0}' is not a decimal number")]
    NotDecimal(String),

    #[error("'{0}' has more than {1} decimal places")]
    TooPrecise(String, u32),

    #[error("'{0}' is too large")]
    Overflow(String),
}

/// An amount in the chain's smallest unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_wei(wei: u128) -> Self {
        Self(wei)
    }

    /// Parse a decimal ether amount, e.g. `0.00182`
    pub fn from_ether(input: &str) -> Result<Self, AmountError> {
        parse_units(input, ETHER_DECIMALS).map(Self)
    }

    /// Parse a decimal gwei amount, e.g. `1.5`
    pub fn from_gwei(input: &str) -> Result<Self, AmountError> {
        parse_units(input, GWEI_DECIMALS).map(Self)
    }

    pub fn wei(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// JSON-RPC quantity encoding (`0x0`, `0x1a`, ...)
    pub fn to_quantity(&self) -> String {
        format!("{:#x}", self.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}

/// Scale a decimal string by `10^decimals` into an integer
pub fn parse_units(input: &str, decimals: u32) -> Result<u128, AmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match input.split_once('.') {
        Some((w, f)) => (w, f),
        None => (input, ""),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(AmountError::NotDecimal(input.to_string()));
    }

    if fraction.len() > decimals as usize {
        return Err(AmountError::TooPrecise(input.to_string(), decimals));
    }

    let overflow = || AmountError::Overflow(input.to_string());
    let scale = 10u128.checked_pow(decimals).ok_or_else(overflow)?;

    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| overflow())?
    };

    let fraction_value = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = decimals as usize);
        padded.parse::<u128>().map_err(|_| overflow())?
    };

    whole_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction_value))
        .ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ether() {
        assert_eq!(Amount::from_ether("0.00182").unwrap().wei(), 1_820_000_000_000_000);
        assert_eq!(Amount::from_ether("1").unwrap().wei(), 1_000_000_000_000_000_000);
        assert_eq!(Amount::from_ether("0").unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_from_gwei() {
        assert_eq!(Amount::from_gwei("1").unwrap().wei(), 1_000_000_000);
        assert_eq!(Amount::from_gwei("1.5").unwrap().wei(), 1_500_000_000);
        assert_eq!(Amount::from_gwei(".5").unwrap().wei(), 500_000_000);
        assert_eq!(Amount::from_gwei("3.").unwrap().wei(), 3_000_000_000);
    }

    #[test]
    fn test_parse_units_errors() {
        assert_eq!(parse_units("", 9), Err(AmountError::Empty));
        assert_eq!(parse_units("  ", 9), Err(AmountError::Empty));
        assert!(matches!(parse_units("-1", 9), Err(AmountError::NotDecimal(_))));
        assert!(matches!(parse_units("1e9", 9), Err(AmountError::NotDecimal(_))));
        assert!(matches!(parse_units(".", 9), Err(AmountError::NotDecimal(_))));
        assert!(matches!(parse_units("1.2.3", 9), Err(AmountError::NotDecimal(_))));
        assert!(matches!(parse_units("0.0000000001", 9), Err(AmountError::TooPrecise(_, 9))));
        assert!(matches!(
            parse_units("999999999999999999999999999999999", 18),
            Err(AmountError::Overflow(_))
        ));
    }

    #[test]
    fn test_to_quantity() {
        assert_eq!(Amount::ZERO.to_quantity(), "0x0");
        assert_eq!(Amount::from_wei(26).to_quantity(), "0x1a");
        assert_eq!(Amount::from_gwei("1").unwrap().to_quantity(), "0x3b9aca00");
    }
}
