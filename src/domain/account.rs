//! Signing accounts derived from raw key lines.

use std::fmt;
use std::sync::Arc;

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use super::address::Address;

/// Opaque signing capability for one account.
///
/// Holds the secp256k1 key; never printed.
pub struct Signer {
    key: SigningKey,
}

impl Signer {
    /// Address this key authorizes for
    pub fn address(&self) -> Address {
        Address::from_signing_key(&self.key)
    }

    /// SEC1 compressed public key (33 bytes)
    pub fn public_key(&self) -> Vec<u8> {
        self.key.verifying_key().as_affine().to_encoded_point(true).as_bytes().to_vec()
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Signer(..)")
    }
}

/// One signing identity: an address plus the capability to authorize from it
#[derive(Debug, Clone)]
pub struct Account {
    pub address: Address,
    signer: Arc<Signer>,
}

impl Account {
    /// Derive an account from a 32-byte secret.
    ///
    /// Returns `None` when the bytes are not a valid secp256k1 scalar
    /// (zero, or not below the curve order).
    pub fn from_secret(secret: &[u8; 32]) -> Option<Self> {
        let signer = Signer {
            key: SigningKey::from_slice(secret).ok()?,
        };
        Some(Self {
            address: signer.address(),
            signer: Arc::new(signer),
        })
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }
}

/// Read a key line: 64 hex characters, with or without a `0x` prefix
pub fn parse_key_line(line: &str) -> Option<[u8; 32]> {
    let key = line.trim();
    let body = key.strip_prefix("0x").unwrap_or(key);
    if body.len() != 64 {
        return None;
    }

    let mut secret = [0u8; 32];
    hex::decode_to_slice(body, &mut secret).ok()?;
    Some(secret)
}

/// Ordered accounts for one run, in key input order
#[derive(Debug, Clone, Default)]
pub struct AccountSet {
    accounts: Vec<Account>,
}

impl AccountSet {
    /// Derive accounts from raw key lines.
    ///
    /// Malformed lines are dropped without error. Duplicates are kept.
    pub fn parse<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut accounts = Vec::new();
        for (index, line) in lines.into_iter().enumerate() {
            let Some(secret) = parse_key_line(line.as_ref()) else {
                continue;
            };
            match Account::from_secret(&secret) {
                Some(account) => accounts.push(account),
                None => log::warn!("Key on line {} is not a valid secp256k1 scalar, skipping", index + 1),
            }
        }

        log::debug!("Parsed {} accounts", accounts.len());
        Self { accounts }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Account> {
        self.accounts.get(index)
    }

    /// Addresses in input order
    pub fn addresses(&self) -> Vec<Address> {
        self.accounts.iter().map(|a| a.address).collect()
    }
}

impl<'a> IntoIterator for &'a AccountSet {
    type Item = &'a Account;
    type IntoIter = std::slice::Iter<'a, Account>;

    fn into_iter(self) -> Self::IntoIter {
        self.accounts.iter()
    }
}
