//! Named EVM chain presets.

use std::fmt;

/// Chain used when neither config nor flags name one
pub const DEFAULT_CHAIN: &str = "bsc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chain {
    pub name: &'static str,
    pub chain_id: u64,
    /// Public RPC endpoint used when none is configured
    pub rpc_url: &'static str,
    /// Native currency symbol
    pub symbol: &'static str,
    pub aliases: &'static [&'static str],
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.chain_id)
    }
}

pub const CHAINS: &[Chain] = &[
    Chain {
        name: "bsc",
        chain_id: 56,
        rpc_url: "https://bsc-dataseed.binance.org",
        symbol: "BNB",
        aliases: &["bnb", "binance"],
    },
    Chain {
        name: "mainnet",
        chain_id: 1,
        rpc_url: "https://cloudflare-eth.com",
        symbol: "ETH",
        aliases: &["eth", "ethereum"],
    },
    Chain {
        name: "polygon",
        chain_id: 137,
        rpc_url: "https://polygon-rpc.com",
        symbol: "POL",
        aliases: &["matic"],
    },
    Chain {
        name: "arbitrum",
        chain_id: 42161,
        rpc_url: "https://arb1.arbitrum.io/rpc",
        symbol: "ETH",
        aliases: &["arb"],
    },
    Chain {
        name: "optimism",
        chain_id: 10,
        rpc_url: "https://mainnet.optimism.io",
        symbol: "ETH",
        aliases: &["op"],
    },
    Chain {
        name: "base",
        chain_id: 8453,
        rpc_url: "https://mainnet.base.org",
        symbol: "ETH",
        aliases: &[],
    },
    Chain {
        name: "avalanche",
        chain_id: 43114,
        rpc_url: "https://api.avax.network/ext/bc/C/rpc",
        symbol: "AVAX",
        aliases: &["avax"],
    },
];

/// Find a preset by name or alias, ignoring case
pub fn lookup(name: &str) -> Option<&'static Chain> {
    let name = name.trim().to_ascii_lowercase();
    CHAINS
        .iter()
        .find(|chain| chain.name == name || chain.aliases.contains(&name.as_str()))
}

/// Find a preset by chain id
pub fn by_id(chain_id: u64) -> Option<&'static Chain> {
    CHAINS.iter().find(|chain| chain.chain_id == chain_id)
}

pub fn default_chain() -> &'static Chain {
    &CHAINS[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chain_is_bsc() {
        let chain = default_chain();
        assert_eq!(chain.name, DEFAULT_CHAIN);
        assert_eq!(chain.chain_id, 56);
        assert_eq!(chain.rpc_url, "https://bsc-dataseed.binance.org");
    }

    #[test]
    fn test_lookup_by_name_and_alias() {
        assert_eq!(lookup("mainnet").unwrap().chain_id, 1);
        assert_eq!(lookup("ETH").unwrap().chain_id, 1);
        assert_eq!(lookup(" Binance ").unwrap().chain_id, 56);
        assert!(lookup("solana").is_none());
    }

    #[test]
    fn test_by_id() {
        assert_eq!(by_id(137).unwrap().name, "polygon");
        assert!(by_id(0).is_none());
    }

    #[test]
    fn test_names_and_ids_are_unique() {
        for (i, a) in CHAINS.iter().enumerate() {
            for b in &CHAINS[i + 1..] {
                assert_ne!(a.name, b.name);
                assert_ne!(a.chain_id, b.chain_id);
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(default_chain().to_string(), "bsc (56)");
    }
}
