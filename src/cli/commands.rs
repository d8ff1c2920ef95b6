//! CLI command definitions using clap.
//!
//! - run: broadcast until Ctrl-C or a tick limit
//! - accounts: show the addresses derived from a key file
//! - chains: list chain presets

use clap::{Args, Parser, Subcommand, ValueEnum};
use polaris::domain::{DestinationMode, GasPolicy};
use std::path::PathBuf;

/// Polaris - repeatedly broadcasts a fixed transaction payload from a set of accounts
#[derive(Parser, Debug)]
#[command(name = "polaris")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start broadcasting; stops on Ctrl-C or after --ticks
    Run(RunArgs),

    /// List the addresses derived from a key file
    Accounts {
        /// File with one private key per line, or - for stdin
        #[arg(short, long)]
        keys: PathBuf,
    },

    /// List chain presets
    Chains,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// File with one private key per line, or - for stdin
    #[arg(short, long)]
    pub keys: PathBuf,

    /// Destination of each transaction
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Recipient address for single mode
    #[arg(long)]
    pub to: Option<String>,

    /// Payload: 0x-prefixed hex, or text sent as UTF-8
    #[arg(short, long)]
    pub data: Option<String>,

    /// Ether sent with each transaction
    #[arg(long)]
    pub value: Option<String>,

    /// How --gas is applied
    #[arg(long, value_enum)]
    pub gas_policy: Option<GasPolicyArg>,

    /// Gas in gwei; 0 lets the node decide
    #[arg(short, long)]
    pub gas: Option<String>,

    /// Milliseconds between ticks
    #[arg(short, long)]
    pub interval_ms: Option<u64>,

    /// RPC endpoint (http, https, ws or wss).
    ///
    /// Transactions go out as eth_sendTransaction, so the node must hold the
    /// account keys. Public chain endpoints reject this.
    #[arg(long)]
    pub rpc: Option<String>,

    /// Chain preset name
    #[arg(long)]
    pub chain: Option<String>,

    /// Stop after this many ticks
    #[arg(long)]
    pub ticks: Option<u64>,

    /// Submit to a local mock client instead of the network
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// Every account sends to itself
    #[value(name = "self", alias = "me-to-me")]
    SelfReturn,
    /// Every account sends to --to
    #[value(name = "single", alias = "many-to-one")]
    Single,
}

impl From<ModeArg> for DestinationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::SelfReturn => DestinationMode::SelfReturn,
            ModeArg::Single => DestinationMode::SingleRecipient,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasPolicyArg {
    /// Flat gas price
    #[value(alias = "all")]
    Legacy,
    /// Priority fee only
    Tip,
}

impl From<GasPolicyArg> for GasPolicy {
    fn from(policy: GasPolicyArg) -> Self {
        match policy {
            GasPolicyArg::Legacy => GasPolicy::Legacy,
            GasPolicyArg::Tip => GasPolicy::PriorityTip,
        }
    }
}
