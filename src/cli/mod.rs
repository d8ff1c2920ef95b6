//! CLI module for polaris - command-line interface and subcommands.
//!
//! Also folds `run` flags over the loaded config and reads key files.

pub mod commands;

pub use commands::{Cli, Commands, RunArgs};

use eyre::{Context, Result};
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::config::Config;

impl RunArgs {
    /// Override config values with the flags that were given
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.run.mode = mode.into();
        }
        if let Some(to) = &self.to {
            config.run.recipient = to.clone();
        }
        if let Some(data) = &self.data {
            config.run.payload = data.clone();
        }
        if let Some(value) = &self.value {
            config.run.value = value.clone();
        }
        if let Some(policy) = self.gas_policy {
            config.run.gas_policy = policy.into();
        }
        if let Some(gas) = &self.gas {
            config.run.gas = gas.clone();
        }
        if let Some(interval_ms) = self.interval_ms {
            config.run.tick_interval_ms = interval_ms;
        }
        if let Some(chain) = &self.chain {
            config.chain = chain.clone();
        }
        if let Some(rpc) = &self.rpc {
            config.rpc.url = Some(rpc.clone());
        }
    }
}

/// Read key lines from a file, or from stdin when `path` is `-`
pub fn read_key_lines(path: &Path) -> Result<Vec<String>> {
    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read keys from stdin")?;
        buf
    } else {
        fs::read_to_string(path).context(format!("Failed to read keys from {}", path.display()))?
    };
    Ok(content.lines().map(str::to_string).collect())
}
