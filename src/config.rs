use eyre::{Context, Result, eyre};
use polaris::chains::{self, Chain};
use polaris::client::Scheme;
use polaris::controller::ControllerSettings;
use polaris::dispatch::DispatchConfig;
use polaris::domain::{DEFAULT_LOG_CAPACITY, DestinationMode, GasPolicy, RunDraft};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Recipient used by many-to-one runs when none is configured
pub const DEFAULT_RECIPIENT: &str = "0x1832e00DfF829547E1F564f92401C2886F3236b4";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub chain: String,
    pub rpc: RpcConfig,
    pub run: RunDefaults,
    pub dispatch: DispatchSection,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Overrides the chain preset's endpoint
    pub url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: 30000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunDefaults {
    pub mode: DestinationMode,
    pub recipient: String,
    pub payload: String,
    /// Ether sent with each transaction
    pub value: String,
    pub gas_policy: GasPolicy,
    /// Gwei; 0 leaves gas pricing to the node
    pub gas: String,
    pub tick_interval_ms: u64,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            mode: DestinationMode::SingleRecipient,
            recipient: DEFAULT_RECIPIENT.to_string(),
            payload: String::new(),
            value: "0.00182".to_string(),
            gas_policy: GasPolicy::Legacy,
            gas: "1".to_string(),
            tick_interval_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSection {
    /// 0 submits for every account at once
    pub max_in_flight: usize,
    pub submit_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub capacity: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            chain: chains::DEFAULT_CHAIN.to_string(),
            rpc: RpcConfig::default(),
            run: RunDefaults::default(),
            dispatch: DispatchSection::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");
        let file_name = format!("{}.yml", project_name);

        // Primary location: ~/.config/polaris/polaris.yml
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(&file_name);
            if let Some(config) = Self::try_load(&primary_config) {
                return Ok(config);
            }
        }

        // Fallback location: ./polaris.yml
        if let Some(config) = Self::try_load(Path::new(&file_name)) {
            return Ok(config);
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn try_load(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config from {}: {}", path.display(), e);
                None
            }
        }
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject settings no run could use
    pub fn validate(&self) -> Result<()> {
        self.chain_preset()?;
        if self.rpc.timeout_ms == 0 {
            return Err(eyre!("rpc.timeout_ms must be greater than 0"));
        }
        if self.log.capacity == 0 {
            return Err(eyre!("log.capacity must be greater than 0"));
        }
        if self.dispatch.submit_timeout_ms == Some(0) {
            return Err(eyre!("dispatch.submit_timeout_ms must be greater than 0"));
        }
        if let Some(url) = &self.rpc.url {
            Scheme::of(url).context("Invalid rpc.url")?;
        }
        Ok(())
    }

    pub fn chain_preset(&self) -> Result<&'static Chain> {
        chains::lookup(&self.chain).ok_or_else(|| eyre!("Unknown chain '{}'", self.chain))
    }

    /// Configured endpoint, else the chain preset's
    pub fn rpc_url(&self) -> Result<String> {
        match &self.rpc.url {
            Some(url) => Ok(url.clone()),
            None => Ok(self.chain_preset()?.rpc_url.to_string()),
        }
    }

    /// True when no endpoint is configured and the public preset is used.
    ///
    /// Public endpoints hold no keys and reject `eth_sendTransaction`.
    pub fn uses_preset_endpoint(&self) -> bool {
        self.rpc.url.is_none()
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc.timeout_ms)
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        let mut dispatch = DispatchConfig::default().with_max_in_flight(self.dispatch.max_in_flight);
        if let Some(ms) = self.dispatch.submit_timeout_ms {
            dispatch = dispatch.with_submit_timeout(Duration::from_millis(ms));
        }
        ControllerSettings {
            log_capacity: self.log.capacity,
            dispatch,
        }
    }

    /// Draft for a run over `key_lines` using the configured run defaults
    pub fn draft(&self, key_lines: Vec<String>) -> RunDraft {
        RunDraft {
            key_lines,
            mode: self.run.mode,
            recipient: self.run.recipient.clone(),
            payload: self.run.payload.clone(),
            value: self.run.value.clone(),
            gas_policy: self.run.gas_policy,
            gas: self.run.gas.clone(),
            tick_interval_ms: self.run.tick_interval_ms,
        }
    }
}
