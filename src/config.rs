//! Configuration module for the EMARK client
//!
//! This module handles configuration loading from TOML files and
//! environment variables, and provides structured configuration types.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::types::parse_address;

/// Errors raised while validating configuration or building the remote
/// access context
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing address for contract {contract}")]
    MissingAddress { contract: String },

    #[error("Malformed address for contract {contract}: {value}")]
    InvalidAddress { contract: String, value: String },

    #[error("Zero address configured for contract {contract}")]
    ZeroAddress { contract: String },

    #[error("Invalid interface descriptor for {contract}: {reason}")]
    InterfaceDescriptor { contract: String, reason: String },

    #[error("Unknown contract in ABI overrides: {0}")]
    UnknownContract(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chain identity
    pub chain: ChainConfig,

    /// Contract address book
    pub contracts: ContractsConfig,

    /// Transaction executor tuning
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// State cache tuning
    #[serde(default)]
    pub cache: CacheConfig,

    /// Delegation module tuning
    #[serde(default)]
    pub delegation: DelegationConfig,

    /// Logging output
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// EVM chain id (8453 for Base mainnet)
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Human-readable chain name
    #[serde(default = "default_chain_name")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// Liquid EMARK ERC-20
    #[serde(default)]
    pub emark_token: String,

    /// Staked wEMARK and voting-power ledger
    #[serde(default)]
    pub wemark: String,

    /// Cycle and delegation accounting
    #[serde(default)]
    pub evermark_voting: String,

    /// Reward distribution
    #[serde(default)]
    pub evermark_rewards: String,

    /// Optional JSON ABI files keyed by contract id ("EVERMARK_VOTING")
    #[serde(default)]
    pub abi_overrides: HashMap<String, PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Attempts made by `execute_with_retry`, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base retry delay in milliseconds, doubled on each retry
    #[serde(default = "default_base_retry_delay_ms")]
    pub base_retry_delay_ms: u64,

    /// Upper bound on a single retry delay in milliseconds
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,

    /// Wallet confirmation timeout; unset means wait for the user
    #[serde(default)]
    pub submit_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Serve memoized snapshots from `load` until invalidated
    #[serde(default = "default_true")]
    pub memoize: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationConfig {
    /// Delay before the follow-up cache refresh after a successful write
    #[serde(default = "default_refresh_delay_ms")]
    pub refresh_delay_ms: u64,

    /// Largest batch accepted by `delegate_batch`
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

// Default value functions
fn default_chain_id() -> u64 { 8453 }
fn default_chain_name() -> String { "base".to_string() }
fn default_max_attempts() -> u32 { 3 }
fn default_base_retry_delay_ms() -> u64 { 2_000 }
fn default_max_retry_delay_ms() -> u64 { 30_000 }
fn default_refresh_delay_ms() -> u64 { 2_000 }
fn default_max_batch_size() -> usize { 50 }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            name: default_chain_name(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_retry_delay_ms: default_base_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            submit_timeout_secs: None,
        }
    }
}

impl ExecutorConfig {
    pub fn submit_timeout(&self) -> Option<Duration> {
        self.submit_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { memoize: default_true() }
    }
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            refresh_delay_ms: default_refresh_delay_ms(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

impl DelegationConfig {
    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse configuration TOML")?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from the environment; `lookup` is injectable for tests
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides: [(&str, &mut String); 5] = [
            ("EMARK_TOKEN_ADDRESS", &mut self.contracts.emark_token),
            ("WEMARK_ADDRESS", &mut self.contracts.wemark),
            ("EVERMARK_VOTING_ADDRESS", &mut self.contracts.evermark_voting),
            ("EVERMARK_REWARDS_ADDRESS", &mut self.contracts.evermark_rewards),
            ("EMARK_LOG_LEVEL", &mut self.logging.level),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                tracing::debug!(key, "configuration overridden from environment");
                *slot = value.trim().to_string();
            }
        }
    }

    /// Check values that serde defaults cannot enforce
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.contracts.validate()?;
        if self.executor.max_attempts == 0 {
            return Err(ConfigError::Invalid("executor.max_attempts must be at least 1".into()));
        }
        if self.executor.base_retry_delay_ms > self.executor.max_retry_delay_ms {
            return Err(ConfigError::Invalid(
                "executor.base_retry_delay_ms exceeds executor.max_retry_delay_ms".into(),
            ));
        }
        if self.delegation.max_batch_size == 0 {
            return Err(ConfigError::Invalid("delegation.max_batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

impl ContractsConfig {
    /// Address entries keyed by contract id
    pub fn entries(&self) -> [(&'static str, &str); 4] {
        [
            ("EMARK_TOKEN", self.emark_token.as_str()),
            ("WEMARK", self.wemark.as_str()),
            ("EVERMARK_VOTING", self.evermark_voting.as_str()),
            ("EVERMARK_REWARDS", self.evermark_rewards.as_str()),
        ]
    }

    /// Reject missing, malformed or zero addresses
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (contract, value) in self.entries() {
            check_address(contract, value)?;
        }
        for key in self.abi_overrides.keys() {
            if !self.entries().iter().any(|(id, _)| id == key) {
                return Err(ConfigError::UnknownContract(key.clone()));
            }
        }
        Ok(())
    }
}

pub(crate) fn check_address(contract: &str, value: &str) -> Result<ethers::types::Address, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingAddress {
            contract: contract.to_string(),
        });
    }
    let address = parse_address(value).ok_or_else(|| ConfigError::InvalidAddress {
        contract: contract.to_string(),
        value: value.to_string(),
    })?;
    if address.is_zero() {
        return Err(ConfigError::ZeroAddress {
            contract: contract.to_string(),
        });
    }
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[chain]
chain_id = 8453
name = "base"

[contracts]
emark_token = "0x1111111111111111111111111111111111111111"
wemark = "0x2222222222222222222222222222222222222222"
evermark_voting = "0x3333333333333333333333333333333333333333"
evermark_rewards = "0x4444444444444444444444444444444444444444"

[delegation]
refresh_delay_ms = 1500
"#;

    #[test]
    fn test_parse_with_defaults() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.chain.chain_id, 8453);
        assert_eq!(config.executor.max_attempts, 3);
        assert_eq!(config.executor.base_retry_delay_ms, 2_000);
        assert!(config.executor.submit_timeout().is_none());
        assert_eq!(config.delegation.refresh_delay(), Duration::from_millis(1500));
        assert_eq!(config.delegation.max_batch_size, 50);
        assert!(config.cache.memoize);
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.contracts.wemark, "0x2222222222222222222222222222222222222222");
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = Config::from_file("/nonexistent/emark.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_validation_rejects_bad_addresses() {
        let mut config = Config::from_toml_str(SAMPLE).unwrap();
        config.contracts.wemark = String::new();
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingAddress { contract: "WEMARK".into() })
        );

        config.contracts.wemark = "0x1234".into();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidAddress { .. })));

        config.contracts.wemark = format!("0x{}", "0".repeat(40));
        assert!(matches!(config.validate(), Err(ConfigError::ZeroAddress { .. })));
    }

    #[test]
    fn test_validation_rejects_zero_attempts() {
        let mut config = Config::from_toml_str(SAMPLE).unwrap();
        config.executor.max_attempts = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::from_toml_str(SAMPLE).unwrap();
        config.apply_env_overrides(|key| match key {
            "EVERMARK_VOTING_ADDRESS" => Some("0x5555555555555555555555555555555555555555".into()),
            "EMARK_LOG_LEVEL" => Some("debug".into()),
            _ => None,
        });
        assert_eq!(config.contracts.evermark_voting, "0x5555555555555555555555555555555555555555");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.contracts.emark_token, "0x1111111111111111111111111111111111111111");
    }
}
