//! Configuration module
//!
//! Loads settings from a TOML file, then applies `.env` and environment
//! variable overrides. Every section has defaults, so an empty file (or no
//! file) yields a working devnet configuration.

use crate::confirmation::{ConfirmStrategy, PollPolicy, TrackerConfig};
use crate::rpc_manager::{Cluster, RpcEndpointConfig};
use crate::types::ConfirmationStatus;
use crate::wallet::DEFAULT_PAYER_ENV;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_RPC_URL: &str = "SOLCONFIRM_RPC_URL";
pub const ENV_WS_URL: &str = "SOLCONFIRM_WS_URL";
pub const ENV_COMMITMENT: &str = "SOLCONFIRM_COMMITMENT";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Ledger node endpoints
    #[serde(default)]
    pub rpc: RpcEndpointConfig,

    /// Confirmation tracking
    #[serde(default)]
    pub confirmation: ConfirmationConfig,

    /// Payer credentials
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    /// Status a signature must reach to count as confirmed
    #[serde(default = "default_commitment")]
    pub commitment: ConfirmationStatus,

    /// Delay between status queries in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Status queries before polling gives up
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Bound on a single status query in milliseconds
    #[serde(default = "default_poll_query_timeout_ms")]
    pub poll_query_timeout_ms: u64,

    /// Subscription wait bound in seconds
    #[serde(default = "default_subscription_timeout")]
    pub subscription_timeout_secs: u64,

    /// Strategy for the transfer command when none is given
    #[serde(default)]
    pub strategy: ConfirmStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Environment variable holding the base58 payer secret
    #[serde(default = "default_payer_env")]
    pub payer_env: String,

    /// Keypair file used instead of the environment variable when set
    #[serde(default)]
    pub keypair_path: Option<String>,
}

// Default value functions
fn default_commitment() -> ConfirmationStatus { ConfirmationStatus::Finalized }
fn default_poll_interval_ms() -> u64 { 1_000 }
fn default_max_poll_attempts() -> u32 { 20 }
fn default_poll_query_timeout_ms() -> u64 { 5_000 }
fn default_subscription_timeout() -> u64 { 30 }
fn default_payer_env() -> String { DEFAULT_PAYER_ENV.to_string() }

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            commitment: default_commitment(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            poll_query_timeout_ms: default_poll_query_timeout_ms(),
            subscription_timeout_secs: default_subscription_timeout(),
            strategy: ConfirmStrategy::default(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            payer_env: default_payer_env(),
            keypair_path: None,
        }
    }
}

impl ConfirmationConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.poll_interval_ms),
            self.max_poll_attempts,
        )
        .with_query_timeout(Duration::from_millis(self.poll_query_timeout_ms))
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            target: self.commitment,
            poll: self.poll_policy(),
            subscription_timeout: Duration::from_secs(self.subscription_timeout_secs),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    /// Load configuration with `.env` and environment variable overrides.
    ///
    /// A missing file falls back to defaults; a malformed one is an error.
    pub fn from_file_with_env(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.rpc.url = url;
        }
        if let Some(url) = lookup(ENV_WS_URL) {
            self.rpc.ws_url = url;
        }
        if let Some(level) = lookup(ENV_COMMITMENT) {
            self.confirmation.commitment = level
                .parse()
                .map_err(|e: String| anyhow::anyhow!("{}: {}", ENV_COMMITMENT, e))?;
        }
        Ok(())
    }

    /// Point both endpoints at a cluster preset
    pub fn use_cluster(&mut self, cluster: Cluster) {
        self.rpc.url = cluster.http_url().to_string();
        self.rpc.ws_url = cluster.ws_url().to_string();
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.rpc.validate().map_err(anyhow::Error::msg)?;
        let c = &self.confirmation;
        if c.commitment == ConfirmationStatus::Unknown {
            anyhow::bail!("confirmation.commitment must be processed, confirmed or finalized");
        }
        if c.poll_interval_ms == 0 {
            anyhow::bail!("confirmation.poll_interval_ms must be > 0");
        }
        if c.max_poll_attempts == 0 {
            anyhow::bail!("confirmation.max_poll_attempts must be > 0");
        }
        if c.poll_query_timeout_ms == 0 {
            anyhow::bail!("confirmation.poll_query_timeout_ms must be > 0");
        }
        if c.subscription_timeout_secs == 0 {
            anyhow::bail!("confirmation.subscription_timeout_secs must be > 0");
        }
        if self.wallet.payer_env.trim().is_empty() && self.wallet.keypair_path.is_none() {
            anyhow::bail!("wallet needs either payer_env or keypair_path");
        }
        Ok(())
    }
}
