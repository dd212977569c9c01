use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Well-known cluster presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    Devnet,
    Testnet,
    Mainnet,
    Localnet,
}

impl Cluster {
    pub fn http_url(&self) -> &'static str {
        match self {
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::Mainnet => "https://api.mainnet-beta.solana.com",
            Cluster::Localnet => "http://127.0.0.1:8899",
        }
    }

    pub fn ws_url(&self) -> &'static str {
        match self {
            Cluster::Devnet => "wss://api.devnet.solana.com",
            Cluster::Testnet => "wss://api.testnet.solana.com",
            Cluster::Mainnet => "wss://api.mainnet-beta.solana.com",
            Cluster::Localnet => "ws://127.0.0.1:8900",
        }
    }
}

impl Default for Cluster {
    fn default() -> Self {
        Cluster::Devnet
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::Mainnet => "mainnet",
            Cluster::Localnet => "localnet",
        };
        f.write_str(name)
    }
}

impl FromStr for Cluster {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "mainnet" | "mainnet-beta" => Ok(Cluster::Mainnet),
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            other => Err(format!("unknown cluster '{}'", other)),
        }
    }
}

/// Configuration for the ledger node connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcEndpointConfig {
    /// JSON-RPC endpoint URL
    pub url: String,

    /// Pubsub (websocket) endpoint URL
    pub ws_url: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Sustained request rate (requests per second)
    #[serde(default = "default_rate_limit")]
    pub rate_limit_rps: u32,

    /// Requests allowed in a burst above the sustained rate
    #[serde(default = "default_burst")]
    pub rate_limit_burst: u32,

    /// Skip preflight simulation on `sendTransaction`
    #[serde(default)]
    pub skip_preflight: bool,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_rate_limit() -> u32 {
    1
}

fn default_burst() -> u32 {
    5
}

impl RpcEndpointConfig {
    pub fn for_cluster(cluster: Cluster) -> Self {
        Self::from_urls(cluster.http_url(), cluster.ws_url())
    }

    pub fn from_urls(url: impl Into<String>, ws_url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ws_url: ws_url.into(),
            timeout_ms: default_timeout_ms(),
            rate_limit_rps: default_rate_limit(),
            rate_limit_burst: default_burst(),
            skip_preflight: false,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(format!("Invalid RPC URL format: {}", self.url));
        }
        if !self.ws_url.starts_with("ws://") && !self.ws_url.starts_with("wss://") {
            return Err(format!("Invalid websocket URL format: {}", self.ws_url));
        }
        if self.timeout_ms == 0 {
            return Err("RPC timeout must be > 0".to_string());
        }
        if self.rate_limit_rps == 0 || self.rate_limit_burst == 0 {
            return Err(format!(
                "Invalid rate limit for {}: rps and burst must be > 0",
                self.url
            ));
        }
        Ok(())
    }
}

impl Default for RpcEndpointConfig {
    fn default() -> Self {
        Self::for_cluster(Cluster::default())
    }
}
