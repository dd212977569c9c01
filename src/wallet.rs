//! Payer credential loading
//!
//! The fee payer comes either from a base58-encoded 64-byte secret in an
//! environment variable (read through `.env` when present) or from a Solana
//! CLI style JSON keypair file. Decoded secret bytes are zeroized on drop.

use anyhow::{Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::path::Path;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Environment variable holding the payer secret by default
pub const DEFAULT_PAYER_ENV: &str = "payerKey";

const KEYPAIR_LEN: usize = 64;

/// Holds the payer keypair
#[derive(Clone)]
pub struct Wallet {
    keypair: Arc<Keypair>,
}

impl Wallet {
    /// Decode a base58 secret key
    pub fn from_base58(encoded: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            bs58::decode(encoded.trim())
                .into_vec()
                .context("Payer key is not valid base58")?,
        );
        Self::from_secret_bytes(&bytes)
    }

    /// Read a base58 secret key from `var`, loading `.env` first
    pub fn from_env(var: &str) -> Result<Self> {
        dotenvy::dotenv().ok();
        let encoded = Zeroizing::new(
            std::env::var(var)
                .with_context(|| format!("Environment variable {} is not set", var))?,
        );
        Self::from_base58(&encoded)
    }

    /// Load a keypair file (JSON byte array or 64 raw bytes)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = Zeroizing::new(
            std::fs::read(path)
                .with_context(|| format!("Failed to read keypair file: {}", path.display()))?,
        );

        if raw.len() == KEYPAIR_LEN {
            return Self::from_secret_bytes(&raw);
        }

        let json: Zeroizing<Vec<u8>> = Zeroizing::new(
            serde_json::from_slice(&raw).context("Failed to parse keypair JSON")?,
        );
        Self::from_secret_bytes(&json)
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEYPAIR_LEN {
            anyhow::bail!(
                "Invalid keypair length: expected {} bytes, got {}",
                KEYPAIR_LEN,
                bytes.len()
            );
        }
        if bytes.iter().all(|&b| b == 0) {
            anyhow::bail!("Invalid keypair: all-zero key rejected");
        }
        let keypair = Keypair::try_from(bytes).context("Invalid keypair bytes")?;
        Ok(Self::from_keypair(keypair))
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("pubkey", &self.pubkey())
            .finish()
    }
}
