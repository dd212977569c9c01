//! RPC Manager Module
//!
//! Ledger node access for the submission pipeline: blockhash and rent lookups,
//! transaction submission, signature status queries and the read-only
//! account/block/transaction queries.

use crate::types::{RecentBlockhash, SignatureStatus};
use async_trait::async_trait;
use solana_sdk::{signature::Signature, transaction::Transaction};
use std::sync::Arc;

// Submodules
pub mod rpc_client;
pub mod rpc_config;
pub mod rpc_errors;

// Re-exports for convenience
pub use rpc_client::SolanaRpc;
pub use rpc_config::{Cluster, RpcEndpointConfig};
pub use rpc_errors::RpcManagerError;

/// The node operations the pipeline depends on.
///
/// Implemented by [`SolanaRpc`] for a real node; tests supply in-memory fakes.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Endpoint label used in errors and logs
    fn endpoint(&self) -> &str;

    /// Fetch a fresh blockhash; called immediately before every build
    async fn latest_blockhash(&self) -> Result<RecentBlockhash, RpcManagerError>;

    /// Minimum lamports for an account of `data_len` bytes to be rent-exempt
    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, RpcManagerError>;

    /// Submit signed bytes once.
    ///
    /// The returned signature is only an acknowledgement of receipt, not of
    /// inclusion. Resubmitting the same transaction is a new attempt.
    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, RpcManagerError>;

    /// Current status of `signature`, or `None` if the node has no record yet
    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcManagerError>;
}

#[async_trait]
impl<T: LedgerRpc + ?Sized> LedgerRpc for Arc<T> {
    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }

    async fn latest_blockhash(&self) -> Result<RecentBlockhash, RpcManagerError> {
        (**self).latest_blockhash().await
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, RpcManagerError> {
        (**self).minimum_balance_for_rent_exemption(data_len).await
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, RpcManagerError> {
        (**self).send_transaction(tx).await
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcManagerError> {
        (**self).signature_status(signature).await
    }
}
