//! Rate-limited ledger node client
//!
//! Wraps one shared nonblocking `RpcClient`. Every call waits on a governor
//! limiter, records its latency and maps `ClientError` into
//! [`RpcManagerError`] with the endpoint attached.

use crate::metrics::{metrics, Timer};
use crate::queries::{AccountReport, BalanceReport, BlockReport, TransactionReport};
use crate::rpc_manager::rpc_config::RpcEndpointConfig;
use crate::rpc_manager::rpc_errors::RpcManagerError;
use crate::rpc_manager::LedgerRpc;
use crate::types::{ConfirmationStatus, RecentBlockhash, SignatureStatus};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcBlockConfig, RpcSendTransactionConfig, RpcTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use solana_transaction_status::{TransactionDetails, UiTransactionEncoding};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub struct SolanaRpc {
    client: Arc<RpcClient>,
    config: RpcEndpointConfig,
    commitment: CommitmentConfig,
    limiter: DefaultDirectRateLimiter,
}

impl std::fmt::Debug for SolanaRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaRpc")
            .field("url", &self.config.url)
            .field("commitment", &self.commitment.commitment)
            .finish_non_exhaustive()
    }
}

impl SolanaRpc {
    /// Connect to `config.url`. No network traffic happens until the first call.
    pub fn new(
        config: RpcEndpointConfig,
        commitment: CommitmentConfig,
    ) -> Result<Self, RpcManagerError> {
        config.validate().map_err(RpcManagerError::Validation)?;
        let client = RpcClient::new_with_timeout_and_commitment(
            config.url.clone(),
            Duration::from_millis(config.timeout_ms),
            commitment,
        );
        Self::with_client(Arc::new(client), config, commitment)
    }

    /// Reuse an existing connection
    pub fn with_client(
        client: Arc<RpcClient>,
        config: RpcEndpointConfig,
        commitment: CommitmentConfig,
    ) -> Result<Self, RpcManagerError> {
        let rps = NonZeroU32::new(config.rate_limit_rps)
            .ok_or_else(|| RpcManagerError::Validation("rate_limit_rps must be > 0".into()))?;
        let burst = NonZeroU32::new(config.rate_limit_burst)
            .ok_or_else(|| RpcManagerError::Validation("rate_limit_burst must be > 0".into()))?;
        let limiter = RateLimiter::direct(Quota::per_second(rps).allow_burst(burst));

        Ok(Self {
            client,
            config,
            commitment,
            limiter,
        })
    }

    pub fn client(&self) -> &Arc<RpcClient> {
        &self.client
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.commitment
    }

    pub fn config(&self) -> &RpcEndpointConfig {
        &self.config
    }

    /// Preflight runs unless `skip_preflight` is set, simulated at the
    /// client's commitment
    fn send_config(&self) -> RpcSendTransactionConfig {
        RpcSendTransactionConfig {
            skip_preflight: self.config.skip_preflight,
            preflight_commitment: Some(self.commitment.commitment),
            ..RpcSendTransactionConfig::default()
        }
    }

    /// Throttle, time and classify one RPC call
    async fn call<T, F>(&self, op: &'static str, request: F) -> Result<T, RpcManagerError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        self.limiter.until_ready().await;
        let timer = Timer::new();
        let result = request.await;
        timer.observe_duration(&metrics().rpc_latency);

        result.map_err(|e| {
            let err = RpcManagerError::from_client_error(e, &self.config.url);
            debug!(op, category = err.category(), error = %err, "RPC call failed");
            err
        })
    }

    #[instrument(skip(self))]
    pub async fn balance(&self, account: &Pubkey) -> Result<BalanceReport, RpcManagerError> {
        let response = self
            .call(
                "getBalance",
                self.client.get_balance_with_commitment(account, self.commitment),
            )
            .await?;
        Ok(BalanceReport {
            account: *account,
            lamports: response.value,
        })
    }

    #[instrument(skip(self))]
    pub async fn account(&self, account: &Pubkey) -> Result<AccountReport, RpcManagerError> {
        let response = self
            .call(
                "getAccountInfo",
                self.client.get_account_with_commitment(account, self.commitment),
            )
            .await?;
        let data = response.value.ok_or_else(|| RpcManagerError::AccountNotFound {
            account: account.to_string(),
            endpoint: self.config.url.clone(),
        })?;
        Ok(AccountReport::from_account(*account, &data))
    }

    /// Block summary for `slot`, or for the latest finalized slot when `None`
    #[instrument(skip(self))]
    pub async fn block(&self, slot: Option<u64>) -> Result<BlockReport, RpcManagerError> {
        let slot = match slot {
            Some(slot) => slot,
            None => {
                self.call(
                    "getSlot",
                    self.client
                        .get_slot_with_commitment(CommitmentConfig::finalized()),
                )
                .await?
            }
        };
        let config = RpcBlockConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            transaction_details: Some(TransactionDetails::Signatures),
            rewards: Some(false),
            commitment: Some(CommitmentConfig::finalized()),
            max_supported_transaction_version: Some(0),
        };
        let block = self
            .call("getBlock", self.client.get_block_with_config(slot, config))
            .await?;
        Ok(BlockReport::from_block(slot, &block))
    }

    #[instrument(skip(self))]
    pub async fn transaction(
        &self,
        signature: &Signature,
    ) -> Result<TransactionReport, RpcManagerError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        let encoded = self
            .call(
                "getTransaction",
                self.client.get_transaction_with_config(signature, config),
            )
            .await?;
        Ok(TransactionReport::from_encoded(*signature, &encoded))
    }
}

#[async_trait]
impl LedgerRpc for SolanaRpc {
    fn endpoint(&self) -> &str {
        &self.config.url
    }

    async fn latest_blockhash(&self) -> Result<RecentBlockhash, RpcManagerError> {
        let (hash, last_valid_block_height) = self
            .call(
                "getLatestBlockhash",
                self.client
                    .get_latest_blockhash_with_commitment(self.commitment),
            )
            .await?;
        debug!(%hash, last_valid_block_height, "Fetched blockhash");
        Ok(RecentBlockhash::new(hash, last_valid_block_height))
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, RpcManagerError> {
        self.call(
            "getMinimumBalanceForRentExemption",
            self.client.get_minimum_balance_for_rent_exemption(data_len),
        )
        .await
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, RpcManagerError> {
        let result = self
            .call(
                "sendTransaction",
                self.client.send_transaction_with_config(tx, self.send_config()),
            )
            .await;
        metrics().submissions_total.inc();
        if let Err(e) = &result {
            metrics().record_submission_failure(e.category());
            warn!(error = %e, "Transaction submission failed");
        }
        result
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcManagerError> {
        let response = self
            .call(
                "getSignatureStatuses",
                self.client.get_signature_statuses(&[*signature]),
            )
            .await?;

        let status = response.value.into_iter().next().flatten().map(|s| {
            // Nodes that omit confirmationStatus report rooted slots as
            // `confirmations: null`
            let status = match s.confirmation_status {
                Some(level) => ConfirmationStatus::from(level),
                None if s.confirmations.is_none() => ConfirmationStatus::Finalized,
                None => ConfirmationStatus::Processed,
            };
            SignatureStatus {
                status,
                err: s.err.map(|e| e.to_string()),
            }
        });
        Ok(status)
    }
}
