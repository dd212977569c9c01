//! Submission flows
//!
//! [`Pipeline`] runs build → sign → submit → confirm. The transfer,
//! deployment and invocation flows only differ in the instructions they
//! construct and in how they wait.
//!
//! ```rust,no_run
//! use solconfirm::confirmation::{ConfirmStrategy, TrackerConfig};
//! use solconfirm::flows::Pipeline;
//! use solconfirm::rpc_manager::{RpcEndpointConfig, SolanaRpc};
//! use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Keypair};
//! use std::sync::Arc;
//!
//! # async fn example(payer: Keypair, recipient: Pubkey) -> anyhow::Result<()> {
//! let rpc = SolanaRpc::new(RpcEndpointConfig::default(), CommitmentConfig::confirmed())?;
//! let pipeline = Pipeline::new(Arc::new(rpc), TrackerConfig::default());
//! let confirmation = pipeline
//!     .transfer(&payer, &recipient, 100_000, ConfirmStrategy::Polling)
//!     .await?;
//! println!("{} is {}", confirmation.signature, confirmation.status);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub use errors::PipelineError;

mod deploy;
mod invoke;
mod transfer;

pub use deploy::{load_program, DeployOutcome};
pub use invoke::InvokeOutcome;

use crate::confirmation::{
    ConfirmStrategy, ConfirmationTracker, EventSource, SubscriptionHandle, TrackerConfig,
};
use crate::rpc_manager::LedgerRpc;
use crate::structured_logging::PipelineContext;
use crate::tx_builder::{build, serialized_size, sign, SignatureResolver, SignedTx};
use crate::types::Confirmation;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Signature};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Shared submission pipeline.
///
/// Holds injected connections only; each call builds, signs and submits a
/// fresh transaction, so one pipeline can serve concurrent flows.
pub struct Pipeline {
    rpc: Arc<dyn LedgerRpc>,
    tracker: ConfirmationTracker,
}

impl Pipeline {
    pub fn new(rpc: Arc<dyn LedgerRpc>, config: TrackerConfig) -> Self {
        Self {
            tracker: ConfirmationTracker::new(rpc.clone(), config),
            rpc,
        }
    }

    /// Enable subscription-based confirmation
    pub fn with_events(mut self, events: Arc<dyn EventSource>) -> Self {
        self.tracker = self.tracker.with_events(events);
        self
    }

    pub fn rpc(&self) -> &Arc<dyn LedgerRpc> {
        &self.rpc
    }

    pub fn tracker(&self) -> &ConfirmationTracker {
        &self.tracker
    }

    /// Fetch a fresh blockhash, build and sign
    pub async fn prepare<S>(
        &self,
        instructions: Vec<Instruction>,
        fee_payer: &Pubkey,
        signers: &S,
        ctx: &PipelineContext,
    ) -> Result<SignedTx, PipelineError>
    where
        S: SignatureResolver + ?Sized,
    {
        let instruction_count = instructions.len();
        let blockhash = self.rpc.latest_blockhash().await?;
        debug!(
            blockhash = %blockhash.hash,
            last_valid_block_height = blockhash.last_valid_block_height,
            age_ms = blockhash.age().as_millis() as u64,
            "Building against blockhash"
        );
        let unsigned = build(instructions, blockhash.hash, *fee_payer)?;
        let signed = sign(unsigned, signers)?;

        ctx.logger.log_build(
            instruction_count,
            signed.required_signers().len(),
            serialized_size(&signed.tx)?,
        );
        Ok(signed)
    }

    /// Submit once. The returned signature is the transaction id; a rejection
    /// comes back as [`PipelineError::Submission`] carrying the same id.
    pub async fn submit(
        &self,
        signed: &SignedTx,
        ctx: &PipelineContext,
    ) -> Result<Signature, PipelineError> {
        let started = Instant::now();
        let signature = signed.signature();
        match self.rpc.send_transaction(&signed.tx).await {
            Ok(acknowledged) => {
                if acknowledged != signature {
                    warn!(%signature, %acknowledged, "Node acknowledged a different signature");
                }
                ctx.logger
                    .log_submission(&signature, started.elapsed().as_millis() as u64);
                Ok(signature)
            }
            Err(e) => {
                ctx.logger.log_submission_failure(e.category(), &e.to_string());
                Err(PipelineError::Submission {
                    signature,
                    error: e,
                })
            }
        }
    }

    /// Open the confirmation subscription a strategy needs, before submission.
    ///
    /// Returns `None` for polling, and for a failed setup when the strategy
    /// allows falling back to polling.
    async fn open_for(
        &self,
        signature: &Signature,
        strategy: ConfirmStrategy,
        ctx: &PipelineContext,
    ) -> Result<Option<SubscriptionHandle>, PipelineError> {
        let ConfirmStrategy::Subscription {
            fallback_to_polling,
        } = strategy
        else {
            return Ok(None);
        };

        match self.tracker.subscribe_signature(signature).await {
            Ok(handle) => {
                ctx.logger.log_subscription(handle.label(), true);
                Ok(Some(handle))
            }
            Err(e) if fallback_to_polling => {
                ctx.logger.log_subscription(&signature.to_string(), false);
                warn!(%signature, error = %e, "Subscription unavailable, will poll instead");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Build, sign, submit and wait according to `strategy`
    pub async fn execute<S>(
        &self,
        instructions: Vec<Instruction>,
        fee_payer: &Pubkey,
        signers: &S,
        strategy: ConfirmStrategy,
        ctx: &PipelineContext,
    ) -> Result<Confirmation, PipelineError>
    where
        S: SignatureResolver + ?Sized,
    {
        let signed = self.prepare(instructions, fee_payer, signers, ctx).await?;
        self.submit_and_confirm(&signed, strategy, ctx).await
    }

    /// Submit an already signed transaction and wait according to `strategy`.
    ///
    /// A subscription is opened before the transaction leaves, so a fast
    /// confirmation cannot slip past it. If submission fails the handle is
    /// released on the way out.
    pub async fn submit_and_confirm(
        &self,
        signed: &SignedTx,
        strategy: ConfirmStrategy,
        ctx: &PipelineContext,
    ) -> Result<Confirmation, PipelineError> {
        let signature = signed.signature();
        let handle = self.open_for(&signature, strategy, ctx).await?;

        let started = Instant::now();
        self.submit(signed, ctx).await?;

        let confirmation = match handle {
            Some(handle) => {
                let fallback = matches!(
                    strategy,
                    ConfirmStrategy::Subscription {
                        fallback_to_polling: true
                    }
                );
                self.tracker
                    .await_signature(&signature, handle, started, fallback)
                    .await
            }
            None => {
                debug!(%signature, "Polling for confirmation");
                self.tracker.poll(&signature).await
            }
        };

        ctx.logger.log_confirmation(&confirmation);
        Ok(confirmation)
    }
}
