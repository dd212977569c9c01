//! Program invocation
//!
//! Calls a deployed program with the fixed payer / recipient / system program
//! account list and reads back the program's log output for that one
//! transaction.

use super::{Pipeline, PipelineError};
use crate::structured_logging::PipelineContext;
use crate::tx_builder::{encode_amount_call, invocation_instruction};
use crate::types::Confirmation;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use tokio::time::Instant;
use tracing::{info, Instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeOutcome {
    pub signature: Signature,
    pub confirmation: Confirmation,
    /// Log lines emitted while executing this transaction
    pub logs: Vec<String>,
    pub slot: Option<u64>,
}

impl Pipeline {
    /// Invoke `program_id` with raw instruction data.
    ///
    /// A log subscription mentioning the program is opened before
    /// submission and only this transaction's logs are taken from it. If the
    /// subscription cannot be opened nothing is submitted. A log wait that
    /// times out still returns the signature, with `timed_out` set.
    pub async fn invoke(
        &self,
        program_id: &Pubkey,
        instruction_data: Vec<u8>,
        payer: &Keypair,
        recipient: &Pubkey,
    ) -> Result<InvokeOutcome, PipelineError> {
        let ctx = PipelineContext::new("invoke");
        let span = ctx.span();
        self.run_invoke(program_id, instruction_data, payer, recipient, &ctx)
            .instrument(span)
            .await
    }

    /// Invoke a single-`u64` method such as `transfer_sol_with_cpi(amount)`
    pub async fn invoke_amount_call(
        &self,
        program_id: &Pubkey,
        method_name: &str,
        amount: u64,
        payer: &Keypair,
        recipient: &Pubkey,
    ) -> Result<InvokeOutcome, PipelineError> {
        let data = encode_amount_call(method_name, amount);
        self.invoke(program_id, data, payer, recipient).await
    }

    async fn run_invoke(
        &self,
        program_id: &Pubkey,
        instruction_data: Vec<u8>,
        payer: &Keypair,
        recipient: &Pubkey,
        ctx: &PipelineContext,
    ) -> Result<InvokeOutcome, PipelineError> {
        let ix = invocation_instruction(program_id, instruction_data, &payer.pubkey(), recipient);
        let signed = self.prepare(vec![ix], &payer.pubkey(), payer, ctx).await?;
        let signature = signed.signature();

        let handle = self.tracker().subscribe_program_logs(program_id).await?;
        ctx.logger.log_subscription(handle.label(), true);

        let started = Instant::now();
        self.submit(&signed, ctx).await?;
        info!(%program_id, %signature, "Invocation submitted, waiting for logs");

        let wait = self.tracker().await_logs(&signature, handle, started).await;
        ctx.logger.log_confirmation(&wait.confirmation);

        Ok(InvokeOutcome {
            signature,
            confirmation: wait.confirmation,
            logs: wait.logs,
            slot: wait.slot,
        })
    }
}
