use super::{Pipeline, PipelineError};
use crate::confirmation::ConfirmStrategy;
use crate::structured_logging::PipelineContext;
use crate::tx_builder::transfer_instruction;
use crate::types::Confirmation;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use tracing::{info, Instrument};

impl Pipeline {
    /// Move `lamports` from `payer` to `recipient` and wait for confirmation
    pub async fn transfer(
        &self,
        payer: &Keypair,
        recipient: &Pubkey,
        lamports: u64,
        strategy: ConfirmStrategy,
    ) -> Result<Confirmation, PipelineError> {
        let ctx = PipelineContext::new("transfer");
        let span = ctx.span();
        self.run_transfer(payer, recipient, lamports, strategy, &ctx)
            .instrument(span)
            .await
    }

    async fn run_transfer(
        &self,
        payer: &Keypair,
        recipient: &Pubkey,
        lamports: u64,
        strategy: ConfirmStrategy,
        ctx: &PipelineContext,
    ) -> Result<Confirmation, PipelineError> {
        let ix = transfer_instruction(&payer.pubkey(), recipient, lamports)?;
        info!(from = %payer.pubkey(), to = %recipient, lamports, "Sending transfer");
        self.execute(vec![ix], &payer.pubkey(), payer, strategy, ctx)
            .await
    }
}
