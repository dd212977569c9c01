//! Program deployment
//!
//! Creates a rent-exempt account sized to the program bytes and owned by the
//! upgradeable BPF loader, signed by the payer and a fresh program keypair.

use super::{Pipeline, PipelineError};
use crate::confirmation::ConfirmStrategy;
use crate::structured_logging::PipelineContext;
use crate::tx_builder::{deployment_instruction, TransactionBuilderError};
use crate::types::Confirmation;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::path::Path;
use tracing::{info, Instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutcome {
    /// Address of the created program account
    pub program_id: Pubkey,
    pub rent_exempt_lamports: u64,
    pub program_len: usize,
    pub confirmation: Confirmation,
}

impl DeployOutcome {
    /// The account exists at the target commitment
    pub fn is_deployed(&self) -> bool {
        !self.confirmation.timed_out && self.confirmation.err.is_none()
    }
}

/// Read a compiled program (`.so`) from disk
pub async fn load_program(path: impl AsRef<Path>) -> Result<Vec<u8>, PipelineError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PipelineError::ProgramLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    if bytes.is_empty() {
        return Err(PipelineError::ProgramLoad {
            path: path.display().to_string(),
            message: "file is empty".to_string(),
        });
    }
    Ok(bytes)
}

impl Pipeline {
    /// Deploy under a freshly generated program address
    pub async fn deploy(
        &self,
        program_bytes: &[u8],
        payer: &Keypair,
    ) -> Result<DeployOutcome, PipelineError> {
        self.deploy_with_program_keypair(program_bytes, payer, Keypair::new())
            .await
    }

    /// Deploy under a caller-chosen program address.
    ///
    /// Confirmation uses a signature subscription opened before submission;
    /// if it cannot be opened nothing is submitted.
    pub async fn deploy_with_program_keypair(
        &self,
        program_bytes: &[u8],
        payer: &Keypair,
        program_keypair: Keypair,
    ) -> Result<DeployOutcome, PipelineError> {
        let ctx = PipelineContext::new("deploy");
        let span = ctx.span();
        self.run_deploy(program_bytes, payer, program_keypair, &ctx)
            .instrument(span)
            .await
    }

    async fn run_deploy(
        &self,
        program_bytes: &[u8],
        payer: &Keypair,
        program_keypair: Keypair,
        ctx: &PipelineContext,
    ) -> Result<DeployOutcome, PipelineError> {
        if program_bytes.is_empty() {
            return Err(TransactionBuilderError::invalid("program bytes are empty").into());
        }
        let program_id = program_keypair.pubkey();
        let program_len = program_bytes.len();

        let rent_exempt_lamports = self
            .rpc()
            .minimum_balance_for_rent_exemption(program_len)
            .await?;
        info!(%program_id, program_len, rent_exempt_lamports, "Deploying program");

        let ix = deployment_instruction(
            &payer.pubkey(),
            &program_id,
            rent_exempt_lamports,
            program_len,
        )?;
        let confirmation = self
            .execute(
                vec![ix],
                &payer.pubkey(),
                &[payer, &program_keypair],
                ConfirmStrategy::Subscription {
                    fallback_to_polling: false,
                },
                ctx,
            )
            .await?;

        Ok(DeployOutcome {
            program_id,
            rent_exempt_lamports,
            program_len,
            confirmation,
        })
    }
}
