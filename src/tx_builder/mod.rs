//! Transaction Builder
//!
//! Turns an instruction list into a signed transaction ready for submission.
//!
//! ## Architecture
//!
//! - **errors**: Error taxonomy for building and signing
//! - **instructions**: Instruction constructors and method-call data encoding
//! - **builder**: Unsigned envelope construction with a hard size cap
//! - **signer**: Signer slot resolution and signing
//! - **output**: Signed transaction with its signature map
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::{Keypair, Signer}};
//! use solconfirm::tx_builder::{build, sign, transfer_instruction, TransactionBuilderError};
//!
//! # fn example(blockhash: Hash) -> Result<(), TransactionBuilderError> {
//! let payer = Keypair::new();
//! let ix = transfer_instruction(&payer.pubkey(), &Pubkey::new_unique(), 100_000)?;
//! let unsigned = build(vec![ix], blockhash, payer.pubkey())?;
//! let signed = sign(unsigned, &payer)?;
//! assert_eq!(signed.signatures_by_signer().len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub use errors::TransactionBuilderError;

mod builder;
pub mod instructions;
mod output;
mod signer;

pub use builder::{build, serialized_size, UnsignedTx, MAX_TRANSACTION_SIZE};
pub use instructions::{
    deployment_instruction, encode_amount_call, invocation_accounts, invocation_instruction,
    method_discriminator, transfer_instruction, MethodCall,
};
pub use output::SignedTx;
pub use signer::{sign, ChainedResolver, KeyMap, SignatureResolver};
