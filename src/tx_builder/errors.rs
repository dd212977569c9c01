//! Error types for the Transaction Builder
//!
//! Covers envelope construction and signer resolution. Errors here abort the
//! flow immediately: nothing has been sent to the ledger yet.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Error type for building and signing transactions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionBuilderError {
    /// The instruction list cannot form a transaction
    ///
    /// Raised for an empty instruction list and for flow inputs that would
    /// produce a meaningless instruction (zero-length program, zero amount).
    #[error("Invalid instruction set: {0}")]
    InvalidInstructionSet(String),

    /// Serialized transaction exceeds the ledger's packet limit
    #[error("Encoding error: transaction is {size} bytes, limit is {max}")]
    Encoding {
        /// Serialized size including signature placeholders
        size: usize,
        /// Maximum accepted by the ledger
        max: usize,
    },

    /// Serialization itself failed
    #[error("Encoding error: {0}")]
    Serialization(String),

    /// A required signer slot has no key
    #[error("Missing signer for required slot {0}")]
    MissingSigner(Pubkey),

    /// Resolver answered with the wrong key, or signing failed
    #[error("Signing failed: {0}")]
    Signing(String),
}

impl TransactionBuilderError {
    /// Builder errors are deterministic; retrying the same input fails again
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidInstructionSet(_) => "instruction",
            Self::Encoding { .. } | Self::Serialization(_) => "encoding",
            Self::MissingSigner(_) => "missing_signer",
            Self::Signing(_) => "signing",
        }
    }

    /// Account involved in the failure, if any
    pub fn account(&self) -> Option<&Pubkey> {
        match self {
            Self::MissingSigner(pubkey) => Some(pubkey),
            _ => None,
        }
    }
}

// Convenience constructors
impl TransactionBuilderError {
    pub fn empty_instructions() -> Self {
        Self::InvalidInstructionSet("instruction list is empty".to_string())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInstructionSet(reason.into())
    }

    pub fn signer_mismatch(slot: &Pubkey, resolved: &Pubkey) -> Self {
        Self::Signing(format!(
            "resolver returned key {} for signer slot {}",
            resolved, slot
        ))
    }
}
