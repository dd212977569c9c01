use crate::confirmation::ConfirmationError;
use crate::rpc_manager::RpcManagerError;
use crate::tx_builder::TransactionBuilderError;
use solana_sdk::signature::Signature;
use thiserror::Error;

/// Flow-level error: whichever stage failed, with its own error attached
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// Build or sign failed; nothing was submitted
    #[error(transparent)]
    Build(#[from] TransactionBuilderError),

    /// A node call other than submission failed (blockhash or rent lookup)
    #[error(transparent)]
    Rpc(#[from] RpcManagerError),

    /// The node rejected a signed transaction. `signature` identifies it, so
    /// callers can still look it up before deciding to resubmit.
    #[error("Submission of {signature} failed: {error}")]
    Submission {
        signature: Signature,
        #[source]
        error: RpcManagerError,
    },

    /// The confirmation channel could not be set up
    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),

    #[error("Failed to load program from {path}: {message}")]
    ProgramLoad { path: String, message: String },
}

impl PipelineError {
    /// Signature of the transaction that was sent, when the failure happened
    /// at submission
    pub fn signature(&self) -> Option<Signature> {
        match self {
            PipelineError::Submission { signature, .. } => Some(*signature),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Build(e) => e.is_retryable(),
            PipelineError::Rpc(e) | PipelineError::Submission { error: e, .. } => e.is_retryable(),
            PipelineError::Confirmation(e) => e.is_retryable(),
            PipelineError::ProgramLoad { .. } => false,
        }
    }

    /// The caller should fetch a new blockhash and rebuild before retrying
    pub fn requires_rebuild(&self) -> bool {
        match self {
            PipelineError::Rpc(e) | PipelineError::Submission { error: e, .. } => e.requires_rebuild(),
            _ => false,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::Build(e) => e.category(),
            PipelineError::Rpc(e) | PipelineError::Submission { error: e, .. } => e.category(),
            PipelineError::Confirmation(e) => e.category(),
            PipelineError::ProgramLoad { .. } => "program_load",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_only_for_expired_blockhash() {
        let expired: PipelineError = RpcManagerError::ExpiredBlockhash {
            endpoint: "e".to_string(),
        }
        .into();
        assert!(expired.requires_rebuild());
        assert!(!expired.is_retryable());

        let transport: PipelineError = RpcManagerError::transport("e", "reset").into();
        assert!(!transport.requires_rebuild());
        assert!(transport.is_retryable());
    }

    #[test]
    fn test_submission_keeps_signature_and_cause() {
        use std::error::Error as _;

        let signature = Signature::from([7u8; 64]);
        let err = PipelineError::Submission {
            signature,
            error: RpcManagerError::ExpiredBlockhash {
                endpoint: "e".to_string(),
            },
        };
        assert_eq!(err.signature(), Some(signature));
        assert!(err.requires_rebuild());
        assert!(!err.is_retryable());
        assert_eq!(err.category(), "expired_blockhash");
        assert!(err.to_string().contains(&signature.to_string()));
        assert!(err.source().is_some());

        let transport: PipelineError = RpcManagerError::transport("e", "reset").into();
        assert_eq!(transport.signature(), None);
    }

    #[test]
    fn test_build_errors_are_final() {
        let err: PipelineError = TransactionBuilderError::empty_instructions().into();
        assert!(!err.is_retryable());
        assert_eq!(err.category(), TransactionBuilderError::empty_instructions().category());
    }
}
