use crate::rpc_manager::RpcManagerError;
use thiserror::Error;

/// Confirmation tracking errors.
///
/// A wait that runs out of time is not an error; it yields a
/// [`Confirmation`](crate::types::Confirmation) with `timed_out` set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfirmationError {
    /// The event channel could not be opened
    #[error("Subscription setup failed for {target}: {reason} (endpoint: {endpoint})")]
    SubscriptionSetupFailed {
        endpoint: String,
        target: String,
        reason: String,
    },

    #[error(transparent)]
    Rpc(#[from] RpcManagerError),
}

impl ConfirmationError {
    pub fn setup_failed(endpoint: &str, target: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfirmationError::SubscriptionSetupFailed {
            endpoint: endpoint.to_string(),
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ConfirmationError::SubscriptionSetupFailed { .. } => true,
            ConfirmationError::Rpc(e) => e.is_retryable(),
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            ConfirmationError::SubscriptionSetupFailed { .. } => "subscription_setup_failed",
            ConfirmationError::Rpc(e) => e.category(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_failure_is_retryable() {
        let err = ConfirmationError::setup_failed("wss://x", "signature abc", "connection refused");
        assert!(err.is_retryable());
        assert_eq!(err.category(), "subscription_setup_failed");
        assert!(err.to_string().contains("signature abc"));
    }

    #[test]
    fn test_rpc_error_passes_through() {
        let err: ConfirmationError = RpcManagerError::ExpiredBlockhash {
            endpoint: "e".to_string(),
        }
        .into();
        assert_eq!(err.category(), "expired_blockhash");
        assert!(!err.is_retryable());
    }
}
