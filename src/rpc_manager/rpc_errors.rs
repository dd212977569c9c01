use solana_rpc_client_api::client_error::{Error as ClientError, ErrorKind as ClientErrorKind};
use solana_rpc_client_api::request::RpcError;
use solana_sdk::transaction::TransactionError;
use thiserror::Error;

/// RPC Manager error types
///
/// Submission failures split three ways so the caller knows what to do next:
/// rebuild on [`RpcManagerError::ExpiredBlockhash`], retry on
/// [`RpcManagerError::Transport`], give up on [`RpcManagerError::RejectedByNode`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcManagerError {
    /// Node refused the transaction (preflight simulation or validation)
    #[error("Rejected by node: {message} (endpoint: {endpoint}, code: {code:?})")]
    RejectedByNode {
        endpoint: String,
        message: String,
        code: Option<i64>,
    },

    /// Transport-level errors (network, connection)
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    /// Freshness token too old; the transaction must be rebuilt
    #[error("Blockhash expired or not found (endpoint: {endpoint})")]
    ExpiredBlockhash { endpoint: String },

    /// Timeout errors
    #[error("Timeout after {timeout_ms}ms (endpoint: {endpoint})")]
    Timeout { endpoint: String, timeout_ms: u64 },

    #[error("Account not found: {account} (endpoint: {endpoint})")]
    AccountNotFound { account: String, endpoint: String },

    /// Malformed input or response
    #[error("Validation error: {0}")]
    Validation(String),
}

impl RpcManagerError {
    /// Check if this error is retryable as-is (same transaction bytes)
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcManagerError::Transport { .. } => true,
            RpcManagerError::Timeout { .. } => true,

            RpcManagerError::RejectedByNode { code, .. } => {
                // Retry on server errors (5xx)
                matches!(code, Some(c) if (500..600).contains(c))
            }
            RpcManagerError::ExpiredBlockhash { .. } => false,
            RpcManagerError::AccountNotFound { .. } => false,
            RpcManagerError::Validation(_) => false,
        }
    }

    /// The caller must fetch a new blockhash and rebuild, not resubmit
    pub fn requires_rebuild(&self) -> bool {
        matches!(self, RpcManagerError::ExpiredBlockhash { .. })
    }

    /// Get the endpoint associated with this error, if any
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            RpcManagerError::RejectedByNode { endpoint, .. } => Some(endpoint),
            RpcManagerError::Transport { endpoint, .. } => Some(endpoint),
            RpcManagerError::ExpiredBlockhash { endpoint } => Some(endpoint),
            RpcManagerError::Timeout { endpoint, .. } => Some(endpoint),
            RpcManagerError::AccountNotFound { endpoint, .. } => Some(endpoint),
            RpcManagerError::Validation(_) => None,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            RpcManagerError::RejectedByNode { .. } => "rejected",
            RpcManagerError::Transport { .. } => "transport",
            RpcManagerError::ExpiredBlockhash { .. } => "expired_blockhash",
            RpcManagerError::Timeout { .. } => "timeout",
            RpcManagerError::AccountNotFound { .. } => "account_not_found",
            RpcManagerError::Validation(_) => "validation",
        }
    }

    pub fn transport(endpoint: &str, message: impl Into<String>) -> Self {
        RpcManagerError::Transport {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }

    /// Create from ClientError with context
    pub fn from_client_error(err: ClientError, endpoint: &str) -> Self {
        let endpoint = endpoint.to_string();
        match err.kind() {
            ClientErrorKind::Io(e) => {
                return RpcManagerError::Transport {
                    endpoint,
                    message: e.to_string(),
                }
            }
            ClientErrorKind::Reqwest(e) => {
                if e.is_timeout() {
                    return RpcManagerError::Timeout {
                        endpoint,
                        timeout_ms: 0,
                    };
                }
                return RpcManagerError::Transport {
                    endpoint,
                    message: e.to_string(),
                };
            }
            ClientErrorKind::TransactionError(TransactionError::BlockhashNotFound) => {
                return RpcManagerError::ExpiredBlockhash { endpoint }
            }
            ClientErrorKind::TransactionError(e) => {
                return RpcManagerError::RejectedByNode {
                    endpoint,
                    message: e.to_string(),
                    code: None,
                }
            }
            ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) => {
                if is_expired_blockhash_message(message) {
                    return RpcManagerError::ExpiredBlockhash { endpoint };
                }
                return RpcManagerError::RejectedByNode {
                    endpoint,
                    message: message.clone(),
                    code: Some(*code),
                };
            }
            _ => {}
        }

        // Classify the remaining kinds based on error message
        let err_str = err.to_string().to_lowercase();
        if is_expired_blockhash_message(&err_str) {
            RpcManagerError::ExpiredBlockhash { endpoint }
        } else if err_str.contains("timeout") || err_str.contains("timed out") {
            RpcManagerError::Timeout {
                endpoint,
                timeout_ms: 0,
            }
        } else {
            RpcManagerError::Transport {
                endpoint,
                message: err.to_string(),
            }
        }
    }
}

fn is_expired_blockhash_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("blockhash not found")
        || message.contains("block height exceeded")
        || message.contains("transaction expired")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(RpcManagerError::transport("test", "connection refused").is_retryable());
        assert!(RpcManagerError::Timeout {
            endpoint: "test".to_string(),
            timeout_ms: 5000,
        }
        .is_retryable());

        assert!(!RpcManagerError::ExpiredBlockhash {
            endpoint: "test".to_string(),
        }
        .is_retryable());
        assert!(!RpcManagerError::RejectedByNode {
            endpoint: "test".to_string(),
            message: "insufficient funds".to_string(),
            code: Some(-32002),
        }
        .is_retryable());
        assert!(RpcManagerError::RejectedByNode {
            endpoint: "test".to_string(),
            message: "bad gateway".to_string(),
            code: Some(502),
        }
        .is_retryable());
    }

    #[test]
    fn test_expired_blockhash_requires_rebuild() {
        let err = RpcManagerError::ExpiredBlockhash {
            endpoint: "https://api.devnet.solana.com".to_string(),
        };
        assert!(err.requires_rebuild());
        assert!(!RpcManagerError::transport("x", "y").requires_rebuild());
    }

    #[test]
    fn test_error_endpoint() {
        let err = RpcManagerError::Timeout {
            endpoint: "https://test.com".to_string(),
            timeout_ms: 5000,
        };
        assert_eq!(err.endpoint(), Some("https://test.com"));
        assert_eq!(RpcManagerError::Validation("x".to_string()).endpoint(), None);
    }

    #[test]
    fn test_classify_transaction_errors() {
        let expired = ClientError::from(TransactionError::BlockhashNotFound);
        assert!(matches!(
            RpcManagerError::from_client_error(expired, "e"),
            RpcManagerError::ExpiredBlockhash { .. }
        ));

        let rejected = ClientError::from(TransactionError::InsufficientFundsForFee);
        assert!(matches!(
            RpcManagerError::from_client_error(rejected, "e"),
            RpcManagerError::RejectedByNode { code: None, .. }
        ));
    }

    #[test]
    fn test_classify_io_as_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = RpcManagerError::from_client_error(ClientError::from(io), "e");
        assert_eq!(err.category(), "transport");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_expired_message_detection() {
        assert!(is_expired_blockhash_message(
            "Transaction simulation failed: Blockhash not found"
        ));
        assert!(!is_expired_blockhash_message("custom program error: 0x1"));
    }
}
