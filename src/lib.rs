//! solconfirm - Solana transaction submission and confirmation tracking
//!
//! Builds transactions from instructions, signs every required slot, submits
//! them once and tracks each signature until it reaches a target status,
//! either by polling or by a subscription raced against a timeout.

pub mod config;
pub mod confirmation;
pub mod flows;
pub mod metrics;
pub mod queries;
pub mod rpc_manager;
pub mod structured_logging;
pub mod tx_builder;
pub mod types;
pub mod wallet;

// Re-export commonly used types
pub use confirmation::{ConfirmStrategy, ConfirmationTracker, PollPolicy, TrackerConfig};
pub use flows::{Pipeline, PipelineError};
pub use rpc_manager::{LedgerRpc, SolanaRpc};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
pub use types::{Confirmation, ConfirmationEvent, ConfirmationStatus};
