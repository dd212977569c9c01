//! Common types used throughout the submission pipeline

use serde::{Deserialize, Serialize};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    signature::Signature,
};
use solana_transaction_status::TransactionConfirmationStatus;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Confirmation level reached by a submitted signature.
///
/// Ordered `Unknown < Processed < Confirmed < Finalized`, so trackers can
/// compare against a target with `>=` and fold observations with `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationStatus {
    /// Node has no record of the signature (yet)
    Unknown,
    /// Included in a block on the node's fork
    Processed,
    /// Voted on by a supermajority
    Confirmed,
    /// Rooted; irreversible
    Finalized,
}

impl ConfirmationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }

    /// Commitment to request from the node when waiting for this status.
    ///
    /// `Unknown` has no commitment of its own and maps to `processed`.
    pub fn commitment(&self) -> CommitmentConfig {
        let commitment = match self {
            Self::Unknown | Self::Processed => CommitmentLevel::Processed,
            Self::Confirmed => CommitmentLevel::Confirmed,
            Self::Finalized => CommitmentLevel::Finalized,
        };
        CommitmentConfig { commitment }
    }
}

impl Default for ConfirmationStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfirmationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            other => Err(format!("unknown confirmation status '{}'", other)),
        }
    }
}

impl From<TransactionConfirmationStatus> for ConfirmationStatus {
    fn from(status: TransactionConfirmationStatus) -> Self {
        match status {
            TransactionConfirmationStatus::Processed => Self::Processed,
            TransactionConfirmationStatus::Confirmed => Self::Confirmed,
            TransactionConfirmationStatus::Finalized => Self::Finalized,
        }
    }
}

/// One `getSignatureStatuses` observation.
///
/// A transaction can be finalized and still have failed during execution,
/// so the error travels next to the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub status: ConfirmationStatus,
    pub err: Option<String>,
}

impl SignatureStatus {
    pub fn new(status: ConfirmationStatus) -> Self {
        Self { status, err: None }
    }

    pub fn failed(status: ConfirmationStatus, err: impl Into<String>) -> Self {
        Self {
            status,
            err: Some(err.into()),
        }
    }
}

/// Freshness token fetched right before a build.
#[derive(Debug, Clone, Copy)]
pub struct RecentBlockhash {
    pub hash: Hash,
    /// Last block height at which a transaction using `hash` is accepted
    pub last_valid_block_height: u64,
    pub fetched_at: Instant,
}

impl RecentBlockhash {
    pub fn new(hash: Hash, last_valid_block_height: u64) -> Self {
        Self {
            hash,
            last_valid_block_height,
            fetched_at: Instant::now(),
        }
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

/// Asynchronous notification delivered on a subscription channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationEvent {
    /// Signature reached the subscribed commitment
    Signature {
        signature: Signature,
        slot: u64,
        err: Option<String>,
    },
    /// Node received the transaction (not yet processed)
    Received { signature: Signature, slot: u64 },
    /// Program log output for one transaction
    Logs {
        signature: String,
        slot: u64,
        logs: Vec<String>,
        err: Option<String>,
    },
}

impl ConfirmationEvent {
    pub fn slot(&self) -> u64 {
        match self {
            Self::Signature { slot, .. } | Self::Received { slot, .. } | Self::Logs { slot, .. } => {
                *slot
            }
        }
    }

    /// Signature the event refers to, rendered as base58.
    pub fn signature_str(&self) -> String {
        match self {
            Self::Signature { signature, .. } | Self::Received { signature, .. } => {
                signature.to_string()
            }
            Self::Logs { signature, .. } => signature.clone(),
        }
    }

    pub fn err(&self) -> Option<&str> {
        match self {
            Self::Signature { err, .. } | Self::Logs { err, .. } => err.as_deref(),
            Self::Received { .. } => None,
        }
    }

    /// Whether this event settles a confirmation wait.
    ///
    /// A `Received` notification only says the node saw the transaction.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Received { .. })
    }
}

/// How a confirmation was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmSource {
    Polling,
    SignatureSubscription,
    LogSubscription,
}

impl fmt::Display for ConfirmSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Polling => "polling",
            Self::SignatureSubscription => "signature_subscription",
            Self::LogSubscription => "log_subscription",
        };
        f.write_str(s)
    }
}

/// Result of tracking one submitted signature.
///
/// A timeout is not an error: the transaction may still land later, so the
/// caller gets the signature back with `timed_out` set and can re-query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub signature: Signature,
    pub status: ConfirmationStatus,
    pub err: Option<String>,
    pub source: ConfirmSource,
    /// Status queries issued (polling) or events read (subscription)
    pub attempts: u32,
    pub elapsed: Duration,
    pub timed_out: bool,
}

impl Confirmation {
    /// Landed with at least `confirmed` commitment and no execution error.
    pub fn is_confirmed(&self) -> bool {
        self.status >= ConfirmationStatus::Confirmed && self.err.is_none()
    }

    pub fn is_finalized(&self) -> bool {
        self.status == ConfirmationStatus::Finalized && self.err.is_none()
    }

    pub fn failed(&self) -> bool {
        self.err.is_some()
    }
}
