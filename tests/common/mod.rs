//! In-memory ledger node and event source shared by the integration tests
//!
//! `SimulatedNode` walks every accepted transaction through
//! processed (400 ms) → confirmed (1 s) → finalized (`finality_after`),
//! measured on the tokio clock so `start_paused` tests run instantly.

#![allow(dead_code)]

use async_trait::async_trait;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use solconfirm::confirmation::{ConfirmationError, EventSource, LogFilter, SubscriptionHandle};
use solconfirm::rpc_manager::{LedgerRpc, RpcManagerError};
use solconfirm::types::{ConfirmationEvent, ConfirmationStatus, RecentBlockhash, SignatureStatus};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const PROCESSED_AFTER: Duration = Duration::from_millis(400);
pub const CONFIRMED_AFTER: Duration = Duration::from_secs(1);
const WATCH_INTERVAL: Duration = Duration::from_millis(100);

struct Landed {
    tx: Transaction,
    at: Instant,
    slot: u64,
}

pub struct SimulatedNode {
    finality_after: Duration,
    rent_per_byte: u64,
    landed: Mutex<Vec<Landed>>,
    reject_with: Mutex<Option<RpcManagerError>>,
    rejected: Mutex<Vec<Transaction>>,
    blockhash: Hash,
}

impl SimulatedNode {
    pub fn new() -> Arc<Self> {
        Self::with_finality(Duration::from_secs(2))
    }

    pub fn with_finality(finality_after: Duration) -> Arc<Self> {
        Arc::new(Self {
            finality_after,
            rent_per_byte: 7,
            landed: Mutex::new(Vec::new()),
            reject_with: Mutex::new(None),
            rejected: Mutex::new(Vec::new()),
            blockhash: Hash::new_unique(),
        })
    }

    /// Fail every following submission with `err`
    pub fn reject_submissions(&self, err: RpcManagerError) {
        *self.reject_with.lock().unwrap() = Some(err);
    }

    pub fn rent_for(&self, data_len: usize) -> u64 {
        890_880 + self.rent_per_byte * data_len as u64
    }

    pub fn submitted(&self) -> Vec<Transaction> {
        self.landed.lock().unwrap().iter().map(|l| l.tx.clone()).collect()
    }

    /// Transactions turned away by [`Self::reject_submissions`]
    pub fn rejected(&self) -> Vec<Transaction> {
        self.rejected.lock().unwrap().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.landed.lock().unwrap().len()
    }

    fn status_at(&self, elapsed: Duration) -> Option<ConfirmationStatus> {
        if elapsed >= self.finality_after {
            Some(ConfirmationStatus::Finalized)
        } else if elapsed >= CONFIRMED_AFTER {
            Some(ConfirmationStatus::Confirmed)
        } else if elapsed >= PROCESSED_AFTER {
            Some(ConfirmationStatus::Processed)
        } else {
            None
        }
    }

    fn current_status(&self, signature: &Signature) -> Option<(ConfirmationStatus, u64)> {
        let landed = self.landed.lock().unwrap();
        let entry = landed.iter().find(|l| l.tx.signatures[0] == *signature)?;
        self.status_at(entry.at.elapsed()).map(|s| (s, entry.slot))
    }

    /// Processed transactions that reference `key`, with their slots
    fn processed_mentioning(&self, key: &Pubkey) -> Vec<(Signature, u64)> {
        self.landed
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.tx.message.account_keys.contains(key))
            .filter(|l| self.status_at(l.at.elapsed()).is_some())
            .map(|l| (l.tx.signatures[0], l.slot))
            .collect()
    }
}

#[async_trait]
impl LedgerRpc for SimulatedNode {
    fn endpoint(&self) -> &str {
        "simulated"
    }

    async fn latest_blockhash(&self) -> Result<RecentBlockhash, RpcManagerError> {
        Ok(RecentBlockhash::new(self.blockhash, 300))
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, RpcManagerError> {
        Ok(self.rent_for(data_len))
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, RpcManagerError> {
        if let Some(err) = self.reject_with.lock().unwrap().clone() {
            self.rejected.lock().unwrap().push(tx.clone());
            return Err(err);
        }
        if tx.verify().is_err() {
            return Err(RpcManagerError::RejectedByNode {
                endpoint: "simulated".to_string(),
                message: "signature verification failure".to_string(),
                code: Some(-32003),
            });
        }
        let mut landed = self.landed.lock().unwrap();
        let slot = 1_000 + landed.len() as u64;
        landed.push(Landed {
            tx: tx.clone(),
            at: Instant::now(),
            slot,
        });
        Ok(tx.signatures[0])
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcManagerError> {
        Ok(self
            .current_status(signature)
            .map(|(status, _)| SignatureStatus::new(status)))
    }
}

fn wanted_status(commitment: CommitmentConfig) -> ConfirmationStatus {
    if commitment.is_finalized() {
        ConfirmationStatus::Finalized
    } else if commitment.is_confirmed() {
        ConfirmationStatus::Confirmed
    } else {
        ConfirmationStatus::Processed
    }
}

/// Event source that watches a [`SimulatedNode`]
pub struct SimulatedEvents {
    node: Arc<SimulatedNode>,
    releases: Arc<AtomicUsize>,
}

impl SimulatedEvents {
    pub fn new(node: Arc<SimulatedNode>) -> Arc<Self> {
        Arc::new(Self {
            node,
            releases: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    fn handle(
        &self,
        label: String,
        rx: mpsc::UnboundedReceiver<ConfirmationEvent>,
        task: tokio::task::JoinHandle<()>,
    ) -> SubscriptionHandle {
        let releases = self.releases.clone();
        let abort = task.abort_handle();
        SubscriptionHandle::new(label, rx, move || {
            abort.abort();
            releases.fetch_add(1, Ordering::SeqCst);
        })
    }
}

#[async_trait]
impl EventSource for SimulatedEvents {
    fn endpoint(&self) -> &str {
        "simulated-ws"
    }

    async fn subscribe_signature(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<SubscriptionHandle, ConfirmationError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let node = self.node.clone();
        let signature = *signature;
        let wanted = wanted_status(commitment);

        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(WATCH_INTERVAL).await;
                if let Some((status, slot)) = node.current_status(&signature) {
                    if status >= wanted {
                        let _ = tx.send(ConfirmationEvent::Signature {
                            signature,
                            slot,
                            err: None,
                        });
                        return;
                    }
                }
            }
        });
        Ok(self.handle(format!("signature:{}", signature), rx, task))
    }

    async fn subscribe_logs(
        &self,
        filter: LogFilter,
        _commitment: CommitmentConfig,
    ) -> Result<SubscriptionHandle, ConfirmationError> {
        let LogFilter::Mentions(program_id) = filter.clone() else {
            return Err(ConfirmationError::setup_failed(
                self.endpoint(),
                filter.to_string(),
                "only mention filters are simulated",
            ));
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let node = self.node.clone();

        let task = tokio::spawn(async move {
            let mut reported = Vec::new();
            loop {
                tokio::time::sleep(WATCH_INTERVAL).await;
                for (signature, slot) in node.processed_mentioning(&program_id) {
                    if reported.contains(&signature) {
                        continue;
                    }
                    reported.push(signature);
                    // Another user's call to the same program lands first
                    let _ = tx.send(ConfirmationEvent::Logs {
                        signature: other_signature().to_string(),
                        slot,
                        logs: vec![format!("Program {} invoke [1]", program_id)],
                        err: None,
                    });
                    let _ = tx.send(ConfirmationEvent::Logs {
                        signature: signature.to_string(),
                        slot,
                        logs: program_logs(&program_id),
                        err: None,
                    });
                }
            }
        });
        Ok(self.handle(filter.to_string(), rx, task))
    }
}

pub fn program_logs(program_id: &Pubkey) -> Vec<String> {
    vec![
        format!("Program {} invoke [1]", program_id),
        "Program log: Instruction: TransferSolWithCpi".to_string(),
        format!("Program {} success", program_id),
    ]
}

fn other_signature() -> Signature {
    Keypair::new().sign_message(b"someone else")
}

/// Event source whose websocket is down
pub struct UnavailableEvents;

#[async_trait]
impl EventSource for UnavailableEvents {
    fn endpoint(&self) -> &str {
        "ws://unreachable"
    }

    async fn subscribe_signature(
        &self,
        signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> Result<SubscriptionHandle, ConfirmationError> {
        Err(ConfirmationError::setup_failed(
            self.endpoint(),
            signature.to_string(),
            "connection refused",
        ))
    }

    async fn subscribe_logs(
        &self,
        filter: LogFilter,
        _commitment: CommitmentConfig,
    ) -> Result<SubscriptionHandle, ConfirmationError> {
        Err(ConfirmationError::setup_failed(
            self.endpoint(),
            filter.to_string(),
            "connection refused",
        ))
    }
}
