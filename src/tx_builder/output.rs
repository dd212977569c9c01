//! Signed transaction output
//!
//! Holds a fully signed transaction ready for submission. The transaction id
//! is the fee payer's signature, known as soon as signing finishes, which
//! lets a flow open a signature subscription before it submits.

use crate::tx_builder::errors::TransactionBuilderError;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
use std::collections::HashMap;

/// Transaction with every required signer slot filled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    /// The signed transaction ready for broadcast
    pub tx: Transaction,
}

impl SignedTx {
    pub(crate) fn new(tx: Transaction) -> Self {
        Self { tx }
    }

    /// Transaction id (the fee payer's signature)
    pub fn signature(&self) -> Signature {
        self.tx.signatures.first().copied().unwrap_or_default()
    }

    /// Signer slots in message order
    pub fn required_signers(&self) -> &[Pubkey] {
        let keys = &self.tx.message.account_keys;
        let num_signers = self.tx.message.header.num_required_signatures as usize;
        &keys[..num_signers.min(keys.len())]
    }

    /// Signature per signer.
    ///
    /// Holds exactly one entry per required signer slot and nothing else.
    pub fn signatures_by_signer(&self) -> HashMap<Pubkey, Signature> {
        self.required_signers()
            .iter()
            .copied()
            .zip(self.tx.signatures.iter().copied())
            .collect()
    }

    /// Checks every signature against the message bytes
    pub fn verify(&self) -> bool {
        self.tx.verify().is_ok()
    }

    /// Wire bytes as sent to `sendTransaction`
    pub fn serialize(&self) -> Result<Vec<u8>, TransactionBuilderError> {
        bincode::serialize(&self.tx).map_err(|e| TransactionBuilderError::Serialization(e.to_string()))
    }

    pub fn into_transaction(self) -> Transaction {
        self.tx
    }
}
