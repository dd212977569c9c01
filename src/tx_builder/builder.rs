//! Core transaction building
//!
//! Assembles instructions, a recent blockhash and a fee payer into an
//! unsigned legacy transaction. Pure construction: no RPC, no signing.

use crate::tx_builder::errors::TransactionBuilderError;
use solana_sdk::{
    hash::Hash, instruction::Instruction, message::Message, packet::PACKET_DATA_SIZE,
    pubkey::Pubkey, transaction::Transaction,
};

/// Largest serialized transaction the ledger accepts
pub const MAX_TRANSACTION_SIZE: usize = PACKET_DATA_SIZE;

/// Transaction envelope waiting for signatures.
///
/// Signature slots are pre-sized to the message's required signer count and
/// hold default (all-zero) signatures until [`crate::tx_builder::sign`] fills
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTx {
    tx: Transaction,
}

impl UnsignedTx {
    pub fn message(&self) -> &Message {
        &self.tx.message
    }

    pub fn fee_payer(&self) -> &Pubkey {
        // Message::new_with_blockhash always puts the payer first
        &self.tx.message.account_keys[0]
    }

    pub fn recent_blockhash(&self) -> &Hash {
        &self.tx.message.recent_blockhash
    }

    /// Signer slots in message order; the fee payer is always first.
    pub fn required_signers(&self) -> &[Pubkey] {
        let keys = &self.tx.message.account_keys;
        let num_signers = self.tx.message.header.num_required_signatures as usize;
        &keys[..num_signers.min(keys.len())]
    }

    /// Canonical message bytes covered by every signature
    pub fn message_data(&self) -> Vec<u8> {
        self.tx.message_data()
    }

    pub(crate) fn into_transaction(self) -> Transaction {
        self.tx
    }
}

/// Build an unsigned transaction.
///
/// The fee payer is added as a writable signer even when no instruction
/// mentions it.
///
/// # Errors
///
/// * [`TransactionBuilderError::InvalidInstructionSet`] if `instructions` is empty
/// * [`TransactionBuilderError::Encoding`] if the serialized transaction,
///   including signature placeholders, exceeds [`MAX_TRANSACTION_SIZE`]
pub fn build(
    instructions: Vec<Instruction>,
    recent_blockhash: Hash,
    fee_payer: Pubkey,
) -> Result<UnsignedTx, TransactionBuilderError> {
    if instructions.is_empty() {
        return Err(TransactionBuilderError::empty_instructions());
    }

    let message = Message::new_with_blockhash(&instructions, Some(&fee_payer), &recent_blockhash);
    let tx = Transaction::new_unsigned(message);

    let size = serialized_size(&tx)?;
    if size > MAX_TRANSACTION_SIZE {
        return Err(TransactionBuilderError::Encoding {
            size,
            max: MAX_TRANSACTION_SIZE,
        });
    }

    tracing::trace!(
        fee_payer = %fee_payer,
        instructions = instructions.len(),
        signers = tx.message.header.num_required_signatures,
        size,
        "Built unsigned transaction"
    );

    Ok(UnsignedTx { tx })
}

/// Wire size of a transaction (signatures are fixed-width, so this is the
/// same before and after signing).
pub fn serialized_size(tx: &Transaction) -> Result<usize, TransactionBuilderError> {
    bincode::serialized_size(tx)
        .map(|size| size as usize)
        .map_err(|e| TransactionBuilderError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{instruction::AccountMeta, system_instruction, system_program};

    #[test]
    fn test_build_rejects_empty_instruction_list() {
        let result = build(vec![], Hash::new_unique(), Pubkey::new_unique());
        assert_eq!(result, Err(TransactionBuilderError::empty_instructions()));
    }

    #[test]
    fn test_fee_payer_is_first_writable_signer() {
        let payer = Pubkey::new_unique();
        let from = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        // Payer is not mentioned by the instruction at all
        let ix = system_instruction::transfer(&from, &to, 1);
        let unsigned = build(vec![ix], Hash::new_unique(), payer).unwrap();

        assert_eq!(unsigned.fee_payer(), &payer);
        assert_eq!(unsigned.required_signers(), &[payer, from]);
        let header = &unsigned.message().header;
        // Writable signers come before read-only signers
        assert!(header.num_required_signatures > header.num_readonly_signed_accounts);
    }

    #[test]
    fn test_signer_slots_are_deduplicated() {
        let payer = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let ix = system_instruction::transfer(&payer, &to, 100_000);
        let unsigned = build(vec![ix.clone(), ix], Hash::new_unique(), payer).unwrap();

        assert_eq!(unsigned.required_signers(), &[payer]);
        assert_eq!(unsigned.message().instructions.len(), 2);
    }

    #[test]
    fn test_blockhash_is_embedded() {
        let payer = Pubkey::new_unique();
        let blockhash = Hash::new_unique();
        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 5);
        let unsigned = build(vec![ix], blockhash, payer).unwrap();
        assert_eq!(unsigned.recent_blockhash(), &blockhash);
    }

    #[test]
    fn test_oversized_transaction_is_rejected() {
        let payer = Pubkey::new_unique();
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[7u8; MAX_TRANSACTION_SIZE],
            vec![AccountMeta::new(payer, true)],
        );
        match build(vec![ix], Hash::new_unique(), payer) {
            Err(TransactionBuilderError::Encoding { size, max }) => {
                assert!(size > max);
                assert_eq!(max, 1232);
            }
            other => panic!("expected encoding error, got {:?}", other),
        }
    }

    #[test]
    fn test_size_just_under_limit_is_accepted() {
        let payer = Pubkey::new_unique();
        let ix = Instruction::new_with_bytes(
            system_program::id(),
            &[0u8; 16],
            vec![AccountMeta::new(payer, true)],
        );
        let unsigned = build(vec![ix], Hash::new_unique(), payer).unwrap();
        let size = serialized_size(&unsigned.into_transaction()).unwrap();
        assert!(size <= MAX_TRANSACTION_SIZE);
    }
}
