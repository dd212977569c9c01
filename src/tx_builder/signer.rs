//! Signer resolution
//!
//! A [`SignatureResolver`] maps a signer slot's public key to the keypair that
//! signs for it. [`sign`] asks the resolver once per distinct required slot
//! and only produces signatures when every slot resolved, so a transaction is
//! never left partially signed.

use crate::tx_builder::builder::UnsignedTx;
use crate::tx_builder::errors::TransactionBuilderError;
use crate::tx_builder::output::SignedTx;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::collections::HashMap;

/// Lookup from a signer slot to the keypair that signs on its behalf
pub trait SignatureResolver {
    fn resolve(&self, key: &Pubkey) -> Option<&Keypair>;
}

impl<T: SignatureResolver + ?Sized> SignatureResolver for &T {
    fn resolve(&self, key: &Pubkey) -> Option<&Keypair> {
        (**self).resolve(key)
    }
}

impl SignatureResolver for Keypair {
    fn resolve(&self, key: &Pubkey) -> Option<&Keypair> {
        (self.pubkey() == *key).then_some(self)
    }
}

impl SignatureResolver for [&Keypair] {
    fn resolve(&self, key: &Pubkey) -> Option<&Keypair> {
        self.iter().copied().find(|kp| kp.pubkey() == *key)
    }
}

impl<const N: usize> SignatureResolver for [&Keypair; N] {
    fn resolve(&self, key: &Pubkey) -> Option<&Keypair> {
        self.as_slice().resolve(key)
    }
}

impl SignatureResolver for [Keypair] {
    fn resolve(&self, key: &Pubkey) -> Option<&Keypair> {
        self.iter().find(|kp| kp.pubkey() == *key)
    }
}

impl SignatureResolver for Vec<Keypair> {
    fn resolve(&self, key: &Pubkey) -> Option<&Keypair> {
        self.as_slice().resolve(key)
    }
}

/// Mapping-backed resolver
#[derive(Default)]
pub struct KeyMap {
    keys: HashMap<Pubkey, Keypair>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a keypair, replacing any previous entry for the same public key
    pub fn insert(&mut self, keypair: Keypair) -> Pubkey {
        let pubkey = keypair.pubkey();
        self.keys.insert(pubkey, keypair);
        pubkey
    }

    pub fn with(mut self, keypair: Keypair) -> Self {
        self.insert(keypair);
        self
    }

    pub fn contains(&self, key: &Pubkey) -> bool {
        self.keys.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl std::fmt::Debug for KeyMap {
    // Never print key material
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMap")
            .field("signers", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SignatureResolver for KeyMap {
    fn resolve(&self, key: &Pubkey) -> Option<&Keypair> {
        self.keys.get(key)
    }
}

/// Two resolvers composed; the first answer wins
pub struct ChainedResolver<A, B> {
    first: A,
    second: B,
}

impl<A, B> ChainedResolver<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: SignatureResolver, B: SignatureResolver> SignatureResolver for ChainedResolver<A, B> {
    fn resolve(&self, key: &Pubkey) -> Option<&Keypair> {
        self.first.resolve(key).or_else(|| self.second.resolve(key))
    }
}

/// Sign every required slot of `unsigned`.
///
/// # Errors
///
/// * [`TransactionBuilderError::MissingSigner`] for the first slot the resolver
///   cannot answer; no signature is produced in that case
/// * [`TransactionBuilderError::Signing`] if the resolver returns a keypair
///   whose public key differs from the slot
pub fn sign<R>(unsigned: UnsignedTx, resolver: &R) -> Result<SignedTx, TransactionBuilderError>
where
    R: SignatureResolver + ?Sized,
{
    let signers = unsigned
        .required_signers()
        .iter()
        .map(|slot| {
            let keypair = resolver
                .resolve(slot)
                .ok_or(TransactionBuilderError::MissingSigner(*slot))?;
            let resolved = keypair.pubkey();
            if resolved != *slot {
                return Err(TransactionBuilderError::signer_mismatch(slot, &resolved));
            }
            Ok(keypair)
        })
        .collect::<Result<Vec<&Keypair>, _>>()?;

    let message_data = unsigned.message_data();
    let mut tx = unsigned.into_transaction();
    for (slot, keypair) in tx.signatures.iter_mut().zip(signers) {
        *slot = keypair.sign_message(&message_data);
    }

    tracing::trace!(
        signature = %tx.signatures.first().copied().unwrap_or_default(),
        signers = tx.signatures.len(),
        "Signed transaction"
    );

    Ok(SignedTx::new(tx))
}
