//! Instruction constructors and instruction data encoding
//!
//! - Program method calls: 8-byte discriminator `sha256("global:" + name)[..8]`
//!   followed by little-endian arguments. This is a fixed wire contract with
//!   the on-chain program and must stay byte-exact.
//! - Deployment: `create_account` owned by the upgradeable BPF loader
//! - Invocation: custom instruction with a fixed three-slot account list
//! - Transfer: plain system transfer

use crate::tx_builder::errors::TransactionBuilderError;
use sha2::{Digest, Sha256};
use solana_sdk::{
    bpf_loader_upgradeable,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_instruction, system_program,
};

/// Length of a method discriminator
pub const DISCRIMINATOR_LEN: usize = 8;

/// Namespace prefix hashed in front of the method name
const METHOD_NAMESPACE: &str = "global";

/// First 8 bytes of `sha256("global:<method_name>")`
pub fn method_discriminator(method_name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}", METHOD_NAMESPACE, method_name).as_bytes());
    let hash = hasher.finalize();
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&hash[..DISCRIMINATOR_LEN]);
    out
}

/// Builder for program method call data.
///
/// ```
/// use solconfirm::tx_builder::MethodCall;
///
/// let data = MethodCall::new("transfer_sol_with_cpi").arg_u64(100_000).into_data();
/// assert_eq!(data.len(), 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    data: Vec<u8>,
}

impl MethodCall {
    pub fn new(method_name: &str) -> Self {
        let mut data = Vec::with_capacity(DISCRIMINATOR_LEN + 8);
        data.extend_from_slice(&method_discriminator(method_name));
        Self { data }
    }

    pub fn arg_u64(mut self, value: u64) -> Self {
        self.data.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn arg_u32(mut self, value: u32) -> Self {
        self.data.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn arg_u8(mut self, value: u8) -> Self {
        self.data.push(value);
        self
    }

    pub fn arg_bool(self, value: bool) -> Self {
        self.arg_u8(u8::from(value))
    }

    pub fn arg_pubkey(mut self, value: &Pubkey) -> Self {
        self.data.extend_from_slice(value.as_ref());
        self
    }

    /// Length-prefixed (u32 LE) byte string
    pub fn arg_bytes(mut self, value: &[u8]) -> Self {
        self.data
            .extend_from_slice(&(value.len() as u32).to_le_bytes());
        self.data.extend_from_slice(value);
        self
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Data for the common single-amount method shape, e.g. `transfer_sol_with_cpi(amount)`
pub fn encode_amount_call(method_name: &str, amount: u64) -> Vec<u8> {
    MethodCall::new(method_name).arg_u64(amount).into_data()
}

/// Account list for an invocation: payer, recipient, system program.
///
/// The shape is fixed to what the transfer-style programs expect; callers
/// needing a different account list build the instruction themselves.
pub fn invocation_accounts(payer: &Pubkey, recipient: &Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(*recipient, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ]
}

/// Custom program instruction with the fixed invocation account list
pub fn invocation_instruction(
    program_id: &Pubkey,
    instruction_data: Vec<u8>,
    payer: &Pubkey,
    recipient: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: invocation_accounts(payer, recipient),
        data: instruction_data,
    }
}

/// Program account creation for deployment.
///
/// The new account is funded by `payer` with the rent-exempt minimum, sized
/// to the program bytes and owned by the upgradeable BPF loader.
///
/// # Errors
///
/// Returns [`TransactionBuilderError::InvalidInstructionSet`] for an empty program.
pub fn deployment_instruction(
    payer: &Pubkey,
    program_account: &Pubkey,
    rent_exempt_lamports: u64,
    program_len: usize,
) -> Result<Instruction, TransactionBuilderError> {
    if program_len == 0 {
        return Err(TransactionBuilderError::invalid("program bytes are empty"));
    }
    Ok(system_instruction::create_account(
        payer,
        program_account,
        rent_exempt_lamports,
        program_len as u64,
        &bpf_loader_upgradeable::id(),
    ))
}

/// System transfer of `lamports` from `from` to `to`
///
/// # Errors
///
/// Returns [`TransactionBuilderError::InvalidInstructionSet`] for a zero amount.
pub fn transfer_instruction(
    from: &Pubkey,
    to: &Pubkey,
    lamports: u64,
) -> Result<Instruction, TransactionBuilderError> {
    if lamports == 0 {
        return Err(TransactionBuilderError::invalid(
            "amount must be greater than zero",
        ));
    }
    Ok(system_instruction::transfer(from, to, lamports))
}
