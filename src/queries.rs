//! Read-only query reports
//!
//! Plain snapshots of balances, accounts, blocks and landed transactions as
//! returned by [`SolanaRpc`](crate::rpc_manager::SolanaRpc). Each report
//! renders a human-readable summary through `Display`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use solana_sdk::{
    account::Account, message::MessageHeader, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::{
    option_serializer::OptionSerializer, EncodedConfirmedTransactionWithStatusMeta,
    UiConfirmedBlock, UiTransactionStatusMeta,
};
use std::fmt;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Decimal places kept when rendering SOL amounts
pub const SOL_DISPLAY_DECIMALS: u32 = 6;

/// Render lamports as SOL, truncated (not rounded) to six decimals, with
/// trailing zeros removed.
///
/// ```
/// use solconfirm::queries::lamports_to_sol;
///
/// assert_eq!(lamports_to_sol(1_500_000_000), "1.5");
/// assert_eq!(lamports_to_sol(123_456_789), "0.123456");
/// ```
pub fn lamports_to_sol(lamports: u64) -> String {
    let unit = LAMPORTS_PER_SOL / 10u64.pow(SOL_DISPLAY_DECIMALS);
    let scaled = lamports / unit;
    let scale = 10u64.pow(SOL_DISPLAY_DECIMALS);
    let whole = scaled / scale;
    let frac = scaled % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = SOL_DISPLAY_DECIMALS as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

fn format_block_time(ts: Option<i64>) -> String {
    ts.and_then(|t| DateTime::<Utc>::from_timestamp(t, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceReport {
    pub account: Pubkey,
    pub lamports: u64,
}

impl BalanceReport {
    pub fn sol(&self) -> String {
        lamports_to_sol(self.lamports)
    }
}

impl fmt::Display for BalanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} SOL ({} lamports)", self.account, self.sol(), self.lamports)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountReport {
    pub account: Pubkey,
    pub lamports: u64,
    pub owner: Pubkey,
    pub executable: bool,
    pub space: usize,
    pub rent_epoch: u64,
}

impl AccountReport {
    pub fn from_account(account: Pubkey, data: &Account) -> Self {
        Self {
            account,
            lamports: data.lamports,
            owner: data.owner,
            executable: data.executable,
            space: data.data.len(),
            rent_epoch: data.rent_epoch,
        }
    }
}

impl fmt::Display for AccountReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "account:    {}", self.account)?;
        writeln!(f, "lamports:   {}", self.lamports)?;
        writeln!(f, "sol:        {}", lamports_to_sol(self.lamports))?;
        writeln!(f, "owner:      {}", self.owner)?;
        writeln!(f, "executable: {}", self.executable)?;
        write!(f, "space:      {}", self.space)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockReport {
    pub slot: u64,
    pub blockhash: String,
    pub previous_blockhash: String,
    pub parent_slot: u64,
    pub block_time: Option<i64>,
    pub block_height: Option<u64>,
    pub signature_count: usize,
}

impl BlockReport {
    pub fn from_block(slot: u64, block: &UiConfirmedBlock) -> Self {
        let signature_count = block
            .signatures
            .as_ref()
            .map(Vec::len)
            .or_else(|| block.transactions.as_ref().map(Vec::len))
            .unwrap_or(0);
        Self {
            slot,
            blockhash: block.blockhash.clone(),
            previous_blockhash: block.previous_blockhash.clone(),
            parent_slot: block.parent_slot,
            block_time: block.block_time,
            block_height: block.block_height,
            signature_count,
        }
    }
}

impl fmt::Display for BlockReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "slot:               {}", self.slot)?;
        writeln!(f, "blockhash:          {}", self.blockhash)?;
        writeln!(f, "previous blockhash: {}", self.previous_blockhash)?;
        writeln!(f, "parent slot:        {}", self.parent_slot)?;
        match self.block_height {
            Some(h) => writeln!(f, "block height:       {}", h)?,
            None => writeln!(f, "block height:       unknown")?,
        }
        writeln!(f, "block time:         {}", format_block_time(self.block_time))?;
        write!(f, "transactions:       {}", self.signature_count)
    }
}

/// Compiled instruction shape: program index and data length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstructionSummary {
    pub program_id_index: u8,
    pub data_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionReport {
    pub signature: Signature,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub fee: Option<u64>,
    /// Fee payer balance before and after execution
    pub payer_pre_balance: Option<u64>,
    pub payer_post_balance: Option<u64>,
    pub logs: Vec<String>,
    pub err: Option<String>,
    pub recent_blockhash: Option<String>,
    #[serde(skip)]
    pub header: Option<MessageHeader>,
    pub versioned: bool,
    pub account_keys: Vec<Pubkey>,
    pub lookup_tables: Vec<Pubkey>,
    pub instructions: Vec<InstructionSummary>,
}

impl TransactionReport {
    pub fn from_encoded(
        signature: Signature,
        encoded: &EncodedConfirmedTransactionWithStatusMeta,
    ) -> Self {
        let decoded = encoded.transaction.transaction.decode();
        Self::from_parts(
            signature,
            encoded.slot,
            encoded.block_time,
            encoded.transaction.meta.as_ref(),
            decoded.as_ref(),
        )
    }

    pub fn from_parts(
        signature: Signature,
        slot: u64,
        block_time: Option<i64>,
        meta: Option<&UiTransactionStatusMeta>,
        tx: Option<&VersionedTransaction>,
    ) -> Self {
        let mut report = Self {
            signature,
            slot,
            block_time,
            fee: None,
            payer_pre_balance: None,
            payer_post_balance: None,
            logs: Vec::new(),
            err: None,
            recent_blockhash: None,
            header: None,
            versioned: false,
            account_keys: Vec::new(),
            lookup_tables: Vec::new(),
            instructions: Vec::new(),
        };

        if let Some(meta) = meta {
            report.fee = Some(meta.fee);
            report.payer_pre_balance = meta.pre_balances.first().copied();
            report.payer_post_balance = meta.post_balances.first().copied();
            report.err = meta.err.as_ref().map(|e| format!("{:?}", e));
            if let OptionSerializer::Some(logs) = &meta.log_messages {
                report.logs = logs.clone();
            }
        }

        if let Some(tx) = tx {
            let message = &tx.message;
            report.recent_blockhash = Some(message.recent_blockhash().to_string());
            report.header = Some(*message.header());
            report.versioned = message.address_table_lookups().is_some();
            report.account_keys = message.static_account_keys().to_vec();
            report.lookup_tables = message
                .address_table_lookups()
                .map(|lookups| lookups.iter().map(|l| l.account_key).collect())
                .unwrap_or_default();
            report.instructions = message
                .instructions()
                .iter()
                .map(|ix| InstructionSummary {
                    program_id_index: ix.program_id_index,
                    data_len: ix.data.len(),
                })
                .collect();
        }

        report
    }
}

impl fmt::Display for TransactionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "signature:        {}", self.signature)?;
        writeln!(f, "slot:             {}", self.slot)?;
        writeln!(f, "block time:       {}", format_block_time(self.block_time))?;
        if let Some(fee) = self.fee {
            writeln!(f, "fee:              {}", fee)?;
        }
        if let (Some(pre), Some(post)) = (self.payer_pre_balance, self.payer_post_balance) {
            writeln!(f, "payer balance:    {} -> {}", pre, post)?;
        }
        if let Some(err) = &self.err {
            writeln!(f, "error:            {}", err)?;
        }
        if let Some(hash) = &self.recent_blockhash {
            writeln!(f, "recent blockhash: {}", hash)?;
        }
        if let Some(h) = &self.header {
            writeln!(
                f,
                "header:           signers={} readonly_signed={} readonly_unsigned={}",
                h.num_required_signatures,
                h.num_readonly_signed_accounts,
                h.num_readonly_unsigned_accounts
            )?;
        }
        writeln!(f, "versioned:        {}", self.versioned)?;
        for (i, key) in self.account_keys.iter().enumerate() {
            writeln!(f, "account[{}]:       {}", i, key)?;
        }
        for table in &self.lookup_tables {
            writeln!(f, "lookup table:     {}", table)?;
        }
        for (i, ix) in self.instructions.iter().enumerate() {
            writeln!(
                f,
                "instruction {}:    program index={} data length={}",
                i, ix.program_id_index, ix.data_len
            )?;
        }
        for line in &self.logs {
            writeln!(f, "log: {}", line)?;
        }
        Ok(())
    }
}
