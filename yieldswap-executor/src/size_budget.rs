//! Serialized size limits for a single transaction.

use anchor_client::solana_sdk::address_lookup_table::AddressLookupTableAccount;
use anchor_client::solana_sdk::hash::Hash;
use anchor_client::solana_sdk::message::{v0, VersionedMessage};
use anchor_client::solana_sdk::signature::Signature;
use anchor_client::solana_sdk::transaction::VersionedTransaction;
use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use base64::prelude::{Engine, BASE64_STANDARD};
use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;

/// Packet data limit for a serialized transaction.
pub const MAX_RAW_BYTES: usize = 1232;

/// Base64 length of a [`MAX_RAW_BYTES`] payload.
pub const MAX_ENCODED_BYTES: usize = 1644;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeBudget {
  pub max_raw_bytes: usize,
  pub max_encoded_bytes: usize,
}

impl Default for SizeBudget {
  fn default() -> Self {
    SizeBudget {
      max_raw_bytes: MAX_RAW_BYTES,
      max_encoded_bytes: MAX_ENCODED_BYTES,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionSize {
  pub raw: usize,
  pub encoded: usize,
}

impl SizeBudget {
  /// Serialized and base64-encoded lengths of a transaction.
  ///
  /// # Errors
  /// * Transaction does not serialize
  pub fn measure(
    transaction: &VersionedTransaction,
  ) -> Result<TransactionSize, ExecutionError> {
    let bytes = bincode::serialize(transaction)
      .map_err(|e| ExecutionError::CompilationFailed(e.to_string()))?;
    Ok(TransactionSize {
      raw: bytes.len(),
      encoded: BASE64_STANDARD.encode(&bytes).len(),
    })
  }

  #[must_use]
  pub fn fits(&self, size: TransactionSize) -> bool {
    size.raw <= self.max_raw_bytes && size.encoded <= self.max_encoded_bytes
  }

  /// # Errors
  /// * [`ExecutionError::TransactionTooLarge`] when either limit is exceeded
  pub fn check(&self, size: TransactionSize) -> Result<(), ExecutionError> {
    if self.fits(size) {
      Ok(())
    } else {
      Err(ExecutionError::TransactionTooLarge {
        raw: size.raw,
        encoded: size.encoded,
        max_raw: self.max_raw_bytes,
        max_encoded: self.max_encoded_bytes,
      })
    }
  }

  /// Measures and checks a transaction.
  ///
  /// # Errors
  /// * Serialization failure, or either limit exceeded
  pub fn validate(
    &self,
    transaction: &VersionedTransaction,
  ) -> Result<TransactionSize, ExecutionError> {
    let size = Self::measure(transaction)?;
    self.check(size)?;
    Ok(size)
  }

  /// Size the instructions would occupy once compiled against `tables` and
  /// signed.
  ///
  /// Blockhash and signatures are placeholders of the final width, so the
  /// estimate equals the size of the eventual signed transaction.
  ///
  /// # Errors
  /// * [`ExecutionError::CompilationFailed`] if the message does not compile
  pub fn estimate(
    fee_payer: &Pubkey,
    instructions: &[Instruction],
    tables: &[AddressLookupTableAccount],
  ) -> Result<TransactionSize, ExecutionError> {
    let message =
      v0::Message::try_compile(fee_payer, instructions, tables, Hash::default())
        .map_err(|e| ExecutionError::CompilationFailed(e.to_string()))?;
    let signatures =
      vec![Signature::default(); message.header.num_required_signatures.into()];
    let transaction = VersionedTransaction {
      signatures,
      message: VersionedMessage::V0(message),
    };
    Self::measure(&transaction)
  }
}

#[cfg(test)]
mod tests {
  use anchor_lang::prelude::AccountMeta;

  use super::*;

  fn sized(raw: usize) -> TransactionSize {
    TransactionSize {
      raw,
      encoded: base64::encoded_len(raw, true).unwrap_or(usize::MAX),
    }
  }

  fn padded(fee_payer: Pubkey, data_len: usize) -> Vec<Instruction> {
    vec![Instruction {
      program_id: Pubkey::new_unique(),
      accounts: vec![AccountMeta::new(fee_payer, true)],
      data: vec![0; data_len],
    }]
  }

  /// Bytes outside the instruction payload for a single-signer, two-key,
  /// one-instruction v0 transaction with a one-byte data length prefix.
  fn overhead(fee_payer: Pubkey) -> usize {
    SizeBudget::estimate(&fee_payer, &padded(fee_payer, 0), &[])
      .map(|size| size.raw)
      .unwrap_or_default()
  }

  #[test]
  fn limit_is_inclusive() -> anyhow::Result<()> {
    let payer = Pubkey::new_unique();
    // data lengths >= 128 take a two-byte compact length prefix
    let data_len = MAX_RAW_BYTES - overhead(payer) - 1;
    let size = SizeBudget::estimate(&payer, &padded(payer, data_len), &[])?;
    assert_eq!(size.raw, MAX_RAW_BYTES);
    assert_eq!(size.encoded, MAX_ENCODED_BYTES);
    assert_eq!(SizeBudget::default().check(size), Ok(()));
    Ok(())
  }

  #[test]
  fn one_byte_over_is_rejected() -> anyhow::Result<()> {
    let payer = Pubkey::new_unique();
    let data_len = MAX_RAW_BYTES - overhead(payer);
    let size = SizeBudget::estimate(&payer, &padded(payer, data_len), &[])?;
    assert_eq!(size.raw, MAX_RAW_BYTES + 1);
    assert!(matches!(
      SizeBudget::default().check(size),
      Err(ExecutionError::TransactionTooLarge { raw: 1233, .. })
    ));
    Ok(())
  }

  #[test]
  fn encoded_limit_is_checked_independently() {
    let budget = SizeBudget {
      max_raw_bytes: 2000,
      max_encoded_bytes: 100,
    };
    assert!(budget.check(sized(75)).is_ok());
    assert!(budget.check(sized(76)).is_err());
  }
}
