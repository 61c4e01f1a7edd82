//! Compiles a composed instruction list into an unsigned v0 transaction.

use anchor_client::solana_sdk::address_lookup_table::AddressLookupTableAccount;
use anchor_client::solana_sdk::hash::Hash;
use anchor_client::solana_sdk::message::{v0, VersionedMessage};
use anchor_client::solana_sdk::signature::Signature;
use anchor_client::solana_sdk::transaction::VersionedTransaction;
use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use tracing::debug;
use yieldswap_clients::rpc::LedgerRpc;

use crate::error::ExecutionError;

/// Everything needed to compile one attempt's transaction.
#[derive(Debug, Clone)]
pub struct CandidateTransaction {
  pub fee_payer: Pubkey,
  pub recent_blockhash: Hash,
  pub last_valid_block_height: u64,
  pub instructions: Vec<Instruction>,
  pub lookup_tables: Vec<AddressLookupTableAccount>,
}

impl CandidateTransaction {
  /// Fetches a fresh blockhash and pairs it with the instructions.
  ///
  /// # Errors
  /// * [`ExecutionError::Ledger`] if the blockhash cannot be fetched
  pub async fn prepare(
    rpc: &dyn LedgerRpc,
    fee_payer: Pubkey,
    instructions: Vec<Instruction>,
    lookup_tables: Vec<AddressLookupTableAccount>,
  ) -> Result<Self, ExecutionError> {
    let (recent_blockhash, last_valid_block_height) = rpc
      .get_latest_blockhash()
      .await
      .map_err(|e| ExecutionError::Ledger(format!("{e:?}")))?;
    debug!(%recent_blockhash, last_valid_block_height, "fresh blockhash");
    Ok(CandidateTransaction {
      fee_payer,
      recent_blockhash,
      last_valid_block_height,
      instructions,
      lookup_tables,
    })
  }

  /// Compiles the v0 message.
  ///
  /// # Errors
  /// * [`ExecutionError::CompilationFailed`], e.g. too many unique accounts
  pub fn compile(&self) -> Result<v0::Message, ExecutionError> {
    v0::Message::try_compile(
      &self.fee_payer,
      &self.instructions,
      &self.lookup_tables,
      self.recent_blockhash,
    )
    .map_err(|e| ExecutionError::CompilationFailed(e.to_string()))
  }

  /// Transaction with default signatures, one per required signer.
  ///
  /// # Errors
  /// * Same as [`CandidateTransaction::compile`]
  pub fn unsigned_transaction(
    &self,
  ) -> Result<VersionedTransaction, ExecutionError> {
    let message = self.compile()?;
    let num_sigs = message.header.num_required_signatures.into();
    Ok(VersionedTransaction {
      signatures: vec![Signature::default(); num_sigs],
      message: VersionedMessage::V0(message),
    })
  }
}
