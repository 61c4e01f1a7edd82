//! Merges a swap instruction set and a deposit instruction set into one
//! ordered list for a single transaction.
//!
//! Order: compute budget, swap setup, swap primary, deposit body, then the
//! swap's cleanup and other groups when they still fit. Only the swap's
//! compute budget survives; the deposit's is used when the swap has none.

use std::ops::Range;

use anchor_client::solana_sdk::address_lookup_table::AddressLookupTableAccount;
use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use tracing::debug;
use yieldswap_core::InstructionGroups;

use crate::error::ExecutionError;
use crate::size_budget::{SizeBudget, TransactionSize};

/// Swap groups that may be left out to save space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalGroup {
  Cleanup,
  Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedInstructionSet {
  pub instructions: Vec<Instruction>,
  pub swap_primary_index: usize,
  /// Position of the deposit body, primary last.
  pub deposit_range: Range<usize>,
  pub included: Vec<OptionalGroup>,
  pub dropped: Vec<OptionalGroup>,
  pub estimated_size: TransactionSize,
}

impl ComposedInstructionSet {
  #[must_use]
  pub fn deposit_primary_index(&self) -> usize {
    self.deposit_range.end - 1
  }
}

/// Composes the combined instruction list.
///
/// Optional groups are added whole, in order, only while the estimated size
/// stays within `budget`. The mandatory part is returned even when it alone
/// exceeds the budget; callers check `estimated_size`.
///
/// # Errors
/// * Swap or deposit set has no primary instruction
/// * Mandatory part fails to compile
pub fn compose(
  fee_payer: &Pubkey,
  swap: &InstructionGroups,
  deposit: &[Instruction],
  tables: &[AddressLookupTableAccount],
  budget: &SizeBudget,
) -> Result<ComposedInstructionSet, ExecutionError> {
  let swap_primary = swap.require_primary("swap")?;
  let deposit = InstructionGroups::from_flat(deposit.to_vec());
  deposit.require_primary("deposit")?;

  let compute_budget = if swap.compute_budget.is_empty() {
    &deposit.compute_budget
  } else {
    &swap.compute_budget
  };
  let mut instructions = compute_budget
    .iter()
    .chain(swap.setup.iter())
    .cloned()
    .collect::<Vec<_>>();
  let swap_primary_index = instructions.len();
  instructions.push(swap_primary.clone());
  let deposit_start = instructions.len();
  instructions.extend(deposit.body().cloned());
  let deposit_range = deposit_start..instructions.len();

  let mut estimated_size =
    SizeBudget::estimate(fee_payer, &instructions, tables)?;
  let mut included = vec![];
  let mut dropped = vec![];
  for (group, members) in [
    (OptionalGroup::Cleanup, &swap.cleanup),
    (OptionalGroup::Other, &swap.other),
  ] {
    if members.is_empty() {
      continue;
    }
    let trial = instructions
      .iter()
      .chain(members.iter())
      .cloned()
      .collect::<Vec<_>>();
    match SizeBudget::estimate(fee_payer, &trial, tables) {
      Ok(size) if budget.fits(size) => {
        instructions = trial;
        estimated_size = size;
        included.push(group);
      }
      Ok(size) => {
        debug!(?group, raw = size.raw, "dropping optional group: too large");
        dropped.push(group);
      }
      Err(e) => {
        debug!(?group, error = %e, "dropping optional group: compile failed");
        dropped.push(group);
      }
    }
  }
  debug!(
    count = instructions.len(),
    raw = estimated_size.raw,
    ?included,
    ?dropped,
    "composed instruction set"
  );
  Ok(ComposedInstructionSet {
    instructions,
    swap_primary_index,
    deposit_range,
    included,
    dropped,
    estimated_size,
  })
}
