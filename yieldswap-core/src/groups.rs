use anchor_lang::prelude::{pubkey, Pubkey};
use anchor_lang::solana_program::instruction::Instruction;

use crate::error::CoreError;

pub const COMPUTE_BUDGET_PROGRAM_ID: Pubkey =
  pubkey!("ComputeBudget111111111111111111111111111111");

/// Whether the instruction targets the compute budget program.
#[must_use]
pub fn is_compute_budget(instruction: &Instruction) -> bool {
  instruction.program_id == COMPUTE_BUDGET_PROGRAM_ID
}

/// Instructions returned by one instruction-producing service, bucketed by
/// role.
///
/// `primary` is the single instruction carrying the economic effect (the swap
/// or the deposit). It is optional here only because services may omit it;
/// composition refuses a set without one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionGroups {
  pub compute_budget: Vec<Instruction>,
  pub setup: Vec<Instruction>,
  pub primary: Option<Instruction>,
  pub cleanup: Vec<Instruction>,
  pub other: Vec<Instruction>,
}

impl InstructionGroups {
  /// Buckets a flat instruction list, as returned by the lending service.
  ///
  /// Compute budget instructions are split out, the last remaining
  /// instruction becomes the primary and everything before it is setup.
  #[must_use]
  pub fn from_flat(instructions: Vec<Instruction>) -> InstructionGroups {
    let (compute_budget, mut body): (Vec<_>, Vec<_>) =
      instructions.into_iter().partition(is_compute_budget);
    let primary = body.pop();
    InstructionGroups {
      compute_budget,
      setup: body,
      primary,
      cleanup: vec![],
      other: vec![],
    }
  }

  /// Returns the primary instruction.
  ///
  /// # Errors
  /// * No primary instruction; `source` names the service for diagnostics
  pub fn require_primary(
    &self,
    source: &str,
  ) -> Result<&Instruction, CoreError> {
    self.primary.as_ref().ok_or_else(|| {
      CoreError::ComposerInvariantViolated(format!(
        "{source} instruction set has no primary instruction"
      ))
    })
  }

  /// All non compute-budget instructions in execution order.
  pub fn body(&self) -> impl Iterator<Item = &Instruction> {
    self
      .setup
      .iter()
      .chain(self.primary.iter())
      .chain(self.cleanup.iter())
      .chain(self.other.iter())
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.compute_budget.len() + self.body().count()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
