use thiserror::Error;

/// Failures raised while validating data handed over by external services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
  #[error("Malformed instruction: {0}")]
  MalformedInstruction(String),
  #[error("Invalid amount encoding: {0:?}")]
  InvalidAmountEncoding(String),
  /// An upstream service returned an instruction set without its primary
  /// instruction.
  #[error("Composer invariant violated: {0}")]
  ComposerInvariantViolated(String),
}

impl CoreError {
  pub(crate) fn malformed(reason: impl Into<String>) -> CoreError {
    CoreError::MalformedInstruction(reason.into())
  }
}
