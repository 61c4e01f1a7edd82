use thiserror::Error;
use yieldswap_clients::error::ClientsError;
use yieldswap_clients::wallet::SigningError;
use yieldswap_core::CoreError;

/// Failures of one pass through compose, build, simulate, sign, submit and
/// confirm.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
  #[error("Composer invariant violated: {0}")]
  ComposerInvariantViolated(String),
  #[error(
    "Transaction too large: {raw} bytes raw (max {max_raw}), \
     {encoded} bytes encoded (max {max_encoded})"
  )]
  TransactionTooLarge {
    raw: usize,
    encoded: usize,
    max_raw: usize,
    max_encoded: usize,
  },
  #[error("Message compilation failed: {0}")]
  CompilationFailed(String),
  #[error("Simulation failed: {0}")]
  SimulationFailed(String),
  #[error("User rejected the signature request")]
  UserRejected,
  #[error("Signer unavailable: {0}")]
  SigningUnavailable(String),
  #[error("Blockhash expired before confirmation")]
  BlockhashExpired,
  #[error("Transaction landed but failed: {0}")]
  ExecutionFailed(String),
  #[error("Confirmation not observed in time")]
  Timeout,
  #[error("Broadcast failed: {0}")]
  Broadcast(String),
  #[error("Ledger RPC failed: {0}")]
  Ledger(String),
}

impl ExecutionError {
  /// Whether a fresh end-to-end attempt may succeed.
  #[must_use]
  pub fn is_retryable(&self) -> bool {
    matches!(self, ExecutionError::BlockhashExpired)
  }

  /// Stable short label for logs.
  #[must_use]
  pub fn category(&self) -> &'static str {
    match self {
      ExecutionError::ComposerInvariantViolated(_) => "composer",
      ExecutionError::TransactionTooLarge { .. } => "too_large",
      ExecutionError::CompilationFailed(_) => "compilation",
      ExecutionError::SimulationFailed(_) => "simulation",
      ExecutionError::UserRejected => "user_rejected",
      ExecutionError::SigningUnavailable(_) => "signing_unavailable",
      ExecutionError::BlockhashExpired => "blockhash_expired",
      ExecutionError::ExecutionFailed(_) => "execution_failed",
      ExecutionError::Timeout => "timeout",
      ExecutionError::Broadcast(_) => "broadcast",
      ExecutionError::Ledger(_) => "ledger",
    }
  }
}

impl From<CoreError> for ExecutionError {
  fn from(e: CoreError) -> Self {
    match e {
      CoreError::ComposerInvariantViolated(reason) => {
        ExecutionError::ComposerInvariantViolated(reason)
      }
      other => ExecutionError::ComposerInvariantViolated(other.to_string()),
    }
  }
}

impl From<SigningError> for ExecutionError {
  fn from(e: SigningError) -> Self {
    match e {
      SigningError::Rejected => ExecutionError::UserRejected,
      SigningError::Unavailable(reason) => {
        ExecutionError::SigningUnavailable(reason)
      }
    }
  }
}

/// Failures of the swap-and-deposit orchestration.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Another swap-and-deposit is already in flight")]
  Busy,
  #[error(transparent)]
  Clients(#[from] ClientsError),
  #[error(transparent)]
  Core(#[from] CoreError),
  #[error(transparent)]
  Execution(#[from] ExecutionError),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_blockhash_expiry_is_retryable() {
    assert!(ExecutionError::BlockhashExpired.is_retryable());
    assert!(!ExecutionError::UserRejected.is_retryable());
    assert!(!ExecutionError::Timeout.is_retryable());
    assert!(!ExecutionError::ExecutionFailed("x".into()).is_retryable());
  }

  #[test]
  fn too_large_reports_both_measures() {
    let e = ExecutionError::TransactionTooLarge {
      raw: 1233,
      encoded: 1644,
      max_raw: 1232,
      max_encoded: 1644,
    };
    let message = e.to_string();
    assert!(message.contains("1233 bytes raw (max 1232)"));
    assert_eq!(e.category(), "too_large");
  }
}
