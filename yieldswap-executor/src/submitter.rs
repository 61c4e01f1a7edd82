//! Signing, broadcast and confirmation.
//!
//! Each end-to-end attempt walks `Composed -> Simulated -> AwaitingSignature
//! -> Broadcast -> Confirming` and ends in `Confirmed` or `Failed`. Only an
//! expired blockhash starts another attempt, from a fresh blockhash.
//!
//! Dropping the future before `Broadcast` leaves nothing behind. Once a
//! transaction is broadcast, the attempt polls until a terminal state.

use std::sync::Arc;

use solana_rpc_client_api::client_error::{
  Error as ClientError, ErrorKind as ClientErrorKind,
};
use anchor_client::solana_sdk::address_lookup_table::AddressLookupTableAccount;
use anchor_client::solana_sdk::signature::Signature;
use anchor_client::solana_sdk::transaction::{
  TransactionError, VersionedTransaction,
};
use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use tokio::time::{sleep, Duration, Instant};
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use tracing::{info, warn};
use yieldswap_clients::rpc::{LedgerRpc, SignatureStatus};
use yieldswap_clients::wallet::WalletSigner;

use crate::config::{SubmissionSettings, TimeoutPolicy};
use crate::error::ExecutionError;
use crate::simulator::simulate;
use crate::size_budget::SizeBudget;
use crate::transaction_builder::CandidateTransaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
  Composed,
  Simulated,
  AwaitingSignature,
  Broadcast,
  Confirming,
  Confirmed,
  Failed,
}

/// Record of one end-to-end attempt. Never mutated once pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
  /// One-based attempt number.
  pub attempt: u32,
  /// Stage the attempt ended in.
  pub stage: Stage,
  pub signature: Option<Signature>,
  pub confirmed: bool,
  pub error: Option<ExecutionError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
  Confirmed,
  Failed,
  /// The wallet holder declined to sign.
  Rejected,
  /// Broadcast, but neither confirmation nor failure was observed.
  Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
  pub status: OutcomeStatus,
  pub outcomes: Vec<TransactionOutcome>,
}

impl SubmissionReport {
  /// Signature of the last broadcast attempt.
  #[must_use]
  pub fn signature(&self) -> Option<Signature> {
    self.outcomes.iter().rev().find_map(|o| o.signature)
  }

  #[must_use]
  pub fn last_error(&self) -> Option<&ExecutionError> {
    self.outcomes.last().and_then(|o| o.error.as_ref())
  }
}

struct AttemptFailure {
  stage: Stage,
  signature: Option<Signature>,
  error: ExecutionError,
}

impl AttemptFailure {
  fn at(stage: Stage) -> impl FnOnce(ExecutionError) -> AttemptFailure {
    move |error| AttemptFailure {
      stage,
      signature: None,
      error,
    }
  }
}

struct SendFailure {
  error: ExecutionError,
  transient: bool,
}

fn classify_send_error(e: &ClientError) -> SendFailure {
  if e.get_transaction_error() == Some(TransactionError::BlockhashNotFound) {
    return SendFailure {
      error: ExecutionError::BlockhashExpired,
      transient: false,
    };
  }
  let transient =
    matches!(e.kind(), ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_));
  SendFailure {
    error: ExecutionError::Broadcast(format!("{e:?}")),
    transient,
  }
}

/// Drives a composed instruction list to a terminal state.
#[derive(Clone)]
pub struct Submitter {
  rpc: Arc<dyn LedgerRpc>,
  signer: Arc<dyn WalletSigner>,
  settings: SubmissionSettings,
  budget: SizeBudget,
}

impl Submitter {
  #[must_use]
  pub fn new(
    rpc: Arc<dyn LedgerRpc>,
    signer: Arc<dyn WalletSigner>,
    settings: SubmissionSettings,
    budget: SizeBudget,
  ) -> Self {
    Self {
      rpc,
      signer,
      settings,
      budget,
    }
  }

  #[must_use]
  pub fn fee_payer(&self) -> Pubkey {
    self.signer.pubkey()
  }

  /// Runs up to `max_attempts` end-to-end attempts.
  pub async fn submit(
    &self,
    instructions: &[Instruction],
    lookup_tables: &[AddressLookupTableAccount],
  ) -> SubmissionReport {
    let mut outcomes = vec![];
    let max_attempts = self.settings.max_attempts.max(1);
    for attempt in 1..=max_attempts {
      match self.attempt(attempt, instructions, lookup_tables).await {
        Ok(signature) => {
          info!(attempt, %signature, "confirmed");
          outcomes.push(TransactionOutcome {
            attempt,
            stage: Stage::Confirmed,
            signature: Some(signature),
            confirmed: true,
            error: None,
          });
          return SubmissionReport {
            status: OutcomeStatus::Confirmed,
            outcomes,
          };
        }
        Err(AttemptFailure {
          stage,
          signature,
          error,
        }) => {
          let retry = error.is_retryable() && attempt < max_attempts;
          warn!(
            attempt,
            ?stage,
            category = error.category(),
            %error,
            retry,
            "attempt ended"
          );
          let status = match &error {
            ExecutionError::UserRejected => OutcomeStatus::Rejected,
            ExecutionError::Timeout => OutcomeStatus::Unknown,
            _ => OutcomeStatus::Failed,
          };
          outcomes.push(TransactionOutcome {
            attempt,
            stage,
            signature,
            confirmed: false,
            error: Some(error),
          });
          if !retry {
            return SubmissionReport { status, outcomes };
          }
        }
      }
    }
    SubmissionReport {
      status: OutcomeStatus::Failed,
      outcomes,
    }
  }

  async fn attempt(
    &self,
    attempt: u32,
    instructions: &[Instruction],
    lookup_tables: &[AddressLookupTableAccount],
  ) -> Result<Signature, AttemptFailure> {
    info!(attempt, stage = ?Stage::Composed, "building transaction");
    let candidate = CandidateTransaction::prepare(
      self.rpc.as_ref(),
      self.fee_payer(),
      instructions.to_vec(),
      lookup_tables.to_vec(),
    )
    .await
    .map_err(AttemptFailure::at(Stage::Composed))?;
    let unsigned = candidate
      .unsigned_transaction()
      .map_err(AttemptFailure::at(Stage::Composed))?;
    self
      .budget
      .validate(&unsigned)
      .map_err(AttemptFailure::at(Stage::Composed))?;
    simulate(
      self.rpc.as_ref(),
      &unsigned,
      self.settings.simulation_policy,
    )
    .await
    .map_err(AttemptFailure::at(Stage::Composed))?;
    info!(attempt, stage = ?Stage::Simulated, "simulated");

    info!(attempt, stage = ?Stage::AwaitingSignature, "requesting signature");
    let signed = self
      .signer
      .sign_transaction(unsigned)
      .await
      .map_err(|e| AttemptFailure::at(Stage::AwaitingSignature)(e.into()))?;

    info!(attempt, stage = ?Stage::Broadcast, "broadcasting");
    let signature = self
      .broadcast(&signed)
      .await
      .map_err(AttemptFailure::at(Stage::Broadcast))?;

    info!(attempt, stage = ?Stage::Confirming, %signature, "confirming");
    self
      .confirm(&signature, candidate.last_valid_block_height)
      .await
      .map_err(|error| AttemptFailure {
        stage: match error {
          ExecutionError::ExecutionFailed(_) => Stage::Failed,
          _ => Stage::Confirming,
        },
        signature: Some(signature),
        error,
      })?;
    Ok(signature)
  }

  async fn broadcast(
    &self,
    transaction: &VersionedTransaction,
  ) -> Result<Signature, ExecutionError> {
    // base 2 with factor backoff/2 doubles from `broadcast_backoff_ms`
    let strategy = ExponentialBackoff::from_millis(2)
      .factor((self.settings.broadcast_backoff_ms / 2).max(1))
      .max_delay(Duration::from_secs(5))
      .take(self.settings.broadcast_retries);
    let rpc = &self.rpc;
    RetryIf::start(
      strategy,
      move || async move {
        rpc.send_transaction(transaction).await.map_err(|e| {
          let failure = classify_send_error(&e);
          if failure.transient {
            warn!(error = %failure.error, "transient broadcast failure");
          }
          failure
        })
      },
      |failure: &SendFailure| failure.transient,
    )
    .await
    .map_err(|failure| failure.error)
  }

  async fn confirm(
    &self,
    signature: &Signature,
    last_valid_block_height: u64,
  ) -> Result<(), ExecutionError> {
    let deadline = Instant::now() + self.settings.confirm_timeout();
    match self.poll(signature, last_valid_block_height, deadline).await {
      Err(ExecutionError::Timeout) => match self.settings.timeout_policy {
        TimeoutPolicy::GiveUp => Err(ExecutionError::Timeout),
        TimeoutPolicy::Repoll { grace_ms } => {
          info!(%signature, grace_ms, "confirmation timed out, repolling");
          let deadline = Instant::now() + Duration::from_millis(grace_ms);
          self.poll(signature, last_valid_block_height, deadline).await
        }
      },
      other => other,
    }
  }

  async fn poll(
    &self,
    signature: &Signature,
    last_valid_block_height: u64,
    deadline: Instant,
  ) -> Result<(), ExecutionError> {
    loop {
      match self.rpc.get_signature_status(signature).await {
        Ok(SignatureStatus::Confirmed) => return Ok(()),
        Ok(SignatureStatus::Failed(detail)) => {
          return Err(ExecutionError::ExecutionFailed(detail))
        }
        Ok(SignatureStatus::Pending) => {
          match self.rpc.get_block_height().await {
            Ok(height) if height > last_valid_block_height => {
              return self.final_status(signature).await;
            }
            Ok(_) => {}
            Err(e) => warn!(error = ?e, "block height poll failed"),
          }
        }
        Err(e) => warn!(error = ?e, "signature status poll failed"),
      }
      if Instant::now() >= deadline {
        return Err(ExecutionError::Timeout);
      }
      sleep(self.settings.poll_interval()).await;
    }
  }

  /// Status check after the blockhash has expired. The transaction may have
  /// landed between the last status poll and the block height read.
  async fn final_status(
    &self,
    signature: &Signature,
  ) -> Result<(), ExecutionError> {
    match self.rpc.get_signature_status(signature).await {
      Ok(SignatureStatus::Confirmed) => Ok(()),
      Ok(SignatureStatus::Failed(detail)) => {
        Err(ExecutionError::ExecutionFailed(detail))
      }
      Ok(SignatureStatus::Pending) => Err(ExecutionError::BlockhashExpired),
      Err(e) => {
        warn!(error = ?e, "final signature status check failed");
        Err(ExecutionError::BlockhashExpired)
      }
    }
  }
}
