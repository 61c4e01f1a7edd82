//! Ledger RPC abstraction (enables testing)

use std::sync::Arc;

use solana_rpc_client_api::client_error::Result;
use solana_rpc_client::nonblocking::rpc_client::RpcClient;
use anchor_client::solana_sdk::account::Account;
use anchor_client::solana_sdk::commitment_config::CommitmentConfig;
use anchor_client::solana_sdk::hash::Hash;
use anchor_client::solana_sdk::signature::Signature;
use anchor_client::solana_sdk::transaction::VersionedTransaction;
use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;

use crate::util::{send_config, simulation_config};

/// Result of a dry run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
  /// Ledger-reported execution error, if any.
  pub err: Option<String>,
  pub logs: Vec<String>,
  pub units_consumed: Option<u64>,
}

/// Landing status of a broadcast signature at the provider's commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
  /// Unknown to the cluster, or not yet at the required commitment.
  Pending,
  Confirmed,
  /// Landed, but execution failed.
  Failed(String),
}

/// Ledger operations needed to resolve, simulate, submit and confirm
/// transactions.
#[async_trait]
#[allow(clippy::result_large_err)]
pub trait LedgerRpc: Send + Sync {
  /// Latest blockhash and the last block height at which it is valid.
  ///
  /// # Errors
  /// Returns error if RPC call fails.
  async fn get_latest_blockhash(&self) -> Result<(Hash, u64)>;

  /// # Errors
  /// Returns error if RPC call fails.
  async fn get_multiple_accounts(
    &self,
    keys: &[Pubkey],
  ) -> Result<Vec<Option<Account>>>;

  /// # Errors
  /// Returns error if RPC simulation call fails. A ledger-reported execution
  /// error is not an `Err`; it is carried in [`SimulationReport::err`].
  async fn simulate_transaction(
    &self,
    transaction: &VersionedTransaction,
  ) -> Result<SimulationReport>;

  /// # Errors
  /// Returns error if the node rejects the transaction or the call fails.
  async fn send_transaction(
    &self,
    transaction: &VersionedTransaction,
  ) -> Result<Signature>;

  /// # Errors
  /// Returns error if RPC call fails.
  async fn get_signature_status(
    &self,
    signature: &Signature,
  ) -> Result<SignatureStatus>;

  /// # Errors
  /// Returns error if RPC call fails.
  async fn get_block_height(&self) -> Result<u64>;
}

/// Real ledger provider wrapping Solana's `RpcClient`
pub struct SolanaLedgerRpc {
  client: Arc<RpcClient>,
  commitment: CommitmentConfig,
}

impl SolanaLedgerRpc {
  #[must_use]
  pub fn new(client: Arc<RpcClient>, commitment: CommitmentConfig) -> Self {
    Self { client, commitment }
  }

  #[must_use]
  pub fn from_url(url: String, commitment: CommitmentConfig) -> Self {
    let client = RpcClient::new_with_commitment(url, commitment);
    Self::new(Arc::new(client), commitment)
  }

  #[must_use]
  pub fn commitment(&self) -> CommitmentConfig {
    self.commitment
  }
}

#[async_trait]
impl LedgerRpc for SolanaLedgerRpc {
  async fn get_latest_blockhash(&self) -> Result<(Hash, u64)> {
    self
      .client
      .get_latest_blockhash_with_commitment(self.commitment)
      .await
  }

  async fn get_multiple_accounts(
    &self,
    keys: &[Pubkey],
  ) -> Result<Vec<Option<Account>>> {
    self.client.get_multiple_accounts(keys).await
  }

  async fn simulate_transaction(
    &self,
    transaction: &VersionedTransaction,
  ) -> Result<SimulationReport> {
    let result = self
      .client
      .simulate_transaction_with_config(
        transaction,
        simulation_config(self.commitment),
      )
      .await?
      .value;
    Ok(SimulationReport {
      err: result.err.map(|e| format!("{e:?}")),
      logs: result.logs.unwrap_or_default(),
      units_consumed: result.units_consumed,
    })
  }

  async fn send_transaction(
    &self,
    transaction: &VersionedTransaction,
  ) -> Result<Signature> {
    self
      .client
      .send_transaction_with_config(transaction, send_config(self.commitment))
      .await
  }

  async fn get_signature_status(
    &self,
    signature: &Signature,
  ) -> Result<SignatureStatus> {
    let status = self
      .client
      .get_signature_statuses(&[*signature])
      .await?
      .value
      .into_iter()
      .next()
      .flatten();
    Ok(match status {
      None => SignatureStatus::Pending,
      Some(status) => match &status.err {
        Some(err) => SignatureStatus::Failed(format!("{err:?}")),
        None if status.satisfies_commitment(self.commitment) => {
          SignatureStatus::Confirmed
        }
        None => SignatureStatus::Pending,
      },
    })
  }

  async fn get_block_height(&self) -> Result<u64> {
    self
      .client
      .get_block_height_with_commitment(self.commitment)
      .await
  }
}
