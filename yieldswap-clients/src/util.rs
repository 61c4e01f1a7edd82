use std::time::Duration;

use solana_rpc_client_api::config::{
  RpcSendTransactionConfig, RpcSimulateTransactionConfig,
};
use anchor_client::solana_sdk::account::Account;
use anchor_client::solana_sdk::address_lookup_table::state::AddressLookupTable;
use anchor_client::solana_sdk::address_lookup_table::AddressLookupTableAccount;
use anchor_client::solana_sdk::commitment_config::CommitmentConfig;
use anchor_lang::prelude::Pubkey;
use reqwest::Response;

use crate::error::ClientsError;

pub const JUPITER_SWAP_API: &str = "https://quote-api.jup.ag/v6";

pub const JUPITER_LEND_API: &str = "https://lite-api.jup.ag/lend/v1";

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for dry runs of unsigned transactions.
#[must_use]
pub fn simulation_config(
  commitment: CommitmentConfig,
) -> RpcSimulateTransactionConfig {
  RpcSimulateTransactionConfig {
    sig_verify: false,
    replace_recent_blockhash: true,
    commitment: Some(commitment),
    ..Default::default()
  }
}

/// Broadcast configuration; preflight stays on.
#[must_use]
pub fn send_config(commitment: CommitmentConfig) -> RpcSendTransactionConfig {
  RpcSendTransactionConfig {
    skip_preflight: false,
    preflight_commitment: Some(commitment.commitment),
    max_retries: Some(0),
    ..Default::default()
  }
}

/// Deserializes an account into an address lookup table.
///
/// # Errors
/// - Account data cannot be deserialized
pub fn deserialize_lookup_table(
  key: &Pubkey,
  account: &Account,
) -> Result<AddressLookupTableAccount, ClientsError> {
  let table = AddressLookupTable::deserialize(&account.data).map_err(|e| {
    ClientsError::ResolutionUnavailable(format!("{key} is not a table: {e}"))
  })?;
  Ok(AddressLookupTableAccount {
    key: *key,
    addresses: table.addresses.to_vec(),
  })
}

/// Builds the shared HTTP client for service calls.
///
/// # Errors
/// - TLS backend initialisation
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, ClientsError> {
  Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Turns a non-success HTTP status into [`ClientsError::Service`].
pub(crate) async fn check_status(
  service: &'static str,
  response: Response,
) -> Result<Response, ClientsError> {
  let status = response.status();
  if status.is_success() {
    Ok(response)
  } else {
    let body = response.text().await.unwrap_or_default();
    Err(ClientsError::Service {
      service,
      status: status.as_u16(),
      body,
    })
  }
}
