//! Address lookup table resolution.

use std::sync::Arc;

use anchor_client::solana_sdk::address_lookup_table::AddressLookupTableAccount;
use anchor_lang::prelude::Pubkey;
use itertools::Itertools;
use tracing::{debug, warn};

use crate::error::ClientsError;
use crate::rpc::LedgerRpc;
use crate::util::deserialize_lookup_table;

/// Resolves lookup table references into their address lists with a single
/// batched account fetch.
#[derive(Clone)]
pub struct LookupTableResolver {
  rpc: Arc<dyn LedgerRpc>,
}

impl LookupTableResolver {
  #[must_use]
  pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
    Self { rpc }
  }

  /// Loads the referenced tables.
  ///
  /// Tables whose account is absent or does not deserialize are left out and
  /// logged; the caller compiles against whatever resolved.
  ///
  /// # Errors
  /// * The batched account fetch failed as a whole
  pub async fn resolve(
    &self,
    refs: &[Pubkey],
  ) -> Result<Vec<AddressLookupTableAccount>, ClientsError> {
    let keys = refs.iter().copied().unique().collect_vec();
    if keys.is_empty() {
      return Ok(vec![]);
    }
    let accounts = self
      .rpc
      .get_multiple_accounts(&keys)
      .await
      .map_err(|e| ClientsError::ResolutionUnavailable(format!("{e:?}")))?;
    let tables = keys
      .iter()
      .zip(accounts)
      .filter_map(|(key, account)| match account {
        Some(account) => deserialize_lookup_table(key, &account)
          .inspect_err(|e| warn!(table = %key, error = %e, "skipping table"))
          .ok(),
        None => {
          warn!(table = %key, "lookup table account not found");
          None
        }
      })
      .collect_vec();
    debug!(requested = keys.len(), resolved = tables.len(), "lookup tables");
    Ok(tables)
  }
}
