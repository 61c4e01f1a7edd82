use anchor_client::solana_sdk::transaction::VersionedTransaction;
use tracing::{debug, warn};
use yieldswap_clients::rpc::{LedgerRpc, SimulationReport};

use crate::config::SimulationPolicy;
use crate::error::ExecutionError;

/// Dry-runs an unsigned transaction and applies the simulation policy.
///
/// Returns the report when the run succeeded, or when it failed under
/// [`SimulationPolicy::Advisory`].
///
/// # Errors
/// * [`ExecutionError::SimulationFailed`] under [`SimulationPolicy::Enforce`]
///   when the ledger reports an error or the call itself fails
pub async fn simulate(
  rpc: &dyn LedgerRpc,
  transaction: &VersionedTransaction,
  policy: SimulationPolicy,
) -> Result<Option<SimulationReport>, ExecutionError> {
  let failure = match rpc.simulate_transaction(transaction).await {
    Ok(report) => match &report.err {
      None => {
        debug!(units = ?report.units_consumed, "simulation ok");
        return Ok(Some(report));
      }
      Some(err) => ExecutionError::SimulationFailed(format!(
        "{err}; logs: {}",
        report.logs.join(" | ")
      )),
    },
    Err(e) => ExecutionError::SimulationFailed(format!("{e:?}")),
  };
  match policy {
    SimulationPolicy::Enforce => Err(failure),
    SimulationPolicy::Advisory => {
      warn!(error = %failure, "simulation failed, continuing to signing");
      Ok(None)
    }
  }
}
