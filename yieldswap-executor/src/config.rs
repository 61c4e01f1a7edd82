//! Executor configuration, loaded from TOML.
//!
//! Every section and field has a default, so an empty document is a valid
//! configuration. Durations are milliseconds.

use std::path::Path;
use std::time::Duration;

use anchor_client::solana_sdk::commitment_config::CommitmentConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use yieldswap_clients::routing::CompositionHints;
use yieldswap_clients::util::{JUPITER_LEND_API, JUPITER_SWAP_API};

use crate::size_budget::SizeBudget;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Failed to read config: {0}")]
  Io(#[from] std::io::Error),
  #[error("Failed to parse config: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("Invalid config: {0}")]
  Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Commitment {
  Processed,
  #[default]
  Confirmed,
  Finalized,
}

impl From<Commitment> for CommitmentConfig {
  fn from(commitment: Commitment) -> Self {
    match commitment {
      Commitment::Processed => CommitmentConfig::processed(),
      Commitment::Confirmed => CommitmentConfig::confirmed(),
      Commitment::Finalized => CommitmentConfig::finalized(),
    }
  }
}

/// What to do when the dry run reports a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationPolicy {
  /// Log and continue to signing.
  #[default]
  Advisory,
  /// Abort before a signature is requested.
  Enforce,
}

/// What to do when confirmation polling runs out of time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimeoutPolicy {
  #[default]
  GiveUp,
  /// Keep polling the broadcast signature for a further grace period.
  Repoll { grace_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcSettings {
  pub url: String,
  pub commitment: Commitment,
}

impl Default for RpcSettings {
  fn default() -> Self {
    RpcSettings {
      url: "https://api.mainnet-beta.solana.com".to_owned(),
      commitment: Commitment::Confirmed,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
  pub routing_url: String,
  pub lend_url: String,
  pub http_timeout_ms: u64,
}

impl Default for ServiceSettings {
  fn default() -> Self {
    ServiceSettings {
      routing_url: JUPITER_SWAP_API.to_owned(),
      lend_url: JUPITER_LEND_API.to_owned(),
      http_timeout_ms: 10_000,
    }
  }
}

impl ServiceSettings {
  #[must_use]
  pub fn http_timeout(&self) -> Duration {
    Duration::from_millis(self.http_timeout_ms)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapSettings {
  pub slippage_bps: u16,
  pub hints: CompositionHints,
  /// `maxAccounts` bounds tried in order after an unbounded first quote
  /// produced an oversize transaction.
  pub max_accounts_ladder: Vec<u8>,
}

impl Default for SwapSettings {
  fn default() -> Self {
    SwapSettings {
      slippage_bps: 50,
      hints: CompositionHints::default(),
      max_accounts_ladder: vec![40, 30, 20],
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionSettings {
  /// End-to-end attempts, counting the first.
  pub max_attempts: u32,
  /// Broadcast retries on transport faults within one attempt.
  pub broadcast_retries: usize,
  pub broadcast_backoff_ms: u64,
  pub poll_interval_ms: u64,
  pub confirm_timeout_ms: u64,
  pub simulation_policy: SimulationPolicy,
  pub timeout_policy: TimeoutPolicy,
}

impl Default for SubmissionSettings {
  fn default() -> Self {
    SubmissionSettings {
      max_attempts: 3,
      broadcast_retries: 3,
      broadcast_backoff_ms: 200,
      poll_interval_ms: 500,
      confirm_timeout_ms: 60_000,
      simulation_policy: SimulationPolicy::Advisory,
      timeout_policy: TimeoutPolicy::GiveUp,
    }
  }
}

impl SubmissionSettings {
  #[must_use]
  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }

  #[must_use]
  pub fn confirm_timeout(&self) -> Duration {
    Duration::from_millis(self.confirm_timeout_ms)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
  pub rpc: RpcSettings,
  pub services: ServiceSettings,
  pub swap: SwapSettings,
  pub size_budget: SizeBudget,
  pub submission: SubmissionSettings,
}

impl ExecutorConfig {
  /// # Errors
  /// * Invalid TOML, or values that fail [`ExecutorConfig::validate`]
  pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
    let config: ExecutorConfig = toml::from_str(s)?;
    config.validate()?;
    Ok(config)
  }

  /// # Errors
  /// * File unreadable, or same as [`ExecutorConfig::from_toml_str`]
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    Self::from_toml_str(&std::fs::read_to_string(path)?)
  }

  /// # Errors
  /// * Zero attempts, zero poll interval, or a zero size limit
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.submission.max_attempts == 0 {
      return Err(ConfigError::Invalid("max_attempts must be >= 1".into()));
    }
    if self.submission.poll_interval_ms == 0 {
      return Err(ConfigError::Invalid("poll_interval_ms must be > 0".into()));
    }
    if self.size_budget.max_raw_bytes == 0
      || self.size_budget.max_encoded_bytes == 0
    {
      return Err(ConfigError::Invalid("size limits must be > 0".into()));
    }
    Ok(())
  }

  #[must_use]
  pub fn commitment(&self) -> CommitmentConfig {
    self.rpc.commitment.into()
  }
}

#[cfg(test)]
mod tests {
  use yieldswap_clients::routing::PrioritizationFee;

  use super::*;

  #[test]
  fn empty_document_is_default() -> anyhow::Result<()> {
    assert_eq!(ExecutorConfig::from_toml_str("")?, ExecutorConfig::default());
    Ok(())
  }

  #[test]
  fn defaults_match_documented_limits() {
    let config = ExecutorConfig::default();
    assert_eq!(config.size_budget.max_raw_bytes, 1232);
    assert_eq!(config.size_budget.max_encoded_bytes, 1644);
    assert_eq!(config.submission.max_attempts, 3);
    assert_eq!(config.swap.max_accounts_ladder, vec![40, 30, 20]);
    assert_eq!(config.submission.simulation_policy, SimulationPolicy::Advisory);
    assert_eq!(config.submission.timeout_policy, TimeoutPolicy::GiveUp);
  }

  #[test]
  fn parses_partial_document() -> anyhow::Result<()> {
    let config = ExecutorConfig::from_toml_str(
      r#"
        [rpc]
        url = "http://localhost:8899"
        commitment = "finalized"

        [swap]
        slippage_bps = 100
        max_accounts_ladder = [32]

        [swap.hints]
        prioritization_fee = { lamports = 5000 }

        [submission]
        simulation_policy = "enforce"
        timeout_policy = { mode = "repoll", grace_ms = 15000 }
      "#,
    )?;
    assert_eq!(config.rpc.url, "http://localhost:8899");
    assert_eq!(config.commitment(), CommitmentConfig::finalized());
    assert_eq!(config.swap.slippage_bps, 100);
    assert_eq!(config.swap.max_accounts_ladder, vec![32]);
    assert!(config.swap.hints.use_shared_accounts);
    assert_eq!(
      config.swap.hints.prioritization_fee,
      PrioritizationFee::Lamports(5000)
    );
    assert_eq!(config.submission.simulation_policy, SimulationPolicy::Enforce);
    assert_eq!(
      config.submission.timeout_policy,
      TimeoutPolicy::Repoll { grace_ms: 15_000 }
    );
    assert_eq!(config.submission.max_attempts, 3);
    Ok(())
  }

  #[test]
  fn sample_config_matches_defaults() -> anyhow::Result<()> {
    let sample = include_str!("../../yieldswap.example.toml");
    let parsed = ExecutorConfig::from_toml_str(sample)?;
    assert_eq!(parsed, ExecutorConfig::default());
    Ok(())
  }

  #[test]
  fn rejects_zero_attempts() {
    let result =
      ExecutorConfig::from_toml_str("[submission]\nmax_attempts = 0\n");
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
  }
}
