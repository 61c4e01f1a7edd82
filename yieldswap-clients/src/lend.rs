//! Lending service client.

use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use yieldswap_core::{decode_all, require_positive, WireInstruction};

use crate::error::ClientsError;
use crate::util::{check_status, http_client};

const SERVICE: &str = "lending service";

#[derive(Debug, Clone, Default, Deserialize)]
struct InstructionsResponse {
  #[serde(default)]
  instructions: Option<Vec<WireInstruction>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnAsset {
  pub address: String,
  pub symbol: String,
  pub decimals: u8,
  #[serde(default)]
  pub price: Option<String>,
}

/// A lending position token and the asset it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnToken {
  pub address: String,
  pub symbol: String,
  pub decimals: u8,
  pub asset_address: String,
  pub asset: EarnAsset,
  #[serde(default)]
  pub total_rate: Option<String>,
}

#[async_trait]
pub trait DepositService: Send + Sync {
  /// Instructions depositing `amount` base units of `asset` from `signer`.
  ///
  /// # Errors
  /// * `amount` is not a positive base-unit integer string
  /// * Transport failure or non-success status
  /// * Any returned instruction is malformed
  async fn deposit_instructions(
    &self,
    asset: &Pubkey,
    signer: &Pubkey,
    amount: &str,
  ) -> Result<Vec<Instruction>, ClientsError>;
}

/// HTTP client for a Jupiter-compatible lend API.
#[derive(Clone)]
pub struct JupiterLendClient {
  http: reqwest::Client,
  base_url: String,
}

impl JupiterLendClient {
  /// # Errors
  /// * HTTP client construction fails
  pub fn new(
    base_url: impl Into<String>,
    timeout: Duration,
  ) -> Result<Self, ClientsError> {
    Ok(Self {
      http: http_client(timeout)?,
      base_url: base_url.into().trim_end_matches('/').to_owned(),
    })
  }

  async fn post_instructions(
    &self,
    endpoint: &str,
    asset: &Pubkey,
    signer: &Pubkey,
    amount: &str,
  ) -> Result<Vec<Instruction>, ClientsError> {
    require_positive(amount)?;
    let response = self
      .http
      .post(format!("{}/earn/{endpoint}", self.base_url))
      .json(&json!({
        "asset": asset.to_string(),
        "signer": signer.to_string(),
        "amount": amount,
      }))
      .send()
      .await?;
    let body: InstructionsResponse =
      check_status(SERVICE, response).await?.json().await?;
    let instructions = decode_all(body.instructions.as_deref().unwrap_or(&[]))?;
    debug!(
      %asset,
      amount,
      count = instructions.len(),
      endpoint,
      "lend instructions"
    );
    Ok(instructions)
  }

  /// Instructions withdrawing `amount` base units of `asset` to `signer`.
  ///
  /// # Errors
  /// * Same as [`DepositService::deposit_instructions`]
  pub async fn withdraw_instructions(
    &self,
    asset: &Pubkey,
    signer: &Pubkey,
    amount: &str,
  ) -> Result<Vec<Instruction>, ClientsError> {
    self
      .post_instructions("withdraw-instructions", asset, signer, amount)
      .await
  }

  /// Lists the lending positions on offer.
  ///
  /// # Errors
  /// * Transport failure, non-success status or unexpected body
  pub async fn earn_tokens(&self) -> Result<Vec<EarnToken>, ClientsError> {
    let response = self
      .http
      .get(format!("{}/earn/tokens", self.base_url))
      .send()
      .await?;
    Ok(check_status(SERVICE, response).await?.json().await?)
  }
}

#[async_trait]
impl DepositService for JupiterLendClient {
  async fn deposit_instructions(
    &self,
    asset: &Pubkey,
    signer: &Pubkey,
    amount: &str,
  ) -> Result<Vec<Instruction>, ClientsError> {
    self
      .post_instructions("deposit-instructions", asset, signer, amount)
      .await
  }
}
