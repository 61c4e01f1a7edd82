//! Routing service client: quotes and swap instruction sets.

use std::str::FromStr;
use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use async_trait::async_trait;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use yieldswap_core::{
  decode, decode_all, CoreError, InstructionGroups, WireInstruction,
};

use crate::error::ClientsError;
use crate::util::{check_status, http_client};

const SERVICE: &str = "routing service";

/// Parameters of a quote request. Amounts are in input-token base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
  pub input_mint: Pubkey,
  pub output_mint: Pubkey,
  pub amount: u64,
  pub slippage_bps: u16,
  /// Upper bound on accounts the route may touch.
  pub max_accounts: Option<u8>,
}

impl QuoteRequest {
  #[must_use]
  pub fn with_max_accounts(&self, max_accounts: Option<u8>) -> QuoteRequest {
    QuoteRequest {
      max_accounts,
      ..self.clone()
    }
  }

  fn query(&self) -> Vec<(&'static str, String)> {
    let mut query = vec![
      ("inputMint", self.input_mint.to_string()),
      ("outputMint", self.output_mint.to_string()),
      ("amount", self.amount.to_string()),
      ("slippageBps", self.slippage_bps.to_string()),
    ];
    if let Some(max_accounts) = self.max_accounts {
      query.push(("maxAccounts", max_accounts.to_string()));
    }
    query
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapInfo {
  pub amm_key: String,
  #[serde(default)]
  pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlanStep {
  pub swap_info: SwapInfo,
  pub percent: u8,
}

/// A priced route.
///
/// The typed fields are a read-only view. The service expects the quote back
/// verbatim when asked for instructions, so the raw document is kept as the
/// opaque token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
  pub input_mint: String,
  pub in_amount: String,
  pub output_mint: String,
  /// Expected output in output-token base units.
  pub out_amount: String,
  pub other_amount_threshold: String,
  pub slippage_bps: u16,
  #[serde(default)]
  pub price_impact_pct: Option<String>,
  #[serde(default)]
  pub route_plan: Vec<RoutePlanStep>,
  #[serde(skip)]
  raw: Value,
}

impl Quote {
  /// Parses a quote document, keeping the original for round-tripping.
  ///
  /// # Errors
  /// * Required quote fields are missing or mistyped
  pub fn from_value(raw: Value) -> Result<Quote, ClientsError> {
    let quote = Quote::deserialize(&raw)?;
    Ok(Quote { raw, ..quote })
  }

  #[must_use]
  pub fn raw(&self) -> &Value {
    &self.raw
  }

  /// Labels of the venues the route passes through.
  #[must_use]
  pub fn venues(&self) -> Vec<&str> {
    self
      .route_plan
      .iter()
      .filter_map(|step| step.swap_info.label.as_deref())
      .collect()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrioritizationFee {
  Auto,
  Lamports(u64),
}

impl PrioritizationFee {
  fn to_json(self) -> Value {
    match self {
      PrioritizationFee::Auto => json!("auto"),
      PrioritizationFee::Lamports(lamports) => json!(lamports),
    }
  }
}

/// Options forwarded to the routing service that shape the instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionHints {
  pub wrap_and_unwrap_sol: bool,
  pub use_shared_accounts: bool,
  pub dynamic_compute_unit_limit: bool,
  pub prioritization_fee: PrioritizationFee,
}

impl Default for CompositionHints {
  fn default() -> Self {
    CompositionHints {
      wrap_and_unwrap_sol: false,
      use_shared_accounts: true,
      dynamic_compute_unit_limit: true,
      prioritization_fee: PrioritizationFee::Auto,
    }
  }
}

/// Raw body of a swap-instructions response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapInstructionsResponse {
  pub compute_budget_instructions: Option<Vec<WireInstruction>>,
  pub setup_instructions: Option<Vec<WireInstruction>>,
  pub swap_instruction: Option<WireInstruction>,
  pub cleanup_instruction: Option<WireInstruction>,
  pub other_instructions: Option<Vec<WireInstruction>>,
  pub address_lookup_table_addresses: Option<Vec<String>>,
}

/// Decoded swap instruction set plus the lookup tables it was built against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwapInstructions {
  pub groups: InstructionGroups,
  pub lookup_table_refs: Vec<Pubkey>,
}

fn in_group(group: &str) -> impl Fn(CoreError) -> CoreError + '_ {
  move |e| match e {
    CoreError::MalformedInstruction(reason) => {
      CoreError::MalformedInstruction(format!("{group}: {reason}"))
    }
    other => other,
  }
}

fn decode_group(
  group: &str,
  wires: Option<&Vec<WireInstruction>>,
) -> Result<Vec<Instruction>, CoreError> {
  decode_all(wires.map_or(&[][..], Vec::as_slice)).map_err(in_group(group))
}

impl SwapInstructionsResponse {
  /// Decodes every group eagerly.
  ///
  /// A missing swap instruction is not an error here; composition rejects it.
  ///
  /// # Errors
  /// * Any instruction or lookup table address is malformed
  pub fn decode(&self) -> Result<SwapInstructions, CoreError> {
    let primary = self
      .swap_instruction
      .as_ref()
      .map(decode)
      .transpose()
      .map_err(in_group("swap"))?;
    let cleanup = self
      .cleanup_instruction
      .as_ref()
      .map(decode)
      .transpose()
      .map_err(in_group("cleanup"))?;
    let groups = InstructionGroups {
      compute_budget: decode_group(
        "computeBudget",
        self.compute_budget_instructions.as_ref(),
      )?,
      setup: decode_group("setup", self.setup_instructions.as_ref())?,
      primary,
      cleanup: cleanup.into_iter().collect(),
      other: decode_group("other", self.other_instructions.as_ref())?,
    };
    let lookup_table_refs: Vec<Pubkey> = self
      .address_lookup_table_addresses
      .iter()
      .flatten()
      .map(|address| {
        Pubkey::from_str(address).map_err(|e| {
          CoreError::MalformedInstruction(format!(
            "lookup table address {address:?}: {e}"
          ))
        })
      })
      .try_collect()?;
    Ok(SwapInstructions {
      groups,
      lookup_table_refs,
    })
  }
}

#[async_trait]
pub trait RoutingService: Send + Sync {
  /// # Errors
  /// * Transport failure or non-success status
  /// * Response is not a quote
  async fn quote(&self, request: &QuoteRequest) -> Result<Quote, ClientsError>;

  /// # Errors
  /// * Transport failure or non-success status
  /// * Any returned instruction is malformed
  async fn swap_instructions(
    &self,
    quote: &Quote,
    user: &Pubkey,
    hints: &CompositionHints,
  ) -> Result<SwapInstructions, ClientsError>;
}

/// HTTP client for a Jupiter-compatible swap API.
#[derive(Clone)]
pub struct JupiterRoutingClient {
  http: reqwest::Client,
  base_url: String,
}

impl JupiterRoutingClient {
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
}

#[async_trait]
impl RoutingService for JupiterRoutingClient {
  async fn quote(&self, request: &QuoteRequest) -> Result<Quote, ClientsError> {
    let response = self
      .http
      .get(format!("{}/quote", self.base_url))
      .query(&request.query())
      .send()
      .await?;
    let body: Value = check_status(SERVICE, response).await?.json().await?;
    let quote = Quote::from_value(body)?;
    debug!(
      in_amount = %quote.in_amount,
      out_amount = %quote.out_amount,
      max_accounts = ?request.max_accounts,
      "quote received"
    );
    Ok(quote)
  }

  async fn swap_instructions(
    &self,
    quote: &Quote,
    user: &Pubkey,
    hints: &CompositionHints,
  ) -> Result<SwapInstructions, ClientsError> {
    let body = json!({
      "quoteResponse": quote.raw(),
      "userPublicKey": user.to_string(),
      "wrapAndUnwrapSol": hints.wrap_and_unwrap_sol,
      "useSharedAccounts": hints.use_shared_accounts,
      "dynamicComputeUnitLimit": hints.dynamic_compute_unit_limit,
      "prioritizationFeeLamports": hints.prioritization_fee.to_json(),
    });
    let response = self
      .http
      .post(format!("{}/swap-instructions", self.base_url))
      .json(&body)
      .send()
      .await?;
    let response: SwapInstructionsResponse =
      check_status(SERVICE, response).await?.json().await?;
    Ok(response.decode()?)
  }
}
