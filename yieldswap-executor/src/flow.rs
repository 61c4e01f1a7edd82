//! Swap-and-deposit orchestration.

use std::sync::Arc;

use anchor_client::solana_sdk::address_lookup_table::AddressLookupTableAccount;
use anchor_client::solana_sdk::signature::Signature;
use anchor_lang::prelude::Pubkey;
use tokio::sync::Mutex;
use tracing::{info, instrument};
use yieldswap_clients::balance::{BalanceRefresh, NoopBalanceRefresh};
use yieldswap_clients::lend::{DepositService, JupiterLendClient};
use yieldswap_clients::lookup_tables::LookupTableResolver;
use yieldswap_clients::routing::{
  JupiterRoutingClient, Quote, QuoteRequest, RoutingService,
};
use yieldswap_clients::rpc::{LedgerRpc, SolanaLedgerRpc};
use yieldswap_clients::wallet::WalletSigner;
use yieldswap_core::to_base_units;

use crate::composer::{compose, ComposedInstructionSet};
use crate::config::{ExecutorConfig, SwapSettings};
use crate::error::FlowError;
use crate::size_budget::SizeBudget;
use crate::submitter::{OutcomeStatus, SubmissionReport, Submitter};

/// Swap `amount` base units of `input_mint` into `output_mint`, then deposit
/// the proceeds into the lending position for `output_mint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapAndDepositRequest {
  pub input_mint: Pubkey,
  pub output_mint: Pubkey,
  pub amount: u64,
  /// Decimal exponent of `output_mint`.
  pub output_decimals: u8,
}

/// External collaborators of the orchestration.
#[derive(Clone)]
pub struct Collaborators {
  pub routing: Arc<dyn RoutingService>,
  pub lend: Arc<dyn DepositService>,
  pub rpc: Arc<dyn LedgerRpc>,
  pub signer: Arc<dyn WalletSigner>,
  pub refresh: Arc<dyn BalanceRefresh>,
}

#[derive(Debug, Clone)]
pub struct FlowReport {
  pub quote: Quote,
  /// Amount sent to the deposit service, verbatim from the quote.
  pub deposit_amount: String,
  /// Route bound that produced a transaction within budget.
  pub max_accounts: Option<u8>,
  pub composed: ComposedInstructionSet,
  pub submission: SubmissionReport,
}

impl FlowReport {
  #[must_use]
  pub fn status(&self) -> OutcomeStatus {
    self.submission.status
  }

  #[must_use]
  pub fn signature(&self) -> Option<Signature> {
    self.submission.signature()
  }
}

struct Prepared {
  quote: Quote,
  deposit_amount: String,
  tables: Vec<AddressLookupTableAccount>,
  composed: ComposedInstructionSet,
}

/// Runs one swap-and-deposit at a time.
pub struct SwapAndDeposit {
  routing: Arc<dyn RoutingService>,
  lend: Arc<dyn DepositService>,
  signer: Arc<dyn WalletSigner>,
  refresh: Arc<dyn BalanceRefresh>,
  resolver: LookupTableResolver,
  submitter: Submitter,
  swap: SwapSettings,
  budget: SizeBudget,
  in_flight: Mutex<()>,
}

impl SwapAndDeposit {
  #[must_use]
  pub fn new(config: &ExecutorConfig, collaborators: Collaborators) -> Self {
    let Collaborators {
      routing,
      lend,
      rpc,
      signer,
      refresh,
    } = collaborators;
    let submitter = Submitter::new(
      rpc.clone(),
      signer.clone(),
      config.submission.clone(),
      config.size_budget,
    );
    Self {
      routing,
      lend,
      signer,
      refresh,
      resolver: LookupTableResolver::new(rpc),
      submitter,
      swap: config.swap.clone(),
      budget: config.size_budget,
      in_flight: Mutex::new(()),
    }
  }

  /// Wires the HTTP services and ledger RPC named in `config`.
  ///
  /// # Errors
  /// * HTTP client construction fails
  pub fn from_config(
    config: &ExecutorConfig,
    signer: Arc<dyn WalletSigner>,
  ) -> Result<Self, FlowError> {
    let timeout = config.services.http_timeout();
    let collaborators = Collaborators {
      routing: Arc::new(JupiterRoutingClient::new(
        config.services.routing_url.clone(),
        timeout,
      )?),
      lend: Arc::new(JupiterLendClient::new(
        config.services.lend_url.clone(),
        timeout,
      )?),
      rpc: Arc::new(SolanaLedgerRpc::from_url(
        config.rpc.url.clone(),
        config.commitment(),
      )),
      signer,
      refresh: Arc::new(NoopBalanceRefresh),
    };
    Ok(Self::new(config, collaborators))
  }

  #[must_use]
  pub fn with_refresh(self, refresh: Arc<dyn BalanceRefresh>) -> Self {
    Self { refresh, ..self }
  }

  /// Quotes, composes, signs and submits one atomic swap-and-deposit.
  ///
  /// When the composed transaction is too large, re-quotes with each bound
  /// of the `max_accounts` ladder in turn. A confirmed outcome notifies the
  /// balance refresh sink on a spawned task; the call does not wait for it.
  ///
  /// # Errors
  /// * [`FlowError::Busy`] while another call on this executor is running
  /// * Service, decoding, resolution or composition failures
  /// * [`crate::ExecutionError::TransactionTooLarge`] once the ladder is
  ///   exhausted
  ///
  /// Failures after composition are reported in [`FlowReport::submission`].
  #[instrument(
    skip(self),
    fields(
      input = %request.input_mint,
      output = %request.output_mint,
      amount = request.amount
    )
  )]
  pub async fn execute(
    &self,
    request: &SwapAndDepositRequest,
  ) -> Result<FlowReport, FlowError> {
    let _guard = self.in_flight.try_lock().map_err(|_| FlowError::Busy)?;
    let user = self.signer.pubkey();
    let base = QuoteRequest {
      input_mint: request.input_mint,
      output_mint: request.output_mint,
      amount: request.amount,
      slippage_bps: self.swap.slippage_bps,
      max_accounts: None,
    };
    let mut ladder = self.swap.max_accounts_ladder.iter().copied();
    let mut max_accounts = None;
    let prepared = loop {
      let prepared = self
        .prepare(&base.with_max_accounts(max_accounts), request, &user)
        .await?;
      match self.budget.check(prepared.composed.estimated_size) {
        Ok(()) => break prepared,
        Err(too_large) => match ladder.next() {
          Some(bound) => {
            info!(
              ?max_accounts,
              next = bound,
              raw = prepared.composed.estimated_size.raw,
              "transaction too large, re-quoting"
            );
            max_accounts = Some(bound);
          }
          None => return Err(too_large.into()),
        },
      }
    };

    let submission = self
      .submitter
      .submit(&prepared.composed.instructions, &prepared.tables)
      .await;
    if let (OutcomeStatus::Confirmed, Some(signature)) =
      (submission.status, submission.signature())
    {
      let refresh = Arc::clone(&self.refresh);
      tokio::spawn(async move {
        refresh.balances_changed(&user, &signature).await;
      });
    }
    info!(
      status = ?submission.status,
      attempts = submission.outcomes.len(),
      "swap and deposit finished"
    );
    Ok(FlowReport {
      quote: prepared.quote,
      deposit_amount: prepared.deposit_amount,
      max_accounts,
      composed: prepared.composed,
      submission,
    })
  }

  async fn prepare(
    &self,
    quote_request: &QuoteRequest,
    request: &SwapAndDepositRequest,
    user: &Pubkey,
  ) -> Result<Prepared, FlowError> {
    let quote = self.routing.quote(quote_request).await?;
    let deposit_amount =
      to_base_units(&quote.out_amount, request.output_decimals)?;
    let swap = self
      .routing
      .swap_instructions(&quote, user, &self.swap.hints)
      .await?;
    let deposit = self
      .lend
      .deposit_instructions(&request.output_mint, user, &deposit_amount)
      .await?;
    let tables = self.resolver.resolve(&swap.lookup_table_refs).await?;
    let composed =
      compose(user, &swap.groups, &deposit, &tables, &self.budget)?;
    Ok(Prepared {
      quote,
      deposit_amount,
      tables,
      composed,
    })
  }
}
