//! In-memory collaborators for orchestration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use solana_rpc_client_api::client_error::{
  Error as ClientError, ErrorKind as ClientErrorKind, Result as RpcResult,
};
use anchor_client::solana_sdk::account::Account;
use anchor_client::solana_sdk::hash::Hash;
use anchor_client::solana_sdk::signature::{Keypair, Signature, Signer};
use anchor_client::solana_sdk::transaction::{
  TransactionError, VersionedTransaction,
};
use anchor_lang::prelude::{AccountMeta, Pubkey};
use anchor_lang::solana_program::instruction::Instruction;
use async_trait::async_trait;
use serde_json::json;
use test_context::AsyncTestContext;
use tokio::time::{sleep, Instant};
use yieldswap_clients::balance::BalanceRefresh;
use yieldswap_clients::error::ClientsError;
use yieldswap_clients::lend::DepositService;
use yieldswap_clients::routing::{
  CompositionHints, Quote, QuoteRequest, RoutingService, SwapInstructions,
};
use yieldswap_clients::rpc::{LedgerRpc, SignatureStatus, SimulationReport};
use yieldswap_clients::wallet::{SigningError, WalletSigner};
use yieldswap_core::{InstructionGroups, COMPUTE_BUDGET_PROGRAM_ID};
use yieldswap_executor::prelude::*;

pub const LAST_VALID_BLOCK_HEIGHT: u64 = 1_000;
pub const OUT_AMOUNT: &str = "1500000";

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[derive(Debug, Clone)]
pub enum SendScript {
  Transient,
  BlockhashNotFound,
  Rejected,
}

#[derive(Debug, Clone)]
pub enum StatusScript {
  /// Pending for this many polls, then confirmed.
  ConfirmAfter(usize),
  Fail(String),
  /// Pending for this many polls, then failed on-chain.
  FailAfter(usize, String),
  NeverLands,
}

pub struct MockLedger {
  pub accounts: Mutex<HashMap<Pubkey, Account>>,
  pub simulation_error: Mutex<Option<String>>,
  pub send_script: Mutex<VecDeque<SendScript>>,
  pub status_script: Mutex<StatusScript>,
  pub blockhash_expired: Mutex<bool>,
  pub sent: Mutex<Vec<VersionedTransaction>>,
  pub blockhash_calls: AtomicUsize,
  pub account_calls: AtomicUsize,
  pub simulate_calls: AtomicUsize,
  pub send_calls: AtomicUsize,
  pub status_calls: AtomicUsize,
}

impl Default for MockLedger {
  fn default() -> Self {
    MockLedger {
      accounts: Mutex::default(),
      simulation_error: Mutex::default(),
      send_script: Mutex::default(),
      status_script: Mutex::new(StatusScript::ConfirmAfter(0)),
      blockhash_expired: Mutex::new(false),
      sent: Mutex::default(),
      blockhash_calls: AtomicUsize::new(0),
      account_calls: AtomicUsize::new(0),
      simulate_calls: AtomicUsize::new(0),
      send_calls: AtomicUsize::new(0),
      status_calls: AtomicUsize::new(0),
    }
  }
}

impl MockLedger {
  pub fn add_table(&self, key: Pubkey, addresses: &[Pubkey]) {
    lock(&self.accounts).insert(key, lookup_table_account(addresses));
  }

  pub fn script_sends(&self, script: impl IntoIterator<Item = SendScript>) {
    lock(&self.send_script).extend(script);
  }

  pub fn set_status(&self, script: StatusScript) {
    *lock(&self.status_script) = script;
  }

  pub fn expire_blockhashes(&self) {
    *lock(&self.blockhash_expired) = true;
  }

  pub fn fail_simulation(&self, detail: &str) {
    *lock(&self.simulation_error) = Some(detail.to_owned());
  }
}

pub fn calls(counter: &AtomicUsize) -> usize {
  counter.load(Ordering::SeqCst)
}

#[async_trait]
impl LedgerRpc for MockLedger {
  async fn get_latest_blockhash(&self) -> RpcResult<(Hash, u64)> {
    self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
    Ok((Hash::new_unique(), LAST_VALID_BLOCK_HEIGHT))
  }

  async fn get_multiple_accounts(
    &self,
    keys: &[Pubkey],
  ) -> RpcResult<Vec<Option<Account>>> {
    self.account_calls.fetch_add(1, Ordering::SeqCst);
    let accounts = lock(&self.accounts);
    Ok(keys.iter().map(|key| accounts.get(key).cloned()).collect())
  }

  async fn simulate_transaction(
    &self,
    _transaction: &VersionedTransaction,
  ) -> RpcResult<SimulationReport> {
    self.simulate_calls.fetch_add(1, Ordering::SeqCst);
    Ok(SimulationReport {
      err: lock(&self.simulation_error).clone(),
      logs: vec!["Program log: mock".to_owned()],
      units_consumed: Some(150_000),
    })
  }

  async fn send_transaction(
    &self,
    transaction: &VersionedTransaction,
  ) -> RpcResult<Signature> {
    self.send_calls.fetch_add(1, Ordering::SeqCst);
    match lock(&self.send_script).pop_front() {
      None => {
        lock(&self.sent).push(transaction.clone());
        Ok(transaction.signatures[0])
      }
      Some(SendScript::Transient) => Err(ClientError::from(
        ClientErrorKind::Io(std::io::Error::other("connection reset")),
      )),
      Some(SendScript::BlockhashNotFound) => Err(ClientError::from(
        ClientErrorKind::TransactionError(TransactionError::BlockhashNotFound),
      )),
      Some(SendScript::Rejected) => Err(ClientError::from(
        ClientErrorKind::Custom("insufficient funds".to_owned()),
      )),
    }
  }

  async fn get_signature_status(
    &self,
    _signature: &Signature,
  ) -> RpcResult<SignatureStatus> {
    let polls = self.status_calls.fetch_add(1, Ordering::SeqCst);
    Ok(match &*lock(&self.status_script) {
      StatusScript::ConfirmAfter(pending) if polls >= *pending => {
        SignatureStatus::Confirmed
      }
      StatusScript::Fail(detail) => SignatureStatus::Failed(detail.clone()),
      StatusScript::FailAfter(pending, detail) if polls >= *pending => {
        SignatureStatus::Failed(detail.clone())
      }
      _ => SignatureStatus::Pending,
    })
  }

  async fn get_block_height(&self) -> RpcResult<u64> {
    Ok(if *lock(&self.blockhash_expired) {
      LAST_VALID_BLOCK_HEIGHT + 1
    } else {
      LAST_VALID_BLOCK_HEIGHT - 10
    })
  }
}

pub fn lookup_table_account(addresses: &[Pubkey]) -> Account {
  let mut data = vec![0u8; 56];
  data[0..4].copy_from_slice(&1u32.to_le_bytes());
  data[4..12].copy_from_slice(&u64::MAX.to_le_bytes());
  for address in addresses {
    data.extend_from_slice(address.as_ref());
  }
  Account {
    lamports: 1,
    data,
    owner: Pubkey::new_unique(),
    executable: false,
    rent_epoch: 0,
  }
}

pub fn instruction(program_id: Pubkey, data_len: usize) -> Instruction {
  Instruction {
    program_id,
    accounts: vec![],
    data: vec![1; data_len],
  }
}

pub struct MockRouting {
  pub out_amount: Mutex<String>,
  /// Swap instructions per `maxAccounts` bound; `None` is the unbounded
  /// route.
  pub routes: Mutex<HashMap<Option<u8>, SwapInstructions>>,
  pub quote_requests: Mutex<Vec<QuoteRequest>>,
  /// Time spent inside `swap_instructions`.
  pub swap_latency: Mutex<Duration>,
  /// Start and end of each `swap_instructions` call.
  pub swap_fetches: Mutex<Vec<(Instant, Instant)>>,
}

impl MockRouting {
  pub fn new(user: Pubkey) -> Self {
    let mut routes = HashMap::new();
    routes.insert(None, swap_route(user, 16));
    MockRouting {
      out_amount: Mutex::new(OUT_AMOUNT.to_owned()),
      routes: Mutex::new(routes),
      quote_requests: Mutex::default(),
      swap_latency: Mutex::default(),
      swap_fetches: Mutex::default(),
    }
  }

  pub fn set_route(&self, max_accounts: Option<u8>, route: SwapInstructions) {
    lock(&self.routes).insert(max_accounts, route);
  }

  pub fn max_accounts_requested(&self) -> Vec<Option<u8>> {
    lock(&self.quote_requests)
      .iter()
      .map(|r| r.max_accounts)
      .collect()
  }
}

/// Route with one compute budget, one setup, a primary carrying
/// `primary_len` bytes of data, and a cleanup instruction.
pub fn swap_route(user: Pubkey, primary_len: usize) -> SwapInstructions {
  let program = Pubkey::new_unique();
  SwapInstructions {
    groups: InstructionGroups {
      compute_budget: vec![instruction(COMPUTE_BUDGET_PROGRAM_ID, 5)],
      setup: vec![instruction(program, 8)],
      primary: Some(Instruction {
        accounts: vec![AccountMeta::new(user, true)],
        ..instruction(program, primary_len)
      }),
      cleanup: vec![instruction(program, 8)],
      other: vec![],
    },
    lookup_table_refs: vec![],
  }
}

#[async_trait]
impl RoutingService for MockRouting {
  async fn quote(&self, request: &QuoteRequest) -> Result<Quote, ClientsError> {
    lock(&self.quote_requests).push(request.clone());
    Quote::from_value(json!({
      "inputMint": request.input_mint.to_string(),
      "inAmount": request.amount.to_string(),
      "outputMint": request.output_mint.to_string(),
      "outAmount": lock(&self.out_amount).clone(),
      "otherAmountThreshold": "1492500",
      "slippageBps": request.slippage_bps,
      "maxAccounts": request.max_accounts,
    }))
  }

  async fn swap_instructions(
    &self,
    quote: &Quote,
    _user: &Pubkey,
    _hints: &CompositionHints,
  ) -> Result<SwapInstructions, ClientsError> {
    let started = Instant::now();
    let latency = *lock(&self.swap_latency);
    if !latency.is_zero() {
      sleep(latency).await;
    }
    lock(&self.swap_fetches).push((started, Instant::now()));
    let max_accounts = quote.raw()["maxAccounts"]
      .as_u64()
      .and_then(|n| u8::try_from(n).ok());
    let routes = lock(&self.routes);
    Ok(
      routes
        .get(&max_accounts)
        .or_else(|| routes.get(&None))
        .cloned()
        .unwrap_or_default(),
    )
  }
}

#[derive(Default)]
pub struct MockLend {
  pub amounts: Mutex<Vec<String>>,
  pub instructions: Mutex<Vec<Instruction>>,
  pub called_at: Mutex<Vec<Instant>>,
}

impl MockLend {
  pub fn new() -> Self {
    let program = Pubkey::new_unique();
    MockLend {
      amounts: Mutex::default(),
      called_at: Mutex::default(),
      instructions: Mutex::new(vec![
        instruction(program, 8),
        instruction(program, 24),
      ]),
    }
  }
}

#[async_trait]
impl DepositService for MockLend {
  async fn deposit_instructions(
    &self,
    _asset: &Pubkey,
    _signer: &Pubkey,
    amount: &str,
  ) -> Result<Vec<Instruction>, ClientsError> {
    lock(&self.called_at).push(Instant::now());
    lock(&self.amounts).push(amount.to_owned());
    Ok(lock(&self.instructions).clone())
  }
}

pub struct MockSigner {
  pub keypair: Keypair,
  pub reject: Mutex<bool>,
  pub calls: AtomicUsize,
}

impl MockSigner {
  pub fn new() -> Self {
    MockSigner {
      keypair: Keypair::new(),
      reject: Mutex::new(false),
      calls: AtomicUsize::new(0),
    }
  }
}

#[async_trait]
impl WalletSigner for MockSigner {
  fn pubkey(&self) -> Pubkey {
    self.keypair.pubkey()
  }

  async fn sign_transaction(
    &self,
    transaction: VersionedTransaction,
  ) -> Result<VersionedTransaction, SigningError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if *lock(&self.reject) {
      return Err(SigningError::Rejected);
    }
    VersionedTransaction::try_new(transaction.message, &[&self.keypair])
      .map_err(|e| SigningError::Unavailable(e.to_string()))
  }
}

#[derive(Default)]
pub struct RecordingRefresh {
  pub notified: Mutex<Vec<(Pubkey, Signature)>>,
}

#[async_trait]
impl BalanceRefresh for RecordingRefresh {
  async fn balances_changed(&self, owner: &Pubkey, signature: &Signature) {
    lock(&self.notified).push((*owner, *signature));
  }
}

/// Refresh sink whose notification never completes.
pub struct StalledRefresh;

#[async_trait]
impl BalanceRefresh for StalledRefresh {
  async fn balances_changed(&self, _owner: &Pubkey, _signature: &Signature) {
    std::future::pending::<()>().await;
  }
}

/// Lets spawned refresh notifications run.
pub async fn refresh_settled() {
  sleep(Duration::from_millis(1)).await;
}

pub struct FlowTestContext {
  pub ledger: Arc<MockLedger>,
  pub routing: Arc<MockRouting>,
  pub lend: Arc<MockLend>,
  pub signer: Arc<MockSigner>,
  pub refresh: Arc<RecordingRefresh>,
  pub request: SwapAndDepositRequest,
}

impl AsyncTestContext for FlowTestContext {
  async fn setup() -> Self {
    let signer = Arc::new(MockSigner::new());
    FlowTestContext {
      ledger: Arc::new(MockLedger::default()),
      routing: Arc::new(MockRouting::new(signer.pubkey())),
      lend: Arc::new(MockLend::new()),
      signer,
      refresh: Arc::new(RecordingRefresh::default()),
      request: SwapAndDepositRequest {
        input_mint: Pubkey::new_unique(),
        output_mint: Pubkey::new_unique(),
        amount: 1_000_000_000,
        output_decimals: 6,
      },
    }
  }
}

impl FlowTestContext {
  pub fn user(&self) -> Pubkey {
    self.signer.pubkey()
  }

  /// Test defaults: fast polling and a short confirmation window.
  pub fn config() -> ExecutorConfig {
    let mut config = ExecutorConfig::default();
    config.submission.poll_interval_ms = 100;
    config.submission.confirm_timeout_ms = 2_000;
    config.submission.broadcast_backoff_ms = 10;
    config
  }

  pub fn flow(&self, config: &ExecutorConfig) -> SwapAndDeposit {
    SwapAndDeposit::new(
      config,
      Collaborators {
        routing: self.routing.clone(),
        lend: self.lend.clone(),
        rpc: self.ledger.clone(),
        signer: self.signer.clone(),
        refresh: self.refresh.clone(),
      },
    )
  }
}
