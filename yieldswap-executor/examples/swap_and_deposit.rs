//! Example: swap SOL into USDC and deposit the proceeds in one transaction
//!
//! Run with:
//! ```bash
//! KEYPAIR=~/.config/solana/id.json CONFIG=yieldswap.toml \
//!   RUST_LOG=yieldswap_executor=info cargo run --example swap_and_deposit
//! ```

use std::env;
use std::str::FromStr;
use std::sync::Arc;

use anchor_client::solana_sdk::signature::read_keypair_file;
use anchor_lang::prelude::Pubkey;
use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;
use yieldswap_clients::wallet::KeypairSigner;
use yieldswap_executor::prelude::*;

const WSOL: &str = "So11111111111111111111111111111111111111112";
const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let config = match env::var("CONFIG") {
    Ok(path) => ExecutorConfig::from_file(&path)
      .with_context(|| format!("Failed to load {path}"))?,
    Err(_) => ExecutorConfig::default(),
  };
  let keypair_path = env::var("KEYPAIR").context("KEYPAIR not set")?;
  let keypair = read_keypair_file(&keypair_path)
    .map_err(|e| anyhow!("Failed to read {keypair_path}: {e}"))?;
  let signer = Arc::new(KeypairSigner::new(Arc::new(keypair)));

  let amount = env::var("AMOUNT")
    .unwrap_or_else(|_| "10000000".to_string())
    .parse()?;
  let request = SwapAndDepositRequest {
    input_mint: Pubkey::from_str(WSOL)?,
    output_mint: Pubkey::from_str(USDC)?,
    amount,
    output_decimals: 6,
  };

  println!("Swapping {amount} lamports of SOL into USDC and depositing");
  let flow = SwapAndDeposit::from_config(&config, signer)?;
  let report = flow.execute(&request).await?;

  println!("Route bound: {:?}", report.max_accounts);
  println!("Deposited: {} base units", report.deposit_amount);
  println!("Dropped groups: {:?}", report.composed.dropped);
  println!("Transaction size: {} bytes", report.composed.estimated_size.raw);
  for outcome in &report.submission.outcomes {
    println!(
      "Attempt {}: {:?} {:?} {:?}",
      outcome.attempt, outcome.stage, outcome.signature, outcome.error
    );
  }
  match report.status() {
    OutcomeStatus::Confirmed => println!("Confirmed"),
    OutcomeStatus::Unknown => println!("Outcome unknown, check the signature"),
    OutcomeStatus::Rejected => println!("Rejected by signer"),
    OutcomeStatus::Failed => println!("Failed"),
  }
  Ok(())
}
