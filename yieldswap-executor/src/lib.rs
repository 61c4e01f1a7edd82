//! # Yieldswap Executor
//!
//! Composes a routed swap and a lending deposit into one versioned
//! transaction, then drives it through simulation, signing, broadcast and
//! confirmation.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use anchor_client::solana_sdk::signature::Keypair;
//! use yieldswap_clients::wallet::KeypairSigner;
//! use yieldswap_executor::prelude::*;
//!
//! # async fn example(request: SwapAndDepositRequest) -> anyhow::Result<()> {
//! let config = ExecutorConfig::from_file("yieldswap.toml")?;
//! let signer = Arc::new(KeypairSigner::new(Arc::new(Keypair::new())));
//! let flow = SwapAndDeposit::from_config(&config, signer)?;
//! let report = flow.execute(&request).await?;
//! println!("{:?} {:?}", report.status(), report.signature());
//! # Ok(())
//! # }
//! ```

pub mod composer;
pub mod config;
pub mod error;
pub mod flow;
pub mod prelude;
pub mod simulator;
pub mod size_budget;
pub mod submitter;
pub mod transaction_builder;

pub use error::{ExecutionError, FlowError};
