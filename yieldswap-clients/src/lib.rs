//! # Yieldswap Clients
//!
//! Boundaries of the swap-and-deposit executor: the routing and lending HTTP
//! services, the ledger RPC, the wallet, and the balance refresh sink.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use yieldswap_clients::prelude::*;
//!
//! # async fn example() -> Result<(), ClientsError> {
//! let timeout = Duration::from_secs(10);
//! let routing = JupiterRoutingClient::new(JUPITER_SWAP_API, timeout)?;
//! let quote = routing
//!   .quote(&QuoteRequest {
//!     input_mint: Pubkey::new_unique(),
//!     output_mint: Pubkey::new_unique(),
//!     amount: 1_000_000_000,
//!     slippage_bps: 50,
//!     max_accounts: None,
//!   })
//!   .await?;
//! println!("{} out", quote.out_amount);
//! # Ok(())
//! # }
//! ```

pub mod balance;
pub mod error;
pub mod lend;
pub mod lookup_tables;
pub mod prelude;
pub mod routing;
pub mod rpc;
pub mod util;
pub mod wallet;
