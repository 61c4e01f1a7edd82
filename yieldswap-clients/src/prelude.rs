pub use anchor_client::solana_sdk::commitment_config::CommitmentConfig;
pub use anchor_client::solana_sdk::signature::Signature;
pub use anchor_lang::prelude::Pubkey;

pub use crate::balance::{BalanceRefresh, NoopBalanceRefresh};
pub use crate::error::ClientsError;
pub use crate::lend::{DepositService, EarnToken, JupiterLendClient};
pub use crate::lookup_tables::LookupTableResolver;
pub use crate::routing::{
  CompositionHints, JupiterRoutingClient, PrioritizationFee, Quote,
  QuoteRequest, RoutingService, SwapInstructions,
};
pub use crate::rpc::{
  LedgerRpc, SignatureStatus, SimulationReport, SolanaLedgerRpc,
};
pub use crate::util::{JUPITER_LEND_API, JUPITER_SWAP_API};
pub use crate::wallet::{KeypairSigner, SigningError, WalletSigner};
