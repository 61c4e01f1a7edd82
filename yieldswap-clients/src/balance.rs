use anchor_client::solana_sdk::signature::Signature;
use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use tracing::debug;

/// Notified after a transaction confirms so that cached balances can be
/// refetched. Fire and forget: implementations must not fail the caller.
#[async_trait]
pub trait BalanceRefresh: Send + Sync {
  async fn balances_changed(&self, owner: &Pubkey, signature: &Signature);
}

/// Refresh sink that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBalanceRefresh;

#[async_trait]
impl BalanceRefresh for NoopBalanceRefresh {
  async fn balances_changed(&self, owner: &Pubkey, signature: &Signature) {
    debug!(%owner, %signature, "balances changed");
  }
}
