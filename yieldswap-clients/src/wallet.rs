//! Wallet signing capability.

use std::sync::Arc;

use anchor_client::solana_sdk::signature::{Keypair, Signer};
use anchor_client::solana_sdk::transaction::VersionedTransaction;
use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
  #[error("User rejected the signature request")]
  Rejected,
  #[error("Signer unavailable: {0}")]
  Unavailable(String),
}

/// Something that can approve and sign a transaction for a fee payer.
///
/// Implementations may suspend for as long as a human takes to decide.
#[async_trait]
pub trait WalletSigner: Send + Sync {
  fn pubkey(&self) -> Pubkey;

  /// Signs the transaction and returns it with signatures filled in.
  ///
  /// # Errors
  /// * [`SigningError::Rejected`] when the holder declines
  /// * [`SigningError::Unavailable`] when no signature can be produced
  async fn sign_transaction(
    &self,
    transaction: VersionedTransaction,
  ) -> Result<VersionedTransaction, SigningError>;
}

/// Signs with a local keypair, never rejecting.
pub struct KeypairSigner {
  keypair: Arc<Keypair>,
}

impl KeypairSigner {
  #[must_use]
  pub fn new(keypair: Arc<Keypair>) -> Self {
    Self { keypair }
  }
}

#[async_trait]
impl WalletSigner for KeypairSigner {
  fn pubkey(&self) -> Pubkey {
    self.keypair.pubkey()
  }

  async fn sign_transaction(
    &self,
    transaction: VersionedTransaction,
  ) -> Result<VersionedTransaction, SigningError> {
    VersionedTransaction::try_new(transaction.message, &[self.keypair.as_ref()])
      .map_err(|e| SigningError::Unavailable(e.to_string()))
  }
}
