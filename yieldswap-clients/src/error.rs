use thiserror::Error;
use yieldswap_core::CoreError;

/// Failures at the boundary with external services.
#[derive(Debug, Error)]
pub enum ClientsError {
  #[error("HTTP request failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("{service} responded {status}: {body}")]
  Service {
    service: &'static str,
    status: u16,
    body: String,
  },
  #[error("Unexpected response body: {0}")]
  Decode(#[from] serde_json::Error),
  #[error("Lookup table resolution unavailable: {0}")]
  ResolutionUnavailable(String),
  #[error(transparent)]
  Core(#[from] CoreError),
}

impl ClientsError {
  /// Whether the failure came from the instruction data itself rather than
  /// the transport.
  #[must_use]
  pub fn is_invalid_data(&self) -> bool {
    matches!(self, ClientsError::Core(_) | ClientsError::Decode(_))
  }
}
