//! Error taxonomy of upstream calls.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// No bearer token configured. Never retried.
  #[error("no API token configured")]
  Unconfigured,

  #[error("invalid client configuration: {0}")]
  Config(String),

  #[error("request to {url} failed: {source}")]
  Transport {
    url:    String,
    #[source]
    source: reqwest::Error,
  },

  #[error("{url} answered with status {status}")]
  Status { url: String, status: u16 },

  /// The body was not JSON, or not the JSON shape the call expects.
  #[error("invalid response from {url}: {reason}")]
  InvalidResponse { url: String, reason: String },

  /// The upstream reported errors in the response body.
  #[error("upstream reported errors for {url}: {payload}")]
  Api { url: String, payload: Value },
}

impl Error {
  pub fn invalid(url: &str, reason: impl ToString) -> Self {
    Self::InvalidResponse {
      url:    url.to_owned(),
      reason: reason.to_string(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
