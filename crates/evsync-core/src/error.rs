//! Error types for `evsync-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("event {event_id} is missing field `{field}`")]
  MissingField {
    event_id: String,
    field:    &'static str,
  },

  #[error("invalid local timestamp {value:?}: {reason}")]
  InvalidTimestamp { value: String, reason: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
