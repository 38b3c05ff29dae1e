//! Errors that abort a sync cycle.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("upstream error: {0}")]
  Upstream(#[from] evsync_client::Error),

  #[error("no organization available for the configured token")]
  NoOrganization,

  #[error("cycle did not finish fetching within {0:?}")]
  DeadlineExceeded(Duration),

  #[error("enrichment task failed: {0}")]
  Task(#[from] tokio::task::JoinError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
