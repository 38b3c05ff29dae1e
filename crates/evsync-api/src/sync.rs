//! Handlers for `/sync`: manual trigger and status.

use axum::{Json, extract::State};
use evsync_client::Upstream;
use evsync_core::store::EventStore;
use evsync_sync::{CycleOutcome, CycleReport, SyncStatus};

use crate::{ApiState, error::ApiError};

/// `POST /sync`: run one cycle and return its report.
pub async fn run<U, S>(
  State(state): State<ApiState<U, S>>,
) -> Result<Json<CycleReport>, ApiError>
where
  U: Upstream + 'static,
  S: EventStore + 'static,
{
  let report = state.schedule.reconciler().run_sync_cycle().await;
  if report.outcome == CycleOutcome::Skipped {
    return Err(ApiError::Conflict("a sync cycle is already in progress".into()));
  }
  Ok(Json(report))
}

/// `GET /sync/status`
pub async fn status<U, S>(State(state): State<ApiState<U, S>>) -> Json<SyncStatus>
where
  U: Upstream + 'static,
  S: EventStore + 'static,
{
  Json(state.schedule.reconciler().status())
}
