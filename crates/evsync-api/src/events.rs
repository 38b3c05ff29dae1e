//! Handler for `GET /events`, the listing read path.

use axum::{
  Json,
  extract::{Query, State},
};
use evsync_client::Upstream;
use evsync_core::{
  record::{EventRecord, EventStatus},
  store::{DEFAULT_LIST_LIMIT, EventQuery, EventStore},
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

/// Upper bound on `limit`.
pub const MAX_LIMIT: usize = 500;

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  /// Defaults to 20.
  pub limit:  Option<usize>,
  /// `published` (default), `draft` or `all`.
  pub status: Option<String>,
}

fn parse_status(status: Option<&str>) -> Result<Option<EventStatus>, ApiError> {
  match status.map(str::trim) {
    None | Some("") | Some("published") => Ok(Some(EventStatus::Published)),
    Some("draft") => Ok(Some(EventStatus::Draft)),
    Some("all") => Ok(None),
    Some(other) => Err(ApiError::BadRequest(format!("unknown status {other:?}"))),
  }
}

/// `GET /events[?limit=...][&status=...]`
pub async fn list<U, S>(
  State(state): State<ApiState<U, S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<EventRecord>>, ApiError>
where
  U: Upstream + 'static,
  S: EventStore + 'static,
{
  let query = EventQuery {
    status: parse_status(params.status.as_deref())?,
    limit:  params.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIMIT),
  };

  let events = state.store().list_events(&query).await.map_err(ApiError::store)?;
  Ok(Json(events))
}
