//! Handler for `GET /assets/{id}`: cover image bytes.
//!
//! The ETag is the asset's SHA-256 content hash, so conditional requests with
//! `If-None-Match` get a `304` without a body.

use axum::{
  extract::{Path, State},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use evsync_client::Upstream;
use evsync_core::{record::AssetRef, store::EventStore};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

fn etag(content_hash: &str) -> String { format!("\"{content_hash}\"") }

/// Whether an `If-None-Match` header lists `etag` (or `*`).
fn matches_if_none_match(headers: &HeaderMap, etag: &str) -> bool {
  headers
    .get(header::IF_NONE_MATCH)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|v| {
      v.split(',')
        .map(|t| t.trim().trim_start_matches("W/"))
        .any(|t| t == "*" || t == etag)
    })
}

/// `GET /assets/{id}`
pub async fn get_one<U, S>(
  State(state): State<ApiState<U, S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  U: Upstream + 'static,
  S: EventStore + 'static,
{
  let asset = state
    .store()
    .get_asset(AssetRef(id))
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("asset {id}")))?;

  let etag = etag(&asset.content_hash);
  if matches_if_none_match(&headers, &etag) {
    return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
  }

  Ok(
    (
      [
        (header::CONTENT_TYPE, asset.media_type),
        (header::ETAG, etag),
        (header::CACHE_CONTROL, "public, max-age=3600".to_owned()),
      ],
      asset.bytes,
    )
      .into_response(),
  )
}
