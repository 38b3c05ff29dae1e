//! Per-event enrichment: aspect expansions and the cover image.
//!
//! Everything here is best-effort. A failed call leaves the event as it was
//! and the cycle carries on.

use evsync_client::{Aspect, Endpoints, Upstream, requests};
use evsync_core::{
  record::{AssetRef, NewAsset},
  store::EventStore,
  upstream::UpstreamEvent,
};

/// An enriched event plus the cover asset stored for it, ready to become a
/// record.
#[derive(Debug, Clone)]
pub struct PreparedEvent {
  pub event: UpstreamEvent,
  pub cover: Option<AssetRef>,
}

/// Fetch `aspect` for `event` and merge it in. Returns the original event on
/// any failure.
pub async fn enrich<U: Upstream>(
  upstream: &U,
  endpoints: &Endpoints,
  event: UpstreamEvent,
  aspect: Aspect,
) -> UpstreamEvent {
  let detail =
    match requests::event_detail(upstream, endpoints, &event.id, aspect).await {
      Ok(detail) => detail,
      Err(e) => {
        tracing::warn!(event_id = %event.id, %aspect, error = %e, "enrichment failed");
        return event;
      }
    };

  match event.merge(detail) {
    Ok(merged) => merged,
    Err(e) => {
      tracing::warn!(event_id = %event.id, %aspect, error = %e, "enrichment did not merge");
      event
    }
  }
}

/// Download the event's logo and store it as an asset.
pub async fn fetch_cover<U, S>(upstream: &U, store: &S, event: &UpstreamEvent) -> Option<AssetRef>
where
  U: Upstream,
  S: EventStore,
{
  let url = event.logo_url()?;

  let download = match upstream.get_bytes(url).await {
    Ok(d) => d,
    Err(e) => {
      tracing::warn!(event_id = %event.id, error = %e, "cover download failed");
      return None;
    }
  };

  let asset = NewAsset { media_type: download.media_type, bytes: download.bytes };
  match store.store_asset(asset).await {
    Ok(asset_ref) => Some(asset_ref),
    Err(e) => {
      tracing::warn!(event_id = %event.id, error = %e, "storing cover failed");
      None
    }
  }
}

/// Every aspect in order, then the cover.
pub async fn prepare_event<U, S>(
  upstream: &U,
  store: &S,
  endpoints: &Endpoints,
  mut event: UpstreamEvent,
) -> PreparedEvent
where
  U: Upstream,
  S: EventStore,
{
  for aspect in Aspect::ALL {
    event = enrich(upstream, endpoints, event, aspect).await;
  }
  let cover = fetch_cover(upstream, store, &event).await;
  PreparedEvent { event, cover }
}
