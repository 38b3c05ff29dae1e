//! Local record types, as a sync cycle materialises them.
//!
//! Records are created only by the reconciler and replaced wholesale on every
//! completed cycle. Cover images live outside the record table as assets and
//! are referenced by an opaque [`AssetRef`].

use std::fmt;

use bytes::Bytes;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rank assigned when no title rule matches.
pub const DEFAULT_SORT_RANK: i64 = 99;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Publication status of a local record, derived from the upstream lifecycle
/// state.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
  Draft,
  #[default]
  Published,
}

impl EventStatus {
  /// Map an upstream status string. Only `draft` stays unpublished; `live`,
  /// `started`, `ended`, `completed` and anything unknown are published.
  pub fn from_upstream(status: Option<&str>) -> Self {
    match status {
      Some("draft") => Self::Draft,
      _ => Self::Published,
    }
  }
}

// ─── Assets ──────────────────────────────────────────────────────────────────

/// Opaque handle to a stored binary asset.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AssetRef(pub Uuid);

impl AssetRef {
  pub fn new() -> Self { Self(Uuid::new_v4()) }
}

impl Default for AssetRef {
  fn default() -> Self { Self::new() }
}

impl fmt::Display for AssetRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}

/// Input to [`crate::store::EventStore::store_asset`].
#[derive(Debug, Clone)]
pub struct NewAsset {
  pub media_type: String,
  pub bytes:      Bytes,
}

/// A stored binary asset.
#[derive(Debug, Clone)]
pub struct Asset {
  pub asset_ref:    AssetRef,
  pub media_type:   String,
  /// SHA-256 hex digest of `bytes`; used for ETag generation.
  pub content_hash: String,
  pub bytes:        Bytes,
}

// ─── EventRecord ─────────────────────────────────────────────────────────────

/// A locally persisted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
  /// Upstream event id. Stable across syncs, but records themselves are
  /// replaced every cycle.
  pub id:                   String,
  pub title:                String,
  pub status:               EventStatus,
  pub address:              Option<String>,
  pub location_name:        Option<String>,
  pub is_free:              bool,
  /// Lowest ticket price in major currency units.
  pub price_min:            Option<f64>,
  pub price_max:            Option<f64>,
  pub currency:             Option<String>,
  pub sort_rank:            i64,
  pub start_local:          NaiveDateTime,
  pub end_local:            NaiveDateTime,
  /// `HH:MM – HH:MM`.
  pub formatted_time_range: String,
  pub unix_timestamp:       i64,
  pub url:                  Option<String>,
  pub cover_image:          Option<AssetRef>,
}
