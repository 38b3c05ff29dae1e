//! The `EventStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `evsync-store-sqlite`).
//! The reconciler is the only writer; the listing query is the only read path
//! used by presentation layers.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::record::{Asset, AssetRef, EventRecord, EventStatus, NewAsset};

/// Default page size of [`EventStore::list_events`].
pub const DEFAULT_LIST_LIMIT: usize = 20;

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`EventStore::list_events`].
///
/// Results are always ordered by `sort_rank` ascending, then
/// `unix_timestamp` ascending.
#[derive(Debug, Clone)]
pub struct EventQuery {
  /// `None` lists every status.
  pub status: Option<EventStatus>,
  pub limit:  usize,
}

impl Default for EventQuery {
  fn default() -> Self {
    Self {
      status: Some(EventStatus::Published),
      limit:  DEFAULT_LIST_LIMIT,
    }
  }
}

/// What a [`EventStore::replace_all`] call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceSummary {
  pub purged:          usize,
  /// Assets no longer referenced once the batch was in.
  pub released_assets: usize,
  pub inserted:        usize,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an evsync record store.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait EventStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Records ───────────────────────────────────────────────────────────

  /// Delete every record and return the cover assets they referenced. The
  /// assets themselves are not released.
  fn delete_all_events(
    &self,
  ) -> impl Future<Output = Result<Vec<AssetRef>, Self::Error>> + Send + '_;

  fn insert_event(
    &self,
    record: EventRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Purge every record, insert `records` and release every asset the new
  /// batch does not reference, as one atomic step where the backend supports
  /// it. Covers stored by cycles that never reached this point are released
  /// here too.
  fn replace_all(
    &self,
    records: Vec<EventRecord>,
  ) -> impl Future<Output = Result<ReplaceSummary, Self::Error>> + Send + '_;

  // ── Assets ────────────────────────────────────────────────────────────

  fn store_asset(
    &self,
    asset: NewAsset,
  ) -> impl Future<Output = Result<AssetRef, Self::Error>> + Send + '_;

  /// Release an asset. Releasing an unknown asset is a no-op.
  fn release_asset(
    &self,
    asset: AssetRef,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_asset(
    &self,
    asset: AssetRef,
  ) -> impl Future<Output = Result<Option<Asset>, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn list_events<'a>(
    &'a self,
    query: &'a EventQuery,
  ) -> impl Future<Output = Result<Vec<EventRecord>, Self::Error>> + Send + 'a;
}
