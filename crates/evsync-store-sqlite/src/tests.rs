//! Integration tests for `SqliteStore` against an in-memory database.

use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime};
use evsync_core::{
  record::{AssetRef, DEFAULT_SORT_RANK, EventRecord, EventStatus, NewAsset},
  store::{EventQuery, EventStore},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
  NaiveDate::from_ymd_opt(2024, 5, day)
    .unwrap()
    .and_hms_opt(hour, 0, 0)
    .unwrap()
}

fn record(id: &str, sort_rank: i64, day: u32) -> EventRecord {
  let start = at(day, 18);
  EventRecord {
    id: id.into(),
    title: format!("Event {id}"),
    status: EventStatus::Published,
    address: Some("Hauptstr. 1".into()),
    location_name: Some("Stadthalle".into()),
    is_free: false,
    price_min: Some(12.0),
    price_max: Some(30.5),
    currency: Some("EUR".into()),
    sort_rank,
    start_local: start,
    end_local: at(day, 20),
    formatted_time_range: "18:00 – 20:00".into(),
    unix_timestamp: start.and_utc().timestamp(),
    url: Some(format!("https://example.test/e/{id}")),
    cover_image: None,
  }
}

fn png(tag: &str) -> NewAsset {
  NewAsset {
    media_type: "image/png".into(),
    bytes:      Bytes::from(format!("png-bytes-{tag}")),
  }
}

fn all() -> EventQuery { EventQuery { status: None, limit: 100 } }

// ─── Records ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_list_roundtrip() {
  let s = store().await;
  let original = record("e1", 1, 1);
  s.insert_event(original.clone()).await.unwrap();

  let listed = s.list_events(&EventQuery::default()).await.unwrap();
  assert_eq!(listed, vec![original]);
}

#[tokio::test]
async fn listing_orders_by_rank_then_start() {
  let s = store().await;
  s.insert_event(record("late-default", DEFAULT_SORT_RANK, 3)).await.unwrap();
  s.insert_event(record("series-late", 1, 9)).await.unwrap();
  s.insert_event(record("early-default", DEFAULT_SORT_RANK, 2)).await.unwrap();
  s.insert_event(record("series-early", 1, 4)).await.unwrap();
  s.insert_event(record("compound", 5, 1)).await.unwrap();

  let ids: Vec<String> = s
    .list_events(&EventQuery::default())
    .await
    .unwrap()
    .into_iter()
    .map(|r| r.id)
    .collect();

  assert_eq!(
    ids,
    vec!["series-early", "series-late", "compound", "early-default", "late-default"]
  );
}

#[tokio::test]
async fn default_listing_hides_drafts() {
  let s = store().await;
  let mut draft = record("draft", 1, 1);
  draft.status = EventStatus::Draft;
  s.insert_event(draft).await.unwrap();
  s.insert_event(record("live", 2, 1)).await.unwrap();

  let published = s.list_events(&EventQuery::default()).await.unwrap();
  assert_eq!(published.len(), 1);
  assert_eq!(published[0].id, "live");

  let everything = s.list_events(&all()).await.unwrap();
  assert_eq!(everything.len(), 2);
}

#[tokio::test]
async fn default_listing_is_capped_at_twenty() {
  let s = store().await;
  for i in 0..25 {
    s.insert_event(record(&format!("e{i}"), DEFAULT_SORT_RANK, 1)).await.unwrap();
  }

  let listed = s.list_events(&EventQuery::default()).await.unwrap();
  assert_eq!(listed.len(), 20);
}

#[tokio::test]
async fn delete_all_returns_referenced_covers() {
  let s = store().await;
  let cover = s.store_asset(png("a")).await.unwrap();
  let mut with_cover = record("e1", 1, 1);
  with_cover.cover_image = Some(cover);
  s.insert_event(with_cover).await.unwrap();
  s.insert_event(record("e2", 2, 1)).await.unwrap();

  let covers = s.delete_all_events().await.unwrap();
  assert_eq!(covers, vec![cover]);
  assert!(s.list_events(&all()).await.unwrap().is_empty());
  // Deleting records does not release assets by itself.
  assert!(s.get_asset(cover).await.unwrap().is_some());
}

// ─── Replace ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn replace_all_swaps_records_and_releases_old_covers() {
  let s = store().await;
  let old_cover = s.store_asset(png("old")).await.unwrap();
  let mut old = record("old", 1, 1);
  old.cover_image = Some(old_cover);
  s.insert_event(old).await.unwrap();
  s.insert_event(record("old-2", 2, 1)).await.unwrap();

  let new_cover = s.store_asset(png("new")).await.unwrap();
  let mut new = record("new", 3, 2);
  new.cover_image = Some(new_cover);

  let summary = s.replace_all(vec![new.clone()]).await.unwrap();
  assert_eq!(summary.purged, 2);
  assert_eq!(summary.released_assets, 1);
  assert_eq!(summary.inserted, 1);

  assert_eq!(s.list_events(&all()).await.unwrap(), vec![new]);
  assert!(s.get_asset(old_cover).await.unwrap().is_none());
  assert!(s.get_asset(new_cover).await.unwrap().is_some());
  assert_eq!(s.asset_count().await.unwrap(), 1);
}

#[tokio::test]
async fn replace_all_collects_unreferenced_assets() {
  let s = store().await;
  // Stored but never attached to a record.
  let stray = s.store_asset(png("stray")).await.unwrap();
  let kept = s.store_asset(png("kept")).await.unwrap();
  let mut rec = record("e1", 1, 1);
  rec.cover_image = Some(kept);

  let summary = s.replace_all(vec![rec]).await.unwrap();
  assert_eq!(summary.purged, 0);
  assert_eq!(summary.released_assets, 1);
  assert!(s.get_asset(stray).await.unwrap().is_none());
  assert!(s.get_asset(kept).await.unwrap().is_some());

  let summary = s.replace_all(Vec::new()).await.unwrap();
  assert_eq!(summary.released_assets, 1);
  assert_eq!(s.asset_count().await.unwrap(), 0);
}

#[tokio::test]
async fn replace_all_with_empty_batch_clears_store() {
  let s = store().await;
  s.insert_event(record("e1", 1, 1)).await.unwrap();

  let summary = s.replace_all(Vec::new()).await.unwrap();
  assert_eq!(summary.purged, 1);
  assert_eq!(summary.inserted, 0);
  assert!(s.list_events(&all()).await.unwrap().is_empty());
}

// ─── Assets ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn store_and_get_asset() {
  let s = store().await;
  let r = s.store_asset(png("a")).await.unwrap();

  let asset = s.get_asset(r).await.unwrap().expect("asset present");
  assert_eq!(asset.asset_ref, r);
  assert_eq!(asset.media_type, "image/png");
  assert_eq!(asset.bytes, Bytes::from("png-bytes-a"));
  assert_eq!(asset.content_hash.len(), 64);
}

#[tokio::test]
async fn identical_bytes_get_distinct_refs() {
  let s = store().await;
  let a = s.store_asset(png("same")).await.unwrap();
  let b = s.store_asset(png("same")).await.unwrap();
  assert_ne!(a, b);

  let a = s.get_asset(a).await.unwrap().unwrap();
  let b = s.get_asset(b).await.unwrap().unwrap();
  assert_eq!(a.content_hash, b.content_hash);
}

#[tokio::test]
async fn release_unknown_asset_is_noop() {
  let s = store().await;
  s.release_asset(AssetRef::new()).await.unwrap();
}

#[tokio::test]
async fn releasing_a_cover_clears_the_reference() {
  let s = store().await;
  let cover = s.store_asset(png("a")).await.unwrap();
  let mut rec = record("e1", 1, 1);
  rec.cover_image = Some(cover);
  s.insert_event(rec).await.unwrap();

  s.release_asset(cover).await.unwrap();

  let listed = s.list_events(&all()).await.unwrap();
  assert_eq!(listed[0].cover_image, None);
  assert!(s.get_asset(cover).await.unwrap().is_none());
}

#[tokio::test]
async fn reopening_a_file_store_keeps_records() {
  let dir = std::env::temp_dir().join(format!("evsync-store-{}", uuid::Uuid::new_v4()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("events.sqlite");

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.insert_event(record("e1", 1, 1)).await.unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.list_events(&all()).await.unwrap().len(), 1);

  std::fs::remove_dir_all(&dir).ok();
}
