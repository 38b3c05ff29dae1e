//! [`SqliteStore`], the SQLite implementation of [`EventStore`].

use std::path::Path;

use bytes::Bytes;
use chrono::Utc;
use rusqlite::OptionalExtension as _;

use evsync_core::{
  record::{Asset, AssetRef, EventRecord, NewAsset},
  store::{EventQuery, EventStore, ReplaceSummary},
};

use crate::{
  Result,
  encode::{
    EVENT_COLUMNS, RawAsset, RawEvent, content_hash, decode_asset_ref,
    encode_asset_ref, encode_dt, encode_status,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An evsync record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of stored assets, referenced or not.
  pub async fn asset_count(&self) -> Result<usize> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM assets", [], |r| r.get(0))?)
      })
      .await?;
    Ok(n as usize)
  }
}

/// Cover asset ids currently referenced by any record.
fn referenced_assets(conn: &rusqlite::Connection) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn
    .prepare("SELECT DISTINCT cover_asset FROM events WHERE cover_asset IS NOT NULL")?;
  stmt
    .query_map([], |r| r.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()
}

// ─── EventStore impl ─────────────────────────────────────────────────────────

impl EventStore for SqliteStore {
  type Error = crate::Error;

  // ── Records ───────────────────────────────────────────────────────────────

  async fn delete_all_events(&self) -> Result<Vec<AssetRef>> {
    let ids: Vec<String> = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        let ids = referenced_assets(&tx)?;
        tx.execute("DELETE FROM events", [])?;
        tx.commit()?;
        Ok(ids)
      })
      .await?;

    ids.iter().map(|s| decode_asset_ref(s)).collect()
  }

  async fn insert_event(&self, record: EventRecord) -> Result<()> {
    let raw = RawEvent::from_record(record);

    self
      .conn
      .call(move |conn| {
        raw.insert(conn)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn replace_all(&self, records: Vec<EventRecord>) -> Result<ReplaceSummary> {
    let raws: Vec<RawEvent> = records.into_iter().map(RawEvent::from_record).collect();

    // Purge, insert and collect in one transaction: readers see either the
    // previous set or the new one.
    let summary = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let purged = tx.execute("DELETE FROM events", [])?;
        for raw in &raws {
          raw.insert(&tx)?;
        }

        // Old covers, and anything left behind by cycles that never got
        // this far, are now unreferenced.
        let released_assets = tx.execute(
          "DELETE FROM assets WHERE asset_id NOT IN
             (SELECT cover_asset FROM events WHERE cover_asset IS NOT NULL)",
          [],
        )?;

        tx.commit()?;
        Ok(ReplaceSummary { purged, released_assets, inserted: raws.len() })
      })
      .await?;

    Ok(summary)
  }

  // ── Assets ────────────────────────────────────────────────────────────────

  async fn store_asset(&self, asset: NewAsset) -> Result<AssetRef> {
    let asset_ref = AssetRef::new();

    let id_str     = encode_asset_ref(asset_ref);
    let hash       = content_hash(&asset.bytes);
    let at_str     = encode_dt(Utc::now());
    let media_type = asset.media_type;
    let bytes      = asset.bytes.to_vec();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO assets (asset_id, media_type, content_hash, bytes, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, media_type, hash, bytes, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(asset_ref)
  }

  async fn release_asset(&self, asset: AssetRef) -> Result<()> {
    let id_str = encode_asset_ref(asset);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM assets WHERE asset_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_asset(&self, asset: AssetRef) -> Result<Option<Asset>> {
    let id_str = encode_asset_ref(asset);

    let raw: Option<RawAsset> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT asset_id, media_type, content_hash, bytes FROM assets WHERE asset_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawAsset {
                asset_id:     row.get(0)?,
                media_type:   row.get(1)?,
                content_hash: row.get(2)?,
                bytes:        row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw
      .map(|r| {
        Ok(Asset {
          asset_ref:    decode_asset_ref(&r.asset_id)?,
          media_type:   r.media_type,
          content_hash: r.content_hash,
          bytes:        Bytes::from(r.bytes),
        })
      })
      .transpose()
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn list_events(&self, query: &EventQuery) -> Result<Vec<EventRecord>> {
    let status_str = query.status.map(encode_status).map(str::to_owned);
    let limit_val  = i64::try_from(query.limit).unwrap_or(i64::MAX);

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {EVENT_COLUMNS}
           FROM events
           WHERE ?1 IS NULL OR status = ?1
           ORDER BY sort_rank ASC, unix_timestamp ASC, record_id ASC
           LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![status_str.as_deref(), limit_val],
            RawEvent::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_record).collect()
  }
}
