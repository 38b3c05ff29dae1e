//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Wall-clock times are stored as `YYYY-MM-DDTHH:MM:SS` strings, UTC
//! timestamps as RFC 3339, UUIDs as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDateTime, Utc};
use evsync_core::record::{AssetRef, EventRecord, EventStatus};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{Error, Result};

const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_asset_ref(r: AssetRef) -> String { r.0.hyphenated().to_string() }

pub fn decode_asset_ref(s: &str) -> Result<AssetRef> {
  Ok(AssetRef(Uuid::parse_str(s)?))
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn encode_local(dt: NaiveDateTime) -> String {
  dt.format(LOCAL_FORMAT).to_string()
}

pub fn decode_local(s: &str) -> Result<NaiveDateTime> {
  NaiveDateTime::parse_from_str(s, LOCAL_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn encode_status(s: EventStatus) -> &'static str {
  match s {
    EventStatus::Draft => "draft",
    EventStatus::Published => "published",
  }
}

pub fn decode_status(s: &str) -> Result<EventStatus> {
  match s {
    "draft" => Ok(EventStatus::Draft),
    "published" => Ok(EventStatus::Published),
    other => Err(Error::UnknownStatus(other.to_owned())),
  }
}

/// SHA-256 hex digest of an asset body.
pub fn content_hash(bytes: &[u8]) -> String { hex::encode(Sha256::digest(bytes)) }

// ─── Raw event row ───────────────────────────────────────────────────────────

/// Column list shared by every `SELECT` over `events`, in [`RawEvent`] order.
pub const EVENT_COLUMNS: &str = "event_id, title, status, address, location_name, is_free,
   price_min, price_max, currency, sort_rank, start_local, end_local,
   formatted_time_range, unix_timestamp, url, cover_asset";

/// An `events` row in column form. `Send + 'static` so it can cross into the
/// database thread.
pub struct RawEvent {
  pub event_id:             String,
  pub title:                String,
  pub status:               String,
  pub address:              Option<String>,
  pub location_name:        Option<String>,
  pub is_free:              bool,
  pub price_min:            Option<f64>,
  pub price_max:            Option<f64>,
  pub currency:             Option<String>,
  pub sort_rank:            i64,
  pub start_local:          String,
  pub end_local:            String,
  pub formatted_time_range: String,
  pub unix_timestamp:       i64,
  pub url:                  Option<String>,
  pub cover_asset:          Option<String>,
}

impl RawEvent {
  pub fn from_record(r: EventRecord) -> Self {
    Self {
      event_id:             r.id,
      title:                r.title,
      status:               encode_status(r.status).to_owned(),
      address:              r.address,
      location_name:        r.location_name,
      is_free:              r.is_free,
      price_min:            r.price_min,
      price_max:            r.price_max,
      currency:             r.currency,
      sort_rank:            r.sort_rank,
      start_local:          encode_local(r.start_local),
      end_local:            encode_local(r.end_local),
      formatted_time_range: r.formatted_time_range,
      unix_timestamp:       r.unix_timestamp,
      url:                  r.url,
      cover_asset:          r.cover_image.map(encode_asset_ref),
    }
  }

  /// Map a row selected with [`EVENT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:             row.get(0)?,
      title:                row.get(1)?,
      status:               row.get(2)?,
      address:              row.get(3)?,
      location_name:        row.get(4)?,
      is_free:              row.get(5)?,
      price_min:            row.get(6)?,
      price_max:            row.get(7)?,
      currency:             row.get(8)?,
      sort_rank:            row.get(9)?,
      start_local:          row.get(10)?,
      end_local:            row.get(11)?,
      formatted_time_range: row.get(12)?,
      unix_timestamp:       row.get(13)?,
      url:                  row.get(14)?,
      cover_asset:          row.get(15)?,
    })
  }

  pub fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO events (
         event_id, title, status, address, location_name, is_free,
         price_min, price_max, currency, sort_rank, start_local, end_local,
         formatted_time_range, unix_timestamp, url, cover_asset
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
      rusqlite::params![
        self.event_id,
        self.title,
        self.status,
        self.address,
        self.location_name,
        self.is_free,
        self.price_min,
        self.price_max,
        self.currency,
        self.sort_rank,
        self.start_local,
        self.end_local,
        self.formatted_time_range,
        self.unix_timestamp,
        self.url,
        self.cover_asset,
      ],
    )?;
    Ok(())
  }

  pub fn into_record(self) -> Result<EventRecord> {
    Ok(EventRecord {
      id:                   self.event_id,
      title:                self.title,
      status:               decode_status(&self.status)?,
      address:              self.address,
      location_name:        self.location_name,
      is_free:              self.is_free,
      price_min:            self.price_min,
      price_max:            self.price_max,
      currency:             self.currency,
      sort_rank:            self.sort_rank,
      start_local:          decode_local(&self.start_local)?,
      end_local:            decode_local(&self.end_local)?,
      formatted_time_range: self.formatted_time_range,
      unix_timestamp:       self.unix_timestamp,
      url:                  self.url,
      cover_image:          self
        .cover_asset
        .as_deref()
        .map(decode_asset_ref)
        .transpose()?,
    })
  }
}

/// An `assets` row in column form.
pub struct RawAsset {
  pub asset_id:     String,
  pub media_type:   String,
  pub content_hash: String,
  pub bytes:        Vec<u8>,
}
