//! SQL schema for the evsync SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Binary blobs (cover images). Referenced by opaque UUID handles.
CREATE TABLE IF NOT EXISTS assets (
    asset_id      TEXT PRIMARY KEY,
    media_type    TEXT NOT NULL,
    content_hash  TEXT NOT NULL,   -- SHA-256 hex of bytes
    bytes         BLOB NOT NULL,
    created_at    TEXT NOT NULL
);

-- Replaced wholesale by every completed sync cycle; record_id is local only.
CREATE TABLE IF NOT EXISTS events (
    record_id            INTEGER PRIMARY KEY,
    event_id             TEXT    NOT NULL,   -- upstream id
    title                TEXT    NOT NULL,
    status               TEXT    NOT NULL,   -- 'draft' | 'published'
    address              TEXT,
    location_name        TEXT,
    is_free              INTEGER NOT NULL DEFAULT 0,
    price_min            REAL,
    price_max            REAL,
    currency             TEXT,
    sort_rank            INTEGER NOT NULL DEFAULT 99,
    start_local          TEXT    NOT NULL,
    end_local            TEXT    NOT NULL,
    formatted_time_range TEXT    NOT NULL,
    unix_timestamp       INTEGER NOT NULL,
    url                  TEXT,
    cover_asset          TEXT REFERENCES assets(asset_id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS events_listing_idx
    ON events(status, sort_rank, unix_timestamp);

PRAGMA user_version = 1;
";
