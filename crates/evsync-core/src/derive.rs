//! Derived presentation fields: sort rank, formatted time range, timestamp.
//!
//! The sort rank is a fixed lookup over campaign-series names that appear in
//! event titles. The table is ordered; the first matching row wins. Rows for
//! the compound "all series" label come first, so a title naming both the
//! compound label and a series never falls through to the single-series rank.

use chrono::{DateTime, NaiveDateTime, Offset, TimeDelta, TimeZone};
use chrono_tz::Tz;

use crate::{
  Error, Result,
  record::{AssetRef, DEFAULT_SORT_RANK, EventRecord, EventStatus},
  upstream::{DateTimeTz, UpstreamEvent},
};

/// Label for subscriptions covering every series of the season.
pub const ALL_SERIES: &str = "Alle Reihen";

/// `(substrings that must all be present in the title, rank)`.
pub const SORT_RULES: &[(&[&str], i64)] = &[
  (&[ALL_SERIES, "Frühlingsreihe"], 5),
  (&[ALL_SERIES, "Sommerreihe"], 6),
  (&[ALL_SERIES, "Herbstreihe"], 7),
  (&["Frühlingsreihe"], 1),
  (&["Sommerreihe"], 2),
  (&["Herbstreihe"], 3),
];

const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Separator between start and end in [`DerivedFields::formatted_time_range`].
pub const RANGE_SEPARATOR: &str = " – ";

/// Rank for a title. Case-sensitive substring matching.
pub fn sort_rank(title: &str) -> i64 {
  SORT_RULES
    .iter()
    .find(|(needles, _)| needles.iter().all(|n| title.contains(n)))
    .map(|(_, rank)| *rank)
    .unwrap_or(DEFAULT_SORT_RANK)
}

/// `HH:MM – HH:MM`.
pub fn format_time_range(start: NaiveDateTime, end: NaiveDateTime) -> String {
  format!(
    "{}{RANGE_SEPARATOR}{}",
    start.format("%H:%M"),
    end.format("%H:%M")
  )
}

/// Parse an upstream wall-clock time (`2024-05-01T18:00:00`).
pub fn parse_local(value: &str) -> Result<NaiveDateTime> {
  NaiveDateTime::parse_from_str(value, LOCAL_FORMAT).map_err(|e| {
    Error::InvalidTimestamp {
      value:  value.to_owned(),
      reason: e.to_string(),
    }
  })
}

/// Seconds since the epoch for a wall-clock time.
///
/// The time is read in `timezone` when it names a known IANA zone, otherwise
/// as UTC. Ambiguous local times (DST fold) resolve to the earlier instant.
///
/// A local time inside a DST gap does not exist. It resolves to the upstream
/// `utc` instant when one is given, otherwise it is read with the offset in
/// force before the gap (02:30 in a 02:00 to 03:00 gap lands on 03:30).
pub fn unix_timestamp(local: NaiveDateTime, timezone: Option<&str>, utc: Option<&str>) -> i64 {
  let Some(tz) = timezone.and_then(|name| name.parse::<Tz>().ok()) else {
    return local.and_utc().timestamp();
  };

  if let Some(dt) = tz.from_local_datetime(&local).earliest() {
    return dt.timestamp();
  }

  if let Some(ts) = utc.and_then(parse_utc) {
    return ts;
  }

  let before_gap = tz
    .from_local_datetime(&(local - TimeDelta::hours(GAP_LOOKBACK_HOURS)))
    .earliest()
    .map(|dt| dt.offset().fix().local_minus_utc());
  match before_gap {
    Some(offset) => (local - TimeDelta::seconds(i64::from(offset))).and_utc().timestamp(),
    None => local.and_utc().timestamp(),
  }
}

/// No zone has a DST gap longer than this.
const GAP_LOOKBACK_HOURS: i64 = 3;

/// Upstream `utc` values look like `2024-03-31T01:30:00Z`.
fn parse_utc(value: &str) -> Option<i64> {
  DateTime::parse_from_rfc3339(value.trim()).ok().map(|dt| dt.timestamp())
}

// ─── Derivation ──────────────────────────────────────────────────────────────

/// Fields computed from raw event attributes; never edited by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedFields {
  pub sort_rank:            i64,
  pub start_local:          NaiveDateTime,
  pub end_local:            NaiveDateTime,
  pub formatted_time_range: String,
  pub unix_timestamp:       i64,
}

fn local_time(
  event: &UpstreamEvent,
  field: &'static str,
  value: Option<&DateTimeTz>,
) -> Result<NaiveDateTime> {
  let raw = value
    .and_then(|v| v.local.as_deref())
    .ok_or_else(|| Error::MissingField {
      event_id: event.id.clone(),
      field,
    })?;
  parse_local(raw)
}

pub fn derive_fields(event: &UpstreamEvent) -> Result<DerivedFields> {
  let start = local_time(event, "start.local", event.start.as_ref())?;
  let end = local_time(event, "end.local", event.end.as_ref())?;
  let timezone = event.start.as_ref().and_then(|s| s.timezone.as_deref());
  let utc = event.start.as_ref().and_then(|s| s.utc.as_deref());

  Ok(DerivedFields {
    sort_rank:            sort_rank(event.title()),
    start_local:          start,
    end_local:            end,
    formatted_time_range: format_time_range(start, end),
    unix_timestamp:       unix_timestamp(start, timezone, utc),
  })
}

/// Turn an enriched upstream event into the record that gets persisted.
pub fn build_record(
  event: &UpstreamEvent,
  cover_image: Option<AssetRef>,
) -> Result<EventRecord> {
  let derived = derive_fields(event)?;

  let venue = event.venue.as_ref();
  let tickets = event.ticket_availability.as_ref();
  let min_price = tickets.and_then(|t| t.minimum_ticket_price.as_ref());
  let max_price = tickets.and_then(|t| t.maximum_ticket_price.as_ref());

  Ok(EventRecord {
    id: event.id.clone(),
    title: event.title().to_owned(),
    status: EventStatus::from_upstream(event.status.as_deref()),
    address: venue
      .and_then(|v| v.address.as_ref())
      .and_then(|a| a.localized_address_display.clone()),
    location_name: venue.and_then(|v| v.name.clone()),
    is_free: event.is_free.unwrap_or(false),
    price_min: min_price.and_then(|p| p.major_amount()),
    price_max: max_price.and_then(|p| p.major_amount()),
    currency: event
      .currency
      .clone()
      .or_else(|| min_price.and_then(|p| p.currency.clone())),
    sort_rank: derived.sort_rank,
    start_local: derived.start_local,
    end_local: derived.end_local,
    formatted_time_range: derived.formatted_time_range,
    unix_timestamp: derived.unix_timestamp,
    url: event.url.clone(),
    cover_image,
  })
}
