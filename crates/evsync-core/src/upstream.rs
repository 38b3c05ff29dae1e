//! The upstream (Eventbrite v3) data model.
//!
//! Only the fields the derivation rules read are typed. Everything else on an
//! event object is carried in [`UpstreamEvent::extra`] so that enrichment
//! merges never drop data the upstream sent.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::Result;

// ─── Ids ─────────────────────────────────────────────────────────────────────

/// Upstream ids arrive as strings, but some endpoints (and stubs) send
/// numbers. Both normalise to a string.
fn string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum RawId {
    Text(String),
    Int(i64),
    Float(f64),
  }

  Ok(match RawId::deserialize(de)? {
    RawId::Text(s) => s,
    RawId::Int(n) => n.to_string(),
    RawId::Float(n) => n.to_string(),
  })
}

// ─── Envelopes ───────────────────────────────────────────────────────────────

/// Continuation-based pagination block present on every list response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
  #[serde(default)]
  pub has_more_items: bool,
  pub continuation:   Option<String>,
}

impl Pagination {
  /// The token for the next page, if the upstream says there is one.
  pub fn next_page(&self) -> Option<&str> {
    if self.has_more_items {
      self.continuation.as_deref().filter(|c| !c.is_empty())
    } else {
      None
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
  #[serde(deserialize_with = "string_or_number")]
  pub id:   String,
  #[serde(default)]
  pub name: Option<String>,
}

/// Response of `GET /users/me/organizations/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationList {
  pub organizations: Vec<Organization>,
  #[serde(default)]
  pub pagination:    Option<Pagination>,
}

/// One page of `GET /organizations/{id}/events/`.
///
/// `events` is required: a body without it is rejected rather than read as
/// an empty list, which would purge the local store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPage {
  pub events:     Vec<UpstreamEvent>,
  #[serde(default)]
  pub pagination: Option<Pagination>,
}

// ─── Event sub-objects ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipartText {
  #[serde(default)]
  pub text: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub html: Option<String>,
}

/// A start or end time as the upstream reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateTimeTz {
  /// Wall-clock time at the venue, e.g. `2024-05-01T18:00:00`.
  #[serde(default)]
  pub local:    Option<String>,
  /// IANA zone name, e.g. `Europe/Berlin`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timezone: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub utc:      Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logo {
  #[serde(default)]
  pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueAddress {
  #[serde(default)]
  pub localized_address_display: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
  #[serde(default)]
  pub name:    Option<String>,
  #[serde(default)]
  pub address: Option<VenueAddress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketPrice {
  #[serde(default)]
  pub currency:    Option<String>,
  /// Decimal string (`"25.00"`) on the wire; numbers are accepted too.
  #[serde(default)]
  pub major_value: Option<Value>,
}

impl TicketPrice {
  pub fn major_amount(&self) -> Option<f64> {
    match self.major_value.as_ref()? {
      Value::String(s) => s.trim().parse().ok(),
      Value::Number(n) => n.as_f64(),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketAvailability {
  #[serde(default)]
  pub minimum_ticket_price: Option<TicketPrice>,
  #[serde(default)]
  pub maximum_ticket_price: Option<TicketPrice>,
}

// ─── UpstreamEvent ───────────────────────────────────────────────────────────

/// An event object as returned by the list endpoint, possibly enriched with
/// expansions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamEvent {
  #[serde(deserialize_with = "string_or_number")]
  pub id:     String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:   Option<MultipartText>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub start:  Option<DateTimeTz>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub end:    Option<DateTimeTz>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_free:  Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub currency: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub logo:     Option<Logo>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub venue:    Option<Venue>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ticket_availability: Option<TicketAvailability>,

  /// Every upstream field not typed above.
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl UpstreamEvent {
  /// Display title, empty when the upstream sent none.
  pub fn title(&self) -> &str {
    self
      .name
      .as_ref()
      .and_then(|n| n.text.as_deref())
      .unwrap_or_default()
  }

  pub fn logo_url(&self) -> Option<&str> {
    self
      .logo
      .as_ref()
      .and_then(|l| l.url.as_deref())
      .filter(|u| !u.is_empty())
  }

  /// Shallow merge: top-level keys of `detail` override or extend this
  /// event; keys absent from `detail` are kept.
  ///
  /// Fails if the merged object no longer fits the typed model (e.g. the
  /// detail response dropped the `id`).
  pub fn merge(&self, detail: Map<String, Value>) -> Result<Self> {
    let mut fields: Map<String, Value> =
      serde_json::from_value(serde_json::to_value(self)?)?;
    fields.extend(detail);
    Ok(serde_json::from_value(Value::Object(fields))?)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn event(v: Value) -> UpstreamEvent { serde_json::from_value(v).unwrap() }

  #[test]
  fn numeric_ids_are_normalised() {
    let org: Organization = serde_json::from_value(json!({ "id": 42 })).unwrap();
    assert_eq!(org.id, "42");
    let ev = event(json!({ "id": 7 }));
    assert_eq!(ev.id, "7");
  }

  #[test]
  fn unknown_fields_are_kept_in_extra() {
    let ev = event(json!({ "id": "e1", "capacity": 120, "listed": true }));
    assert_eq!(ev.extra.get("capacity"), Some(&json!(120)));
    assert_eq!(ev.extra.get("listed"), Some(&json!(true)));
  }

  #[test]
  fn merge_overrides_and_extends_without_removing() {
    let ev = event(json!({
      "id": "e1",
      "name": { "text": "Konzert" },
      "status": "live",
      "capacity": 120,
    }));

    let detail = json!({
      "id": "e1",
      "status": "started",
      "venue": { "name": "Stadthalle", "address": { "localized_address_display": "Hauptstr. 1" } },
    });
    let merged = ev.merge(detail.as_object().unwrap().clone()).unwrap();

    assert_eq!(merged.title(), "Konzert");
    assert_eq!(merged.status.as_deref(), Some("started"));
    assert_eq!(merged.venue.as_ref().unwrap().name.as_deref(), Some("Stadthalle"));
    assert_eq!(merged.extra.get("capacity"), Some(&json!(120)));
  }

  #[test]
  fn merge_that_breaks_the_model_fails() {
    let ev = event(json!({ "id": "e1" }));
    let detail = json!({ "id": ["not", "an", "id"] });
    assert!(ev.merge(detail.as_object().unwrap().clone()).is_err());
  }

  #[test]
  fn ticket_price_accepts_strings_and_numbers() {
    let p: TicketPrice =
      serde_json::from_value(json!({ "currency": "EUR", "major_value": "25.50" })).unwrap();
    assert_eq!(p.major_amount(), Some(25.5));
    let p: TicketPrice = serde_json::from_value(json!({ "major_value": 10 })).unwrap();
    assert_eq!(p.major_amount(), Some(10.0));
    let p: TicketPrice = serde_json::from_value(json!({ "major_value": null })).unwrap();
    assert_eq!(p.major_amount(), None);
  }

  #[test]
  fn pagination_stops_without_token() {
    let p = Pagination { has_more_items: true, continuation: None };
    assert_eq!(p.next_page(), None);
    let p = Pagination { has_more_items: false, continuation: Some("abc".into()) };
    assert_eq!(p.next_page(), None);
    let p = Pagination { has_more_items: true, continuation: Some("abc".into()) };
    assert_eq!(p.next_page(), Some("abc"));
  }
}
