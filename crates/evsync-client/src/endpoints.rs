//! The fixed set of upstream URLs the sync consumes.

use std::fmt;

use reqwest::Url;

use crate::{Error, Result};

/// A secondary data expansion requested for a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aspect {
  TicketAvailability,
  Venue,
}

impl Aspect {
  /// The order in which the enricher requests aspects.
  pub const ALL: [Aspect; 2] = [Aspect::TicketAvailability, Aspect::Venue];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::TicketAvailability => "ticket_availability",
      Self::Venue => "venue",
    }
  }
}

impl fmt::Display for Aspect {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// URL builder rooted at the API base (e.g. `https://www.eventbriteapi.com/v3`).
#[derive(Debug, Clone)]
pub struct Endpoints {
  base: Url,
}

impl Endpoints {
  pub const DEFAULT_BASE: &'static str = "https://www.eventbriteapi.com/v3";

  pub fn new(base: &str) -> Result<Self> {
    let base = Url::parse(base)
      .map_err(|e| Error::Config(format!("api base {base:?}: {e}")))?;
    if base.cannot_be_a_base() {
      return Err(Error::Config(format!("api base {base} cannot be a base URL")));
    }
    Ok(Self { base })
  }

  fn at(&self, path: &str) -> Url {
    let mut url = self.base.clone();
    let prefix = self.base.path().trim_end_matches('/');
    url.set_path(&format!("{prefix}{path}"));
    url.set_query(None);
    url
  }

  /// `GET /users/me/organizations/`
  pub fn my_organizations(&self) -> String {
    self.at("/users/me/organizations/").into()
  }

  /// `GET /organizations/{id}/events/[?continuation=...]`
  pub fn organization_events(&self, org_id: &str, continuation: Option<&str>) -> String {
    let mut url = self.at(&format!("/organizations/{org_id}/events/"));
    if let Some(token) = continuation {
      url.query_pairs_mut().append_pair("continuation", token);
    }
    url.into()
  }

  /// `GET /events/{id}/?expand={aspect}`
  pub fn event_detail(&self, event_id: &str, aspect: Aspect) -> String {
    let mut url = self.at(&format!("/events/{event_id}/"));
    url.query_pairs_mut().append_pair("expand", aspect.as_str());
    url.into()
  }
}
