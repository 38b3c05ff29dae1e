//! Typed upstream calls built on [`Upstream::get_json`].

use evsync_core::upstream::{EventPage, Organization, OrganizationList, UpstreamEvent};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{Aspect, Endpoints, Error, Result, Upstream};

/// Upper bound on followed event pages; guards against a continuation loop.
pub const MAX_PAGES: usize = 50;

fn decode<T: DeserializeOwned>(url: &str, body: Value) -> Result<T> {
  serde_json::from_value(body).map_err(|e| Error::invalid(url, e))
}

/// Organizations of the token's owner, in upstream order.
pub async fn my_organizations<U: Upstream>(
  upstream: &U,
  endpoints: &Endpoints,
) -> Result<Vec<Organization>> {
  let url = endpoints.my_organizations();
  let body = upstream.get_json(&url).await?;
  let list: OrganizationList = decode(&url, body)?;
  Ok(list.organizations)
}

/// Every event of an organization, following continuation pages.
pub async fn organization_events<U: Upstream>(
  upstream: &U,
  endpoints: &Endpoints,
  org_id: &str,
) -> Result<Vec<UpstreamEvent>> {
  let mut events = Vec::new();
  let mut continuation: Option<String> = None;

  for page_no in 1..=MAX_PAGES {
    let url = endpoints.organization_events(org_id, continuation.as_deref());
    let body = upstream.get_json(&url).await?;
    let page: EventPage = decode(&url, body)?;
    events.extend(page.events);

    continuation = page
      .pagination
      .as_ref()
      .and_then(|p| p.next_page())
      .map(str::to_owned);

    match continuation {
      Some(_) => tracing::debug!(org_id, page_no, "following event pagination"),
      None => return Ok(events),
    }
  }

  Err(Error::invalid(
    &endpoints.organization_events(org_id, None),
    format!("pagination did not end after {MAX_PAGES} pages"),
  ))
}

/// One event with `aspect` expanded, as a raw field map for merging.
pub async fn event_detail<U: Upstream>(
  upstream: &U,
  endpoints: &Endpoints,
  event_id: &str,
  aspect: Aspect,
) -> Result<Map<String, Value>> {
  let url = endpoints.event_detail(event_id, aspect);
  match upstream.get_json(&url).await? {
    Value::Object(fields) => Ok(fields),
    other => Err(Error::invalid(&url, format!("expected an object, got {other}"))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::client::tests::{TOKEN, client, serve_stub};

  #[tokio::test]
  async fn decodes_organizations() {
    let base = serve_stub().await;
    let orgs = my_organizations(&client(Some(TOKEN)), &Endpoints::new(&base).unwrap())
      .await
      .unwrap();
    let ids: Vec<&str> = orgs.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, ["42", "43"]);
  }

  #[tokio::test]
  async fn follows_continuation_pages() {
    let base = serve_stub().await;
    let events =
      organization_events(&client(Some(TOKEN)), &Endpoints::new(&base).unwrap(), "42")
        .await
        .unwrap();
    let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["e1", "e2", "e3"]);
  }

  #[tokio::test]
  async fn endless_pagination_is_rejected() {
    let base = serve_stub().await;
    let err =
      organization_events(&client(Some(TOKEN)), &Endpoints::new(&base).unwrap(), "99").await;
    assert!(matches!(err, Err(Error::InvalidResponse { .. })));
  }

  #[tokio::test]
  async fn detail_requests_expansion() {
    let base = serve_stub().await;
    let fields = event_detail(
      &client(Some(TOKEN)),
      &Endpoints::new(&base).unwrap(),
      "e1",
      Aspect::Venue,
    )
    .await
    .unwrap();
    assert_eq!(fields.get("expanded"), Some(&Value::from("venue")));
  }
}
