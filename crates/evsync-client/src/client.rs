//! Async HTTP client for the upstream events API.

use std::time::Duration;

use reqwest::{Client, header};
use serde_json::Value;

use crate::{Download, Error, Result, Upstream};

/// Connection settings for the upstream API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// Bearer token. `None` disables every authenticated call.
  pub token:   Option<String>,
  /// Per-request timeout.
  pub timeout: Duration,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self { token: None, timeout: Duration::from_secs(30) }
  }
}

/// Async HTTP client for the upstream JSON API.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  token:  Option<String>,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .user_agent(concat!("evsync/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
    Ok(Self::with_http_client(client, config.token))
  }

  /// Use a caller-built [`reqwest::Client`] (custom proxy or TLS settings).
  pub fn with_http_client(client: Client, token: Option<String>) -> Self {
    let token = token.filter(|t| !t.trim().is_empty());
    Self { client, token }
  }

  pub fn is_configured(&self) -> bool { self.token.is_some() }
}

/// Whether a parsed body carries a non-empty `errors` field.
///
/// `null`, `false`, `0`, `""`, `[]` and `{}` all count as empty.
fn has_errors(body: &Value) -> bool {
  match body.get("errors") {
    None | Some(Value::Null) => false,
    Some(Value::Bool(b)) => *b,
    Some(Value::Number(n)) => n.as_f64() != Some(0.0),
    Some(Value::String(s)) => !s.is_empty() && s != "0",
    Some(Value::Array(a)) => !a.is_empty(),
    Some(Value::Object(o)) => !o.is_empty(),
  }
}

/// Validate a response body: it must be JSON and must not report errors.
fn validate_body(url: &str, body: &str) -> Result<Value> {
  let json: Value = serde_json::from_str(body).map_err(|e| Error::invalid(url, e))?;

  if has_errors(&json) {
    tracing::error!(%url, payload = %json, "upstream reported errors");
    return Err(Error::Api { url: url.to_owned(), payload: json });
  }

  Ok(json)
}

fn transport(url: &str) -> impl FnOnce(reqwest::Error) -> Error + '_ {
  move |source| Error::Transport { url: url.to_owned(), source }
}

impl Upstream for ApiClient {
  async fn get_json<'a>(&'a self, url: &'a str) -> Result<Value> {
    let Some(token) = self.token.as_deref() else {
      return Err(Error::Unconfigured);
    };

    tracing::debug!(%url, "GET");
    let body = self
      .client
      .get(url)
      .bearer_auth(token)
      .send()
      .await
      .map_err(transport(url))?
      .text()
      .await
      .map_err(transport(url))?;

    validate_body(url, &body)
  }

  async fn get_bytes<'a>(&'a self, url: &'a str) -> Result<Download> {
    tracing::debug!(%url, "GET (binary)");
    let resp = self.client.get(url).send().await.map_err(transport(url))?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Status { url: url.to_owned(), status: status.as_u16() });
    }

    let media_type = resp
      .headers()
      .get(header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(|v| v.split(';').next().unwrap_or(v).trim().to_owned())
      .filter(|v| !v.is_empty())
      .unwrap_or_else(|| "application/octet-stream".to_owned());

    let bytes = resp.bytes().await.map_err(transport(url))?;
    Ok(Download { bytes, media_type })
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
  use std::collections::HashMap;

  use axum::{
    Json, Router,
    extract::Query,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::get,
  };
  use serde_json::json;
  use tokio::net::TcpListener;

  use super::*;

  pub const TOKEN: &str = "t0ken";

  fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      == Some("Bearer t0ken")
  }

  async fn organizations(headers: HeaderMap) -> impl IntoResponse {
    if bearer_ok(&headers) {
      (StatusCode::OK, Json(json!({ "organizations": [{ "id": 42 }, { "id": "43" }] })))
    } else {
      (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "errors": [{ "code": "INVALID_AUTH" }] })),
      )
    }
  }

  async fn events(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    match q.get("continuation").map(String::as_str) {
      None => Json(json!({
        "pagination": { "has_more_items": true, "continuation": "page 2" },
        "events": [{ "id": "e1" }, { "id": "e2" }]
      })),
      Some("page 2") => Json(json!({
        "pagination": { "has_more_items": false },
        "events": [{ "id": "e3" }]
      })),
      Some(_) => Json(json!({ "errors": ["unknown continuation"] })),
    }
  }

  async fn endless(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let next = q
      .get("continuation")
      .and_then(|c| c.parse::<u32>().ok())
      .unwrap_or(0)
      + 1;
    Json(json!({
      "pagination": { "has_more_items": true, "continuation": next.to_string() },
      "events": []
    }))
  }

  async fn detail(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({ "id": "e1", "expanded": q.get("expand") }))
  }

  /// Serve a stub upstream on an ephemeral port; returns the `/v3` base URL.
  pub async fn serve_stub() -> String {
    let app = Router::new()
      .route("/v3/users/me/organizations/", get(organizations))
      .route("/v3/organizations/42/events/", get(events))
      .route("/v3/organizations/99/events/", get(endless))
      .route("/v3/events/{id}/", get(detail))
      .route("/v3/not-json", get(|| async { "<html>maintenance</html>" }))
      .route("/v3/errors", get(|| async { Json(json!({ "errors": { "code": "BAD" } })) }))
      .route(
        "/v3/empty-errors",
        get(|| async { Json(json!({ "errors": [], "ok": true })) }),
      )
      .route(
        "/cover.png",
        get(|| async { ([(header::CONTENT_TYPE, "image/png; charset=binary")], vec![1u8, 2, 3]) }),
      )
      .route("/missing.png", get(|| async { StatusCode::NOT_FOUND }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}/v3")
  }

  pub fn client(token: Option<&str>) -> ApiClient {
    let http = Client::builder().no_proxy().build().unwrap();
    ApiClient::with_http_client(http, token.map(str::to_owned))
  }

  #[tokio::test]
  async fn missing_token_fails_fast() {
    let c = client(None);
    assert!(!c.is_configured());
    // Port 9 is never contacted: the call must fail before any I/O.
    let err = c.get_json("http://127.0.0.1:9/v3/users/me/organizations/").await;
    assert!(matches!(err, Err(Error::Unconfigured)));
  }

  #[tokio::test]
  async fn blank_token_counts_as_missing() {
    assert!(!client(Some("  ")).is_configured());
  }

  #[tokio::test]
  async fn sends_bearer_token() {
    let base = serve_stub().await;
    let body = client(Some(TOKEN))
      .get_json(&format!("{base}/users/me/organizations/"))
      .await
      .unwrap();
    assert_eq!(body["organizations"][0]["id"], json!(42));
  }

  #[tokio::test]
  async fn wrong_token_surfaces_api_error() {
    let base = serve_stub().await;
    let url = format!("{base}/users/me/organizations/");
    match client(Some("wrong")).get_json(&url).await {
      Err(Error::Api { url: u, payload }) => {
        assert_eq!(u, url);
        assert_eq!(payload["errors"][0]["code"], json!("INVALID_AUTH"));
      }
      other => panic!("expected Api error, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn non_json_body_is_invalid_response() {
    let base = serve_stub().await;
    let err = client(Some(TOKEN)).get_json(&format!("{base}/not-json")).await;
    assert!(matches!(err, Err(Error::InvalidResponse { .. })));
  }

  #[tokio::test]
  async fn object_errors_field_is_api_error() {
    let base = serve_stub().await;
    let err = client(Some(TOKEN)).get_json(&format!("{base}/errors")).await;
    assert!(matches!(err, Err(Error::Api { .. })));
  }

  #[tokio::test]
  async fn empty_errors_field_is_success() {
    let base = serve_stub().await;
    let body = client(Some(TOKEN))
      .get_json(&format!("{base}/empty-errors"))
      .await
      .unwrap();
    assert_eq!(body["ok"], json!(true));
  }

  #[tokio::test]
  async fn downloads_bytes_with_media_type() {
    let base = serve_stub().await;
    let root = base.trim_end_matches("/v3");
    let d = client(None).get_bytes(&format!("{root}/cover.png")).await.unwrap();
    assert_eq!(d.media_type, "image/png");
    assert_eq!(d.bytes.as_ref(), &[1, 2, 3]);
  }

  #[tokio::test]
  async fn missing_download_is_status_error() {
    let base = serve_stub().await;
    let root = base.trim_end_matches("/v3");
    let err = client(None).get_bytes(&format!("{root}/missing.png")).await;
    assert!(matches!(err, Err(Error::Status { status: 404, .. })));
  }

  #[tokio::test]
  async fn unreachable_host_is_transport_error() {
    let err = client(Some(TOKEN)).get_json("http://127.0.0.1:9/v3/").await;
    assert!(matches!(err, Err(Error::Transport { .. })));
  }

  #[test]
  fn empty_error_values() {
    for v in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
      assert!(!has_errors(&json!({ "errors": v })), "{v} should be empty");
    }
    for v in [json!(true), json!(1), json!("boom"), json!(["x"]), json!({ "a": 1 })] {
      assert!(has_errors(&json!({ "errors": v })), "{v} should be non-empty");
    }
    assert!(!has_errors(&json!({ "events": [] })));
  }
}
