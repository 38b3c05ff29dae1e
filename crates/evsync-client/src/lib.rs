//! Client for the upstream events API (Eventbrite v3).
//!
//! [`ApiClient`] issues authenticated GET requests and classifies failures
//! into [`Error`]. The pipeline talks to it through the [`Upstream`] trait so
//! it can be driven by a stub in tests. The typed calls in [`requests`]
//! decode responses and follow pagination.

#![allow(async_fn_in_trait)]

pub mod client;
pub mod endpoints;
pub mod error;
pub mod requests;

use std::future::Future;

use bytes::Bytes;
use serde_json::Value;

pub use client::{ApiClient, ApiConfig};
pub use endpoints::{Aspect, Endpoints};
pub use error::{Error, Result};

/// A downloaded binary body (cover image).
#[derive(Debug, Clone)]
pub struct Download {
  pub bytes:      Bytes,
  /// `Content-Type` of the response, `application/octet-stream` if absent.
  pub media_type: String,
}

/// The two request shapes the sync pipeline needs.
pub trait Upstream: Send + Sync {
  /// Authenticated GET returning a validated JSON body.
  fn get_json<'a>(
    &'a self,
    url: &'a str,
  ) -> impl Future<Output = Result<Value>> + Send + 'a;

  /// Plain GET returning the raw body.
  fn get_bytes<'a>(
    &'a self,
    url: &'a str,
  ) -> impl Future<Output = Result<Download>> + Send + 'a;
}
