//! JSON HTTP surface for evsync.
//!
//! Exposes an axum [`Router`] over a [`Schedule`] (and through it the
//! reconciler and the store). Auth and TLS are the caller's responsibility.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/events` | `?limit=`, `?status=published\|draft\|all` |
//! | `GET`  | `/assets/{id}` | Cover bytes with `ETag` |
//! | `GET`  | `/schedule` | Whether the periodic sync is armed |
//! | `POST` | `/schedule/enable` | Idempotent |
//! | `POST` | `/schedule/disable` | Idempotent |
//! | `POST` | `/sync` | Run one cycle now; 409 while one is running |
//! | `GET`  | `/sync/status` | Current state and last report |

pub mod assets;
pub mod error;
pub mod events;
pub mod schedule;
pub mod sync;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use evsync_client::Upstream;
use evsync_core::store::EventStore;
use evsync_sync::Schedule;

pub use error::ApiError;

/// Shared handler state.
pub struct ApiState<U, S> {
  pub schedule: Arc<Schedule<U, S>>,
}

// Manual impl: a derive would require `U: Clone, S: Clone`.
impl<U, S> Clone for ApiState<U, S> {
  fn clone(&self) -> Self {
    Self { schedule: Arc::clone(&self.schedule) }
  }
}

impl<U, S> ApiState<U, S>
where
  U: Upstream + 'static,
  S: EventStore + 'static,
{
  pub fn store(&self) -> &Arc<S> { self.schedule.reconciler().store() }
}

/// Build the API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<U, S>(schedule: Arc<Schedule<U, S>>) -> Router<()>
where
  U: Upstream + 'static,
  S: EventStore + 'static,
{
  Router::new()
    .route("/events", get(events::list::<U, S>))
    .route("/assets/{id}", get(assets::get_one::<U, S>))
    .route("/schedule", get(schedule::show::<U, S>))
    .route("/schedule/enable", post(schedule::enable::<U, S>))
    .route("/schedule/disable", post(schedule::disable::<U, S>))
    .route("/sync", post(sync::run::<U, S>))
    .route("/sync/status", get(sync::status::<U, S>))
    .with_state(ApiState { schedule })
}
