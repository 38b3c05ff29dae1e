//! Handlers for `/schedule`: arm and disarm the periodic sync.

use axum::{Json, extract::State};
use evsync_client::Upstream;
use evsync_core::store::EventStore;
use serde::Serialize;

use crate::ApiState;

#[derive(Debug, Serialize)]
pub struct ScheduleView {
  pub armed:         bool,
  pub interval_secs: u64,
  /// Whether the request changed anything; absent on `GET`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub changed:       Option<bool>,
}

fn view<U, S>(state: &ApiState<U, S>, changed: Option<bool>) -> ScheduleView
where
  U: Upstream + 'static,
  S: EventStore + 'static,
{
  ScheduleView {
    armed: state.schedule.is_armed(),
    interval_secs: state.schedule.interval().as_secs(),
    changed,
  }
}

/// `GET /schedule`
pub async fn show<U, S>(State(state): State<ApiState<U, S>>) -> Json<ScheduleView>
where
  U: Upstream + 'static,
  S: EventStore + 'static,
{
  Json(view(&state, None))
}

/// `POST /schedule/enable`
pub async fn enable<U, S>(State(state): State<ApiState<U, S>>) -> Json<ScheduleView>
where
  U: Upstream + 'static,
  S: EventStore + 'static,
{
  let changed = state.schedule.enable();
  Json(view(&state, Some(changed)))
}

/// `POST /schedule/disable`
pub async fn disable<U, S>(State(state): State<ApiState<U, S>>) -> Json<ScheduleView>
where
  U: Upstream + 'static,
  S: EventStore + 'static,
{
  let changed = state.schedule.disable();
  Json(view(&state, Some(changed)))
}
