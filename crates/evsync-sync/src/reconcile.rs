//! The reconciler: one full sync cycle from upstream to local store.
//!
//! ```text
//! Idle → FetchingOrg → FetchingEvents → Enriching → Replacing → Idle
//!           └──────────────┴───────────────┴──→ Failed → Idle
//! ```
//!
//! Nothing destructive happens before `Replacing`: every event is enriched
//! and every cover image stored while the previous record set is still in
//! place. `Replacing` hands the whole batch to [`EventStore::replace_all`],
//! which purges old records, inserts the new batch and releases every asset
//! the batch does not reference.

use std::{
  sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use chrono::{DateTime, Utc};
use evsync_client::{Endpoints, Upstream, requests};
use evsync_core::{
  derive::build_record,
  record::{AssetRef, EventRecord},
  store::{EventStore, ReplaceSummary},
  upstream::UpstreamEvent,
};
use serde::Serialize;
use tokio::{sync::Semaphore, task::JoinSet};

use crate::{
  Error, Result,
  enrich::{PreparedEvent, prepare_event},
};

// ─── Options ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SyncOptions {
  /// Events enriched at the same time.
  pub concurrency:    usize,
  /// Budget for fetching and enriching; the store is untouched on expiry.
  pub cycle_deadline: Duration,
}

impl Default for SyncOptions {
  fn default() -> Self {
    Self {
      concurrency:    4,
      cycle_deadline: Duration::from_secs(600),
    }
  }
}

// ─── State and reports ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
  #[default]
  Idle,
  FetchingOrg,
  FetchingEvents,
  Enriching,
  /// Purge and insert, as one store transaction.
  Replacing,
  Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
  Completed {
    /// Events listed upstream.
    fetched:         usize,
    inserted:        usize,
    /// Events dropped because their times could not be derived.
    skipped:         usize,
    purged:          usize,
    released_assets: usize,
  },
  /// The cycle stopped before replacing anything.
  Aborted { reason: String },
  /// Another cycle was already running.
  Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
  pub started_at:  DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  #[serde(flatten)]
  pub outcome:     CycleOutcome,
}

impl CycleReport {
  pub fn is_completed(&self) -> bool {
    matches!(self.outcome, CycleOutcome::Completed { .. })
  }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncStatus {
  pub state:      CycleState,
  /// The last cycle that actually ran (skipped cycles are not recorded).
  pub last_cycle: Option<CycleReport>,
}

// ─── Reconciler ──────────────────────────────────────────────────────────────

pub struct Reconciler<U, S> {
  upstream:  Arc<U>,
  store:     Arc<S>,
  endpoints: Endpoints,
  options:   SyncOptions,
  /// Held for the whole cycle; cycles never overlap.
  cycle:     tokio::sync::Mutex<()>,
  /// Set while `cycle` is held. Lets observers check without touching the
  /// lock.
  running:   AtomicBool,
  status:    Mutex<SyncStatus>,
}

impl<U, S> Reconciler<U, S>
where
  U: Upstream + 'static,
  S: EventStore + 'static,
{
  pub fn new(
    upstream: Arc<U>,
    store: Arc<S>,
    endpoints: Endpoints,
    options: SyncOptions,
  ) -> Self {
    Self {
      upstream,
      store,
      endpoints,
      options,
      cycle: tokio::sync::Mutex::new(()),
      running: AtomicBool::new(false),
      status: Mutex::new(SyncStatus::default()),
    }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn upstream(&self) -> &Arc<U> { &self.upstream }

  pub fn status(&self) -> SyncStatus {
    self.status.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  pub fn is_running(&self) -> bool { self.running.load(Ordering::Acquire) }

  fn set_state(&self, state: CycleState) {
    self.status.lock().unwrap_or_else(PoisonError::into_inner).state = state;
  }

  /// Run one cycle to completion. Returns immediately with
  /// [`CycleOutcome::Skipped`] if a cycle is already running.
  pub async fn run_sync_cycle(&self) -> CycleReport {
    let started_at = Utc::now();

    let Ok(_guard) = self.cycle.try_lock() else {
      tracing::info!("sync cycle already in progress; skipping");
      return CycleReport {
        started_at,
        finished_at: Utc::now(),
        outcome: CycleOutcome::Skipped,
      };
    };
    let _running = RunningFlag::raise(&self.running);

    tracing::info!("sync cycle started");
    let outcome = match self.cycle_inner().await {
      Ok(outcome) => {
        tracing::info!(?outcome, "sync cycle completed");
        outcome
      }
      Err(e) => {
        self.set_state(CycleState::Failed);
        tracing::warn!(error = %e, "sync cycle aborted; local records left untouched");
        CycleOutcome::Aborted { reason: e.to_string() }
      }
    };

    let report = CycleReport { started_at, finished_at: Utc::now(), outcome };
    {
      let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
      status.state = CycleState::Idle;
      status.last_cycle = Some(report.clone());
    }
    report
  }

  async fn cycle_inner(&self) -> Result<CycleOutcome> {
    // Covers stored during this cycle; released again if it fails.
    let staged: Arc<Mutex<Vec<AssetRef>>> = Arc::default();

    let deadline = self.options.cycle_deadline;
    let fetched = tokio::time::timeout(deadline, self.fetch_and_prepare(&staged)).await;
    let prepared = match fetched {
      Ok(Ok(prepared)) => prepared,
      Ok(Err(e)) => {
        self.release_staged(&staged).await;
        return Err(e);
      }
      Err(_) => {
        self.release_staged(&staged).await;
        return Err(Error::DeadlineExceeded(deadline));
      }
    };

    let fetched = prepared.len();
    let records = build_records(prepared);
    let skipped = fetched - records.len();

    self.set_state(CycleState::Replacing);
    let summary: ReplaceSummary = match self.store.replace_all(records).await {
      Ok(summary) => summary,
      Err(e) => {
        self.release_staged(&staged).await;
        return Err(Error::Store(Box::new(e)));
      }
    };

    Ok(CycleOutcome::Completed {
      fetched,
      inserted: summary.inserted,
      skipped,
      purged: summary.purged,
      released_assets: summary.released_assets,
    })
  }

  async fn fetch_and_prepare(
    &self,
    staged: &Arc<Mutex<Vec<AssetRef>>>,
  ) -> Result<Vec<PreparedEvent>> {
    self.set_state(CycleState::FetchingOrg);
    let organization = requests::my_organizations(&*self.upstream, &self.endpoints)
      .await?
      .into_iter()
      .next()
      .ok_or(Error::NoOrganization)?;

    self.set_state(CycleState::FetchingEvents);
    let events =
      requests::organization_events(&*self.upstream, &self.endpoints, &organization.id)
        .await?;
    tracing::info!(org_id = %organization.id, count = events.len(), "fetched event list");

    self.set_state(CycleState::Enriching);
    self.prepare_all(events, staged).await
  }

  /// Enrich every event, at most `concurrency` at a time. Output keeps the
  /// upstream order.
  async fn prepare_all(
    &self,
    events: Vec<UpstreamEvent>,
    staged: &Arc<Mutex<Vec<AssetRef>>>,
  ) -> Result<Vec<PreparedEvent>> {
    let total = events.len();
    let permits = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, event) in events.into_iter().enumerate() {
      let upstream = Arc::clone(&self.upstream);
      let store = Arc::clone(&self.store);
      let endpoints = self.endpoints.clone();
      let permits = Arc::clone(&permits);
      let staged = Arc::clone(staged);

      tasks.spawn(async move {
        let _permit = permits.acquire_owned().await;
        let prepared = prepare_event(&*upstream, &*store, &endpoints, event).await;
        if let Some(cover) = prepared.cover {
          staged.lock().unwrap_or_else(PoisonError::into_inner).push(cover);
        }
        (index, prepared)
      });
    }

    let mut done = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
      done.push(joined?);
    }
    done.sort_by_key(|(index, _)| *index);
    Ok(done.into_iter().map(|(_, prepared)| prepared).collect())
  }

  async fn release(&self, asset: AssetRef) {
    if let Err(e) = self.store.release_asset(asset).await {
      tracing::warn!(%asset, error = %e, "failed to release asset");
    }
  }

  async fn release_staged(&self, staged: &Mutex<Vec<AssetRef>>) {
    let assets = std::mem::take(&mut *staged.lock().unwrap_or_else(PoisonError::into_inner));
    for asset in assets {
      self.release(asset).await;
    }
  }
}

/// Clears the running flag when the cycle ends, including by cancellation.
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
  fn raise(flag: &'a AtomicBool) -> Self {
    flag.store(true, Ordering::Release);
    Self(flag)
  }
}

impl Drop for RunningFlag<'_> {
  fn drop(&mut self) { self.0.store(false, Ordering::Release); }
}

/// Derive records for every prepared event. Events whose fields cannot be
/// derived are dropped; their covers are left unreferenced for
/// `replace_all` to collect.
fn build_records(prepared: Vec<PreparedEvent>) -> Vec<EventRecord> {
  let mut records = Vec::with_capacity(prepared.len());

  for PreparedEvent { event, cover } in prepared {
    match build_record(&event, cover) {
      Ok(record) => records.push(record),
      Err(e) => tracing::warn!(event_id = %event.id, error = %e, "skipping event"),
    }
  }

  records
}
