//! Periodic sync: a background task that runs a cycle on a fixed interval.

use std::{
  sync::{Arc, Mutex, PoisonError},
  time::Duration,
};

use evsync_client::Upstream;
use evsync_core::store::EventStore;
use tokio::{
  sync::oneshot,
  task::JoinHandle,
  time::{MissedTickBehavior, interval},
};

use crate::Reconciler;

struct Armed {
  stop:   oneshot::Sender<()>,
  handle: JoinHandle<()>,
}

/// Arms and disarms the periodic sync task. At most one task is armed.
pub struct Schedule<U, S> {
  reconciler: Arc<Reconciler<U, S>>,
  interval:   Duration,
  armed:      Mutex<Option<Armed>>,
}

impl<U, S> Schedule<U, S>
where
  U: Upstream + 'static,
  S: EventStore + 'static,
{
  pub fn new(reconciler: Arc<Reconciler<U, S>>, interval: Duration) -> Self {
    Self {
      reconciler,
      interval: interval.max(Duration::from_millis(1)),
      armed: Mutex::new(None),
    }
  }

  pub fn reconciler(&self) -> &Arc<Reconciler<U, S>> { &self.reconciler }

  pub fn interval(&self) -> Duration { self.interval }

  pub fn is_armed(&self) -> bool {
    self
      .armed
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .as_ref()
      .is_some_and(|a| !a.handle.is_finished())
  }

  /// Arm the periodic task. The first cycle starts immediately. Returns
  /// `false` if the task was already armed.
  ///
  /// Must be called from within a Tokio runtime.
  pub fn enable(&self) -> bool {
    let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
    if armed.as_ref().is_some_and(|a| !a.handle.is_finished()) {
      return false;
    }

    let (stop, mut stopped) = oneshot::channel();
    let reconciler = Arc::clone(&self.reconciler);
    let period = self.interval;

    let handle = tokio::spawn(async move {
      let mut timer = interval(period);
      timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

      loop {
        // A running cycle is never interrupted; the stop signal is seen
        // before the next tick.
        tokio::select! {
          _ = &mut stopped => break,
          _ = timer.tick() => {
            let report = reconciler.run_sync_cycle().await;
            tracing::debug!(outcome = ?report.outcome, "scheduled cycle finished");
          }
        }
      }
      tracing::info!("periodic sync stopped");
    });

    tracing::info!(interval = ?period, "periodic sync armed");
    *armed = Some(Armed { stop, handle });
    true
  }

  /// Disarm the periodic task. Returns `false` if nothing was armed. A
  /// cycle in progress runs to completion.
  pub fn disable(&self) -> bool {
    let taken = self.armed.lock().unwrap_or_else(PoisonError::into_inner).take();
    match taken {
      Some(Armed { stop, handle }) => {
        let was_running = !handle.is_finished();
        // The receiver is gone only if the task already ended.
        let _ = stop.send(());
        was_running
      }
      None => false,
    }
  }
}

impl<U, S> Drop for Schedule<U, S> {
  fn drop(&mut self) {
    let armed = self.armed.get_mut().unwrap_or_else(PoisonError::into_inner);
    if let Some(Armed { stop, .. }) = armed.take() {
      let _ = stop.send(());
    }
  }
}
