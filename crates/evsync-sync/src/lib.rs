//! The synchronization pipeline.
//!
//! A [`Reconciler`] runs one cycle: resolve the organization, list its
//! events, enrich each one, derive presentation fields and replace the local
//! record set. A [`Schedule`] arms or disarms a background task that runs a
//! cycle on a fixed interval.

pub mod enrich;
pub mod error;
pub mod reconcile;
pub mod schedule;

pub use error::{Error, Result};
pub use reconcile::{
  CycleOutcome, CycleReport, CycleState, Reconciler, SyncOptions, SyncStatus,
};
pub use schedule::Schedule;
