//! Core types and trait definitions for evsync.
//!
//! This crate is free of HTTP and database dependencies. It holds the
//! upstream event model, the derivation rules that turn an upstream event into
//! a local [`record::EventRecord`], and the [`store::EventStore`] port that
//! storage backends implement.

// Native `async fn` in traits; futures are declared `Send` explicitly.
#![allow(async_fn_in_trait)]

pub mod derive;
pub mod error;
pub mod record;
pub mod store;
pub mod upstream;

pub use error::{Error, Result};
