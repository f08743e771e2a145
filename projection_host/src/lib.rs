#![forbid(unsafe_code)]

//! Reference host for the parity projection.
//!
//! Supplies what the kernel leaves to its hosting engine: a stream store
//! with link records, an append-only journal, the subscription driver
//! that feeds events to the projection, replay, and configuration.
//!
//! No routing or accumulation logic lives here; all of it is delegated
//! to `parity_projection`.

pub mod batch;
pub mod config;
pub mod error;
pub mod event_store;
pub mod journal;
pub mod record;
pub mod replay;
pub mod session;

pub use batch::{run_batch, InputEvent};
pub use error::HostError;
