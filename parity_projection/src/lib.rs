#![forbid(unsafe_code)]

//! Parity projection kernel.
//!
//! Pure, I/O-free implementation of the parity-partitioning accumulator:
//! it folds events from the `odd` and `even` streams into a running total
//! and routes each event to a link in the `even` or `odd` partition.
//!
//! Everything a hosting engine owns (storage, delivery order, persistence)
//! stays behind the [`host::LinkSink`] seam.

/// Projection v1. Changing the reducer's observable behaviour requires v2.
pub const PROJECTION_VERSION: u32 = 1;

pub mod arithmetic;
pub mod definition;
pub mod domain;
pub mod engine;
pub mod error;
pub mod events;
pub mod hashing;
pub mod host;
pub mod state;
pub mod transitions;

pub use definition::{ProjectionDefinition, ProjectionOptions};
pub use domain::{AccumulationMode, Link, Parity, ProjectionState};
pub use engine::{ParityProjection, Routed};
pub use error::{DefinitionError, PayloadDefect, ProjectionFault};
pub use events::EventEnvelope;
pub use host::LinkSink;
