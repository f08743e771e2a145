//! Fault types surfaced to the host.
//!
//! The reducer never recovers locally. Every fault carries the id of the
//! event that caused it so the host can apply its own failure policy.

use thiserror::Error;

/// Faults raised while processing a single event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionFault {
    /// The event payload cannot be read as `{ data: { age: <integer> } }`.
    #[error("invalid payload in {event_id}: {defect}")]
    InvalidPayload {
        event_id: String,
        defect: PayloadDefect,
    },

    /// The running total no longer fits in an i64.
    #[error("running total overflow in {event_id}: {total} + {age}")]
    Overflow {
        event_id: String,
        total: i64,
        age: i64,
    },

    /// `on_event` was called before `initialize`.
    #[error("projection not initialised, call initialize() first")]
    NotInitialized,
}

/// What exactly is wrong with an event payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadDefect {
    #[error("event has no data")]
    MissingData,

    #[error("data is not an object")]
    DataNotObject,

    #[error("data has no `age` field")]
    MissingAge,

    #[error("`age` is not numeric: {0}")]
    NonNumericAge(String),

    #[error("`age` is not an integer: {0}")]
    FractionalAge(String),

    #[error("`age` is outside the i64 range: {0}")]
    AgeOutOfRange(String),
}

/// Problems with a projection definition, caught before any event is seen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("projection name must not be empty")]
    EmptyName,

    #[error("projection must subscribe to at least one stream")]
    NoSourceStreams,

    #[error("source stream names must not be empty")]
    EmptyStreamName,

    #[error("source stream {0:?} is listed more than once")]
    DuplicateStream(String),
}
