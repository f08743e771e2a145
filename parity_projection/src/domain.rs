//! Core domain types.
//!
//! Pure data. No behaviour beyond small accessors.
//! All numeric values: i64, no float.

use serde::{Deserialize, Serialize};

use crate::events::EventEnvelope;

/// Output stream for events with an odd `age`.
pub const ODD_STREAM: &str = "odd";
/// Output stream for events with an even `age`.
pub const EVEN_STREAM: &str = "even";

// ── Partitioning ───────────────────────────────────────────────────

/// Which output partition an event is linked into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    Odd,
    Even,
}

impl Parity {
    /// `age % 2 == 0` is even, everything else (negative odd numbers
    /// included) is odd.
    pub fn of(age: i64) -> Self {
        if age % 2 == 0 {
            Parity::Even
        } else {
            Parity::Odd
        }
    }

    pub fn stream_name(self) -> &'static str {
        match self {
            Parity::Odd => ODD_STREAM,
            Parity::Even => EVEN_STREAM,
        }
    }
}

/// How the running total is folded into state.
///
/// `SourceFaithful` reproduces the original definition: only `sum` moves,
/// `oddSum` and `evenSum` stay at the zero they were initialised with.
/// `PerParity` additionally adds each age to the field matching its parity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulationMode {
    #[default]
    SourceFaithful,
    PerParity,
}

// ── State ──────────────────────────────────────────────────────────

/// Per-projection state, owned by the host and injected into the reducer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectionState {
    pub odd_sum: i64,
    pub even_sum: i64,
    /// Running total. Absent until the first event is folded in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<i64>,
}

impl ProjectionState {
    /// Running total, reading an absent `sum` as zero.
    pub fn running_total(&self) -> i64 {
        self.sum.unwrap_or(0)
    }
}

// ── Links ──────────────────────────────────────────────────────────

/// A reference from a partition stream to the event it indexes.
///
/// Only provenance is kept; the payload is never copied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub target: String,
    pub source_stream: String,
    pub source_version: u64,
    pub source_position: u64,
}

impl Link {
    pub fn new(target: impl Into<String>, event: &EventEnvelope) -> Self {
        Self {
            target: target.into(),
            source_stream: event.stream.clone(),
            source_version: event.version,
            source_position: event.position,
        }
    }

    /// Id of the linked event, `<stream>@<version>`.
    pub fn source_id(&self) -> String {
        format!(
            "{}{}{}",
            self.source_stream,
            crate::events::STREAM_VERSION_SEPARATOR,
            self.source_version
        )
    }
}
