//! Batch runner: append a list of input events and run one session.
//!
//! This is everything the `parity-projection` binary does besides
//! argument parsing and printing.

use parity_projection::domain::ProjectionState;
use parity_projection::hashing::canonical_hash;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::HostConfig;
use crate::error::HostError;
use crate::event_store::EventStore;
use crate::session::{ProjectionSession, RunSummary};

/// One entry of an events file: `{"stream": .., "type": .., "data": ..}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InputEvent {
    pub stream: String,
    #[serde(rename = "type", default = "default_event_type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Option<Value>,
}

fn default_event_type() -> String {
    "event".to_string()
}

/// Parse an events file (a JSON array of [`InputEvent`]).
pub fn parse_inputs(raw: &str) -> Result<Vec<InputEvent>, HostError> {
    Ok(serde_json::from_str(raw)?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub state: ProjectionState,
    pub hash: String,
    pub summary: RunSummary,
}

/// Open the configured store, append `inputs` and deliver everything new.
///
/// Over a journal, repeated batches resume where the previous one stopped.
pub fn run_batch(config: &HostConfig, inputs: Vec<InputEvent>) -> Result<BatchOutcome, HostError> {
    let store = match &config.journal {
        Some(path) => EventStore::open(path)?,
        None => EventStore::in_memory(),
    };
    let mut session =
        ProjectionSession::new(store, config.projection.clone(), config.fault_policy)?;

    let appended = inputs.len();
    for input in inputs {
        session
            .store_mut()
            .append(&input.stream, &input.event_type, input.data)?;
    }
    info!(appended, records = session.store().len(), "events appended");

    let summary = session.run()?;
    let state = session.state()?.clone();
    let hash = canonical_hash(&state);
    Ok(BatchOutcome {
        state,
        hash,
        summary,
    })
}
