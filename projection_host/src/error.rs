//! Host-side errors.

use std::io;

use parity_projection::{DefinitionError, ProjectionFault};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("record encoding error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("invalid projection definition: {0}")]
    Definition(#[from] DefinitionError),

    #[error("corrupt journal at byte {offset}: {reason}")]
    CorruptJournal { offset: u64, reason: String },

    #[error("stream name must not be empty")]
    EmptyStreamName,

    #[error("event {stream}@{version} not found")]
    VersionNotFound { stream: String, version: u64 },

    #[error("link record {0} does not reference a valid event id")]
    MalformedLink(String),

    #[error("projection fault at position {position}: {fault}")]
    EventFault {
        position: u64,
        #[source]
        fault: ProjectionFault,
    },

    #[error(transparent)]
    Fault(#[from] ProjectionFault),

    #[error("determinism failure: replays produced {first} and {second}")]
    Nondeterministic { first: String, second: String },
}
