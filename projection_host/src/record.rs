//! Stored event records and link records.
//!
//! A link is an ordinary record in the target stream whose type is
//! [`LINK_TYPE`] and whose data is the id (`stream@version`) of the event
//! it points at. The linked payload is never copied.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use parity_projection::events::{parse_event_id, STREAM_VERSION_SEPARATOR};
use parity_projection::EventEnvelope;

/// Prefix reserved for host bookkeeping types.
pub const SYSTEM_PREFIX: &str = "_";
/// Record type of a link.
pub const LINK_TYPE: &str = "_>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub stream: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub version: u64,
    pub position: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl EventRecord {
    pub fn event_id(&self) -> String {
        format!("{}{}{}", self.stream, STREAM_VERSION_SEPARATOR, self.version)
    }

    pub fn is_link(&self) -> bool {
        self.event_type == LINK_TYPE
    }

    pub fn is_system(&self) -> bool {
        self.event_type.starts_with(SYSTEM_PREFIX)
    }

    /// `(stream, version)` a link record points at; `None` for plain
    /// records or a malformed link body.
    pub fn link_target(&self) -> Option<(&str, u64)> {
        if !self.is_link() {
            return None;
        }
        self.data.as_ref()?.as_str().and_then(parse_event_id)
    }

    /// View handed to the projection.
    pub fn to_envelope(&self) -> EventEnvelope {
        EventEnvelope::new(
            self.stream.clone(),
            self.event_type.clone(),
            self.version,
            self.position,
            self.data.clone(),
        )
    }
}
