//! Event envelope as delivered by the host.
//!
//! Events are pure data: provenance plus an optional JSON payload.
//! They carry no routing or accumulation logic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Separator between stream name and version in an event id (`odd@3`).
pub const STREAM_VERSION_SEPARATOR: char = '@';

/// A single event read from one of the subscribed streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub stream: String,
    pub event_type: String,
    /// Version inside `stream`, starting at 0.
    pub version: u64,
    /// Global commit position across all streams.
    pub position: u64,
    /// `None` models an event without a payload.
    #[serde(default)]
    pub data: Option<Value>,
}

impl EventEnvelope {
    pub fn new(
        stream: impl Into<String>,
        event_type: impl Into<String>,
        version: u64,
        position: u64,
        data: Option<Value>,
    ) -> Self {
        Self {
            stream: stream.into(),
            event_type: event_type.into(),
            version,
            position,
            data,
        }
    }

    /// `<stream>@<version>`, the reference a link stores.
    pub fn event_id(&self) -> String {
        format!("{}{}{}", self.stream, STREAM_VERSION_SEPARATOR, self.version)
    }

    /// Convert to a serde_json::Value in fixture layout.
    pub fn to_dict(&self) -> Value {
        serde_json::json!({
            "stream": self.stream,
            "type": self.event_type,
            "version": self.version,
            "position": self.position,
            "data": self.data,
        })
    }

    /// Parse an envelope from fixture layout.
    ///
    /// Lenient on provenance (missing fields default) and faithful on the
    /// payload: a missing or `null` `data` stays `None` so the reducer can
    /// report it.
    pub fn from_value(v: &Value) -> Self {
        Self {
            stream: v["stream"].as_str().unwrap_or("").to_string(),
            event_type: v["type"].as_str().unwrap_or("").to_string(),
            version: v["version"].as_u64().unwrap_or(0),
            position: v["position"].as_u64().unwrap_or(0),
            data: match v.get("data") {
                None | Some(Value::Null) => None,
                Some(d) => Some(d.clone()),
            },
        }
    }
}

/// Split an event id into `(stream, version)`.
///
/// Stream names may themselves contain the separator, so the split is on
/// the last occurrence.
pub fn parse_event_id(id: &str) -> Option<(&str, u64)> {
    let (stream, version) = id.rsplit_once(STREAM_VERSION_SEPARATOR)?;
    if stream.is_empty() {
        return None;
    }
    version.parse().ok().map(|v| (stream, v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_id_format() {
        let e = EventEnvelope::new("odd", "person", 3, 17, None);
        assert_eq!(e.event_id(), "odd@3");
    }

    #[test]
    fn test_from_value_keeps_missing_data_as_none() {
        let v = json!({"stream": "even", "type": "person", "version": 1, "position": 4});
        let e = EventEnvelope::from_value(&v);
        assert_eq!(e.stream, "even");
        assert_eq!(e.position, 4);
        assert!(e.data.is_none());

        let v = json!({"stream": "even", "data": null});
        assert!(EventEnvelope::from_value(&v).data.is_none());
    }

    #[test]
    fn test_to_dict_then_from_value() {
        let e = EventEnvelope::new("odd", "person", 2, 9, Some(json!({"age": 7})));
        assert_eq!(EventEnvelope::from_value(&e.to_dict()), e);
    }

    #[test]
    fn test_parse_event_id() {
        assert_eq!(parse_event_id("odd@3"), Some(("odd", 3)));
        assert_eq!(parse_event_id("a@b@12"), Some(("a@b", 12)));
        assert_eq!(parse_event_id("odd"), None);
        assert_eq!(parse_event_id("@1"), None);
        assert_eq!(parse_event_id("odd@x"), None);
    }
}
