//! Stream store.
//!
//! A single global log of records (index = position) plus a per-stream
//! index of positions (index = version). Optionally backed by a
//! [`Journal`]; the journal is written before the in-memory index so a
//! failed write leaves the store unchanged.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::HostError;
use crate::journal::Journal;
use crate::record::{EventRecord, LINK_TYPE};

#[derive(Debug, Default)]
pub struct EventStore {
    records: Vec<EventRecord>,
    streams: BTreeMap<String, Vec<u64>>,
    journal: Option<Journal>,
}

impl EventStore {
    /// Store without a journal.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open or create a journal-backed store and rebuild its index.
    pub fn open(path: &Path) -> Result<Self, HostError> {
        let (journal, records) = Journal::open(path)?;
        let mut store = Self::default();
        for record in records {
            store.index(record)?;
        }
        info!(
            journal = %path.display(),
            records = store.records.len(),
            streams = store.streams.len(),
            "event store opened"
        );
        store.journal = Some(journal);
        Ok(store)
    }

    /// Append a record to `stream`, assigning its version and position.
    pub fn append(
        &mut self,
        stream: &str,
        event_type: &str,
        data: Option<Value>,
    ) -> Result<EventRecord, HostError> {
        if stream.is_empty() {
            return Err(HostError::EmptyStreamName);
        }
        let record = EventRecord {
            stream: stream.to_string(),
            event_type: event_type.to_string(),
            version: self.next_version(stream),
            position: self.records.len() as u64,
            data,
        };
        if let Some(journal) = self.journal.as_mut() {
            journal.append(&record)?;
        }
        self.index(record.clone())?;
        debug!(event = %record.event_id(), position = record.position, "record appended");
        Ok(record)
    }

    /// Append a link in `target` to `event`. A link to a link points at
    /// the original event, so links never chain.
    pub fn link_to(&mut self, target: &str, event: &EventRecord) -> Result<EventRecord, HostError> {
        let id = self.resolve(event)?.event_id();
        self.append(target, LINK_TYPE, Some(Value::String(id)))
    }

    /// Copy `event`'s type and payload into a new record of `target`.
    pub fn emit(&mut self, target: &str, event: &EventRecord) -> Result<EventRecord, HostError> {
        let original = self.resolve(event)?;
        let event_type = original.event_type.clone();
        let data = original.data.clone();
        self.append(target, &event_type, data)
    }

    /// Record at `stream@version`.
    pub fn get(&self, stream: &str, version: u64) -> Result<&EventRecord, HostError> {
        self.streams
            .get(stream)
            .and_then(|positions| positions.get(version as usize))
            .and_then(|&p| self.records.get(p as usize))
            .ok_or_else(|| HostError::VersionNotFound {
                stream: stream.to_string(),
                version,
            })
    }

    /// Follow a link record to the event it references; plain records
    /// resolve to themselves.
    pub fn resolve<'a>(&'a self, record: &'a EventRecord) -> Result<&'a EventRecord, HostError> {
        if !record.is_link() {
            return Ok(record);
        }
        let (stream, version) = record
            .link_target()
            .ok_or_else(|| HostError::MalformedLink(record.event_id()))?;
        self.get(stream, version)
    }

    /// Raw records of `stream` in version order; unknown streams are empty.
    pub fn read_stream(&self, stream: &str) -> Vec<EventRecord> {
        self.positions(stream)
            .iter()
            .filter_map(|&p| self.records.get(p as usize))
            .cloned()
            .collect()
    }

    /// Records of `stream` with links replaced by the events they reference.
    pub fn read_stream_resolved(&self, stream: &str) -> Result<Vec<EventRecord>, HostError> {
        self.positions(stream)
            .iter()
            .filter_map(|&p| self.records.get(p as usize))
            .map(|r| self.resolve(r).cloned())
            .collect()
    }

    /// Raw records of several streams merged into global position order.
    /// Repeated names are read once.
    pub fn zip_streams<S: AsRef<str>>(&self, streams: &[S]) -> Result<Vec<EventRecord>, HostError> {
        let mut positions = BTreeSet::new();
        for stream in streams {
            let stream = stream.as_ref();
            if stream.is_empty() {
                return Err(HostError::EmptyStreamName);
            }
            positions.extend(self.positions(stream).iter().copied());
        }
        Ok(positions
            .into_iter()
            .filter_map(|p| self.records.get(p as usize))
            .cloned()
            .collect())
    }

    /// Current version of `stream`, `None` if it has no records.
    pub fn version(&self, stream: &str) -> Option<u64> {
        self.positions(stream).len().checked_sub(1).map(|v| v as u64)
    }

    pub fn stream_names(&self) -> impl Iterator<Item = &str> {
        self.streams.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last_position(&self) -> Option<u64> {
        self.records.last().map(|r| r.position)
    }

    fn positions(&self, stream: &str) -> &[u64] {
        self.streams.get(stream).map(Vec::as_slice).unwrap_or(&[])
    }

    fn next_version(&self, stream: &str) -> u64 {
        self.positions(stream).len() as u64
    }

    /// Add a record to the in-memory index, checking it sits exactly at
    /// the next position and the next version of its stream.
    fn index(&mut self, record: EventRecord) -> Result<(), HostError> {
        let expected_position = self.records.len() as u64;
        let expected_version = self.next_version(&record.stream);
        if record.position != expected_position || record.version != expected_version {
            return Err(HostError::CorruptJournal {
                offset: expected_position,
                reason: format!(
                    "record {} at position {} breaks ordering, expected version {} at position {}",
                    record.event_id(),
                    record.position,
                    expected_version,
                    expected_position
                ),
            });
        }
        self.streams
            .entry(record.stream.clone())
            .or_default()
            .push(record.position);
        self.records.push(record);
        Ok(())
    }
}
