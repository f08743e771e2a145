//! Projection session: the subscription driver.
//!
//! A session owns a store and one projection. Each `run`:
//!   1. reads the source streams merged in global position order
//!   2. drops link records (host bookkeeping, never re-delivered)
//!      and everything at or before the last delivered position
//!   3. hands each event to the projection, one at a time
//!   4. persists the link the projection asked for, then commits the
//!      event's state
//!   5. applies the fault policy when the projection faults
//!
//! A failed link write leaves both the projection and the position
//! untouched, so the next run retries the event from scratch.
//!
//! Link records in the `odd`/`even` partitions double as the checkpoint:
//! a new session over an existing store resumes after the last source
//! event that already has a link.

use parity_projection::domain::{Parity, ProjectionState};
use parity_projection::hashing::canonical_hash;
use parity_projection::{ParityProjection, ProjectionDefinition, ProjectionFault};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::FaultPolicy;
use crate::error::HostError;
use crate::event_store::EventStore;
use crate::record::EventRecord;

/// Outcome of a single `run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub delivered: u64,
    pub linked_odd: u64,
    pub linked_even: u64,
    pub filtered: u64,
    pub skipped: u64,
}

impl RunSummary {
    pub fn linked(&self) -> u64 {
        self.linked_odd + self.linked_even
    }
}

#[derive(Debug)]
pub struct ProjectionSession {
    store: EventStore,
    projection: ParityProjection,
    fault_policy: FaultPolicy,
    last_position: Option<u64>,
}

impl ProjectionSession {
    /// Validate the definition and start the projection from zero.
    pub fn new(
        store: EventStore,
        definition: ProjectionDefinition,
        fault_policy: FaultPolicy,
    ) -> Result<Self, HostError> {
        Self::with_projection(store, ParityProjection::new(definition), fault_policy)
    }

    /// Like [`ProjectionSession::new`] for a pre-built projection, e.g. one
    /// carrying an event filter or restored state.
    ///
    /// If the store already holds links from an earlier session, delivery
    /// resumes after the last linked event. A fresh projection is first
    /// caught up by folding every event up to that point without writing
    /// links; a projection that is already initialised is taken to hold
    /// that state already.
    pub fn with_projection(
        store: EventStore,
        projection: ParityProjection,
        fault_policy: FaultPolicy,
    ) -> Result<Self, HostError> {
        projection.definition().validate()?;
        let checkpoint = linked_checkpoint(&store)?;

        let mut session = Self {
            store,
            projection,
            fault_policy,
            last_position: None,
        };
        if !session.projection.is_initialized() {
            session.projection.initialize();
            if let Some(through) = checkpoint {
                session.catch_up(through)?;
            }
        }
        session.last_position = checkpoint;

        info!(
            projection = %session.projection.definition().name,
            options = ?session.projection.options(),
            streams = ?session.projection.definition().source_streams,
            resume_after = ?checkpoint,
            "session started"
        );
        Ok(session)
    }

    /// Deliver every event that arrived since the previous run.
    pub fn run(&mut self) -> Result<RunSummary, HostError> {
        let mut summary = RunSummary::default();
        for record in self.pending(self.last_position)? {
            let envelope = record.to_envelope();

            match self.projection.route(&envelope) {
                Ok(Some(routed)) => {
                    self.store.link_to(&routed.link().target, &record)?;
                    let link = self.projection.commit(routed);
                    summary.delivered += 1;
                    if link.target == Parity::Odd.stream_name() {
                        summary.linked_odd += 1;
                    } else {
                        summary.linked_even += 1;
                    }
                }
                Ok(None) => summary.filtered += 1,
                Err(fault) => match self.fault_policy {
                    FaultPolicy::Halt => {
                        return Err(HostError::EventFault {
                            position: record.position,
                            fault,
                        })
                    }
                    FaultPolicy::Skip => {
                        warn!(
                            event = %record.event_id(),
                            position = record.position,
                            error = %fault,
                            "skipping event the projection rejected"
                        );
                        summary.skipped += 1;
                    }
                },
            }
            self.last_position = Some(record.position);
        }

        info!(
            delivered = summary.delivered,
            linked = summary.linked(),
            filtered = summary.filtered,
            skipped = summary.skipped,
            "run complete"
        );
        Ok(summary)
    }

    /// Source events after `after`, link records excluded.
    fn pending(&self, after: Option<u64>) -> Result<Vec<EventRecord>, HostError> {
        Ok(self
            .store
            .zip_streams(self.projection.definition().source_streams.as_slice())?
            .into_iter()
            .filter(|r| !r.is_link())
            .filter(|r| after.map_or(true, |last| r.position > last))
            .collect())
    }

    /// Rebuild state from events an earlier session already linked.
    /// Their links exist, so none are written. Events that fault here
    /// were skipped by that session and are skipped again.
    fn catch_up(&mut self, through: u64) -> Result<(), HostError> {
        let mut folded = 0u64;
        for record in self.pending(None)? {
            if record.position > through {
                break;
            }
            match self.projection.route(&record.to_envelope()) {
                Ok(Some(routed)) => {
                    self.projection.commit(routed);
                    folded += 1;
                }
                Ok(None) => {}
                Err(fault) => debug!(
                    event = %record.event_id(),
                    error = %fault,
                    "previously skipped event skipped again"
                ),
            }
        }
        info!(folded, through, "projection caught up from existing links");
        Ok(())
    }

    pub fn state(&self) -> Result<&ProjectionState, ProjectionFault> {
        self.projection.state()
    }

    /// Canonical hash of the current state.
    pub fn current_hash(&self) -> Result<String, ProjectionFault> {
        self.state().map(canonical_hash)
    }

    /// Position of the last event this session handled.
    pub fn last_position(&self) -> Option<u64> {
        self.last_position
    }

    pub fn definition(&self) -> &ProjectionDefinition {
        self.projection.definition()
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EventStore {
        &mut self.store
    }

    pub fn into_store(self) -> EventStore {
        self.store
    }
}

/// Highest position of a source event that already has a link in one of
/// the parity partitions.
fn linked_checkpoint(store: &EventStore) -> Result<Option<u64>, HostError> {
    let mut checkpoint = None;
    for parity in [Parity::Odd, Parity::Even] {
        for record in store.read_stream(parity.stream_name()) {
            if record.is_link() {
                let source = store.resolve(&record)?;
                checkpoint = checkpoint.max(Some(source.position));
            }
        }
    }
    Ok(checkpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(policy: FaultPolicy) -> ProjectionSession {
        ProjectionSession::new(EventStore::in_memory(), ProjectionDefinition::default(), policy)
            .unwrap()
    }

    #[test]
    fn test_run_links_every_event_once() {
        let mut s = session(FaultPolicy::Halt);
        for (stream, age) in [("odd", 3), ("even", 4), ("odd", 5)] {
            s.store_mut()
                .append(stream, "person", Some(json!({"age": age})))
                .unwrap();
        }
        let summary = s.run().unwrap();
        assert_eq!(summary.delivered, 3);
        assert_eq!((summary.linked_odd, summary.linked_even), (2, 1));
        assert_eq!(s.state().unwrap().sum, Some(12));

        // Nothing new: a second run must not duplicate links.
        assert_eq!(s.run().unwrap(), RunSummary::default());
        assert_eq!(s.store().len(), 6);
    }

    #[test]
    fn test_halt_keeps_position_for_retry() {
        let mut s = session(FaultPolicy::Halt);
        s.store_mut().append("odd", "person", Some(json!({"age": 1}))).unwrap();
        s.store_mut().append("even", "person", None).unwrap();

        match s.run() {
            Err(HostError::EventFault { position, fault }) => {
                assert_eq!(position, 1);
                assert!(matches!(fault, ProjectionFault::InvalidPayload { .. }));
            }
            other => panic!("expected event fault, got {:?}", other),
        }
        assert_eq!(s.last_position(), Some(0));
        assert!(s.run().is_err());
    }

    #[test]
    fn test_skip_moves_past_bad_event() {
        let mut s = session(FaultPolicy::Skip);
        s.store_mut()
            .append("odd", "person", Some(json!({"age": "not-a-number"})))
            .unwrap();
        s.store_mut().append("even", "person", Some(json!({"age": 8}))).unwrap();

        let summary = s.run().unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.linked(), 1);
        assert_eq!(s.last_position(), Some(1));
    }

    #[test]
    fn test_unsubscribed_streams_are_ignored() {
        let mut s = session(FaultPolicy::Halt);
        s.store_mut().append("cats", "pet", Some(json!({"age": 2}))).unwrap();
        assert_eq!(s.run().unwrap().delivered, 0);
        assert_eq!(s.state().unwrap().sum, None);
    }

    #[test]
    fn test_filtered_events_count_but_do_not_link() {
        let projection = ParityProjection::new(ProjectionDefinition::default())
            .with_filter(|e| e.event_type == "person");
        let mut s = ProjectionSession::with_projection(
            EventStore::in_memory(),
            projection,
            FaultPolicy::Halt,
        )
        .unwrap();
        s.store_mut().append("odd", "robot", Some(json!({"age": 1}))).unwrap();
        s.store_mut().append("even", "person", Some(json!({"age": 2}))).unwrap();

        let summary = s.run().unwrap();
        assert_eq!((summary.delivered, summary.filtered), (1, 1));
        assert_eq!(summary.linked(), 1);
        assert_eq!(s.definition().name, "parity");
        assert_eq!(s.into_store().read_stream("odd").len(), 1);
    }

    fn links_to(store: &EventStore, id: &str) -> usize {
        ["odd", "even"]
            .iter()
            .flat_map(|s| store.read_stream(s))
            .filter(|r| r.is_link() && r.data == Some(json!(id)))
            .count()
    }

    #[test]
    fn test_new_session_resumes_after_linked_events() {
        let mut first = session(FaultPolicy::Halt);
        first.store_mut().append("odd", "person", Some(json!({"age": 3}))).unwrap();
        first.store_mut().append("even", "person", Some(json!({"age": 4}))).unwrap();
        first.run().unwrap();
        let mut store = first.into_store();
        store.append("odd", "person", Some(json!({"age": 5}))).unwrap();

        let mut second =
            ProjectionSession::new(store, ProjectionDefinition::default(), FaultPolicy::Halt)
                .unwrap();
        assert_eq!(second.last_position(), Some(1));
        assert_eq!(second.state().unwrap().sum, Some(7));

        let summary = second.run().unwrap();
        assert_eq!(summary.delivered, 1);
        assert_eq!(second.state().unwrap().sum, Some(12));
        for id in ["odd@0", "even@0", "odd@2"] {
            assert_eq!(links_to(second.store(), id), 1, "links to {}", id);
        }
    }

    #[test]
    fn test_resume_skips_events_an_earlier_session_skipped() {
        let mut first = session(FaultPolicy::Skip);
        first.store_mut().append("odd", "person", None).unwrap();
        first.store_mut().append("even", "person", Some(json!({"age": 2}))).unwrap();
        assert_eq!(first.run().unwrap().skipped, 1);

        let second = ProjectionSession::new(
            first.into_store(),
            ProjectionDefinition::default(),
            FaultPolicy::Halt,
        )
        .unwrap();
        assert_eq!(second.last_position(), Some(1));
        assert_eq!(second.state().unwrap().sum, Some(2));
    }

    #[test]
    fn test_restored_projection_is_not_caught_up() {
        let mut first = session(FaultPolicy::Halt);
        first.store_mut().append("even", "person", Some(json!({"age": 10}))).unwrap();
        first.run().unwrap();
        let held = first.state().unwrap().clone();

        let mut projection = ParityProjection::new(ProjectionDefinition::default());
        projection.restore(held);
        let second =
            ProjectionSession::with_projection(first.into_store(), projection, FaultPolicy::Halt)
                .unwrap();
        assert_eq!(second.state().unwrap().sum, Some(10));
        assert_eq!(second.last_position(), Some(0));
    }

    #[test]
    fn test_invalid_definition_rejected() {
        let definition = ProjectionDefinition::default().with_source_streams(["odd", "odd"]);
        assert!(matches!(
            ProjectionSession::new(EventStore::in_memory(), definition, FaultPolicy::Halt),
            Err(HostError::Definition(_))
        ));
    }
}
