//! Replay: rebuild projection state from recorded events.
//!
//! Delegates all domain logic to the kernel. No cached state.

use parity_projection::domain::{Link, ProjectionState};
use parity_projection::hashing::canonical_hash;
use parity_projection::{EventEnvelope, ParityProjection, ProjectionDefinition, ProjectionFault};

use crate::error::HostError;
use crate::event_store::EventStore;

/// Result of a full replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rebuilt {
    pub state: ProjectionState,
    pub hash: String,
    pub links: Vec<Link>,
}

/// Rebuild state from a sequence of events with a fresh projection.
///
/// Pure function of `(definition, events)`.
pub fn rebuild_state(
    definition: &ProjectionDefinition,
    events: &[EventEnvelope],
) -> Result<Rebuilt, ProjectionFault> {
    let mut projection = ParityProjection::new(definition.clone());
    let mut links: Vec<Link> = Vec::with_capacity(events.len());
    let state = projection.replay(events, &mut links)?.clone();
    let hash = canonical_hash(&state);
    Ok(Rebuilt { state, hash, links })
}

/// Rebuild and return only the canonical hash.
pub fn rebuild_hash(
    definition: &ProjectionDefinition,
    events: &[EventEnvelope],
) -> Result<String, ProjectionFault> {
    rebuild_state(definition, events).map(|r| r.hash)
}

/// Events a session over `store` would deliver, in delivery order.
pub fn source_events(
    store: &EventStore,
    definition: &ProjectionDefinition,
) -> Result<Vec<EventEnvelope>, HostError> {
    Ok(store
        .zip_streams(definition.source_streams.as_slice())?
        .iter()
        .filter(|r| !r.is_link())
        .map(|r| r.to_envelope())
        .collect())
}

/// Replay the same events twice and require identical hashes.
pub fn verify_determinism(
    definition: &ProjectionDefinition,
    events: &[EventEnvelope],
) -> Result<String, HostError> {
    let first = rebuild_hash(definition, events)?;
    let second = rebuild_hash(definition, events)?;
    if first != second {
        return Err(HostError::Nondeterministic { first, second });
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parity_projection::AccumulationMode;
    use serde_json::json;

    fn store_with(ages: &[(&str, i64)]) -> EventStore {
        let mut store = EventStore::in_memory();
        for (stream, age) in ages {
            store.append(stream, "person", Some(json!({"age": age}))).unwrap();
        }
        store
    }

    #[test]
    fn test_rebuild_matches_expected_total() {
        let store = store_with(&[("odd", 3), ("even", 4), ("odd", 5)]);
        let definition = ProjectionDefinition::default();
        let events = source_events(&store, &definition).unwrap();
        let rebuilt = rebuild_state(&definition, &events).unwrap();
        assert_eq!(rebuilt.state.sum, Some(12));
        assert_eq!(rebuilt.links.len(), 3);
    }

    #[test]
    fn test_source_events_skip_links() {
        let mut store = store_with(&[("odd", 3), ("even", 4)]);
        let first = store.get("odd", 0).unwrap().clone();
        store.link_to("odd", &first).unwrap();
        let events = source_events(&store, &ProjectionDefinition::default()).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_modes_hash_differently() {
        let store = store_with(&[("odd", 3), ("even", 4)]);
        let faithful = ProjectionDefinition::default();
        let per_parity = ProjectionDefinition::default().with_mode(AccumulationMode::PerParity);
        let events = source_events(&store, &faithful).unwrap();
        assert_ne!(
            rebuild_hash(&faithful, &events).unwrap(),
            rebuild_hash(&per_parity, &events).unwrap()
        );
    }

    #[test]
    fn test_verify_determinism() {
        let store = store_with(&[("odd", 1), ("even", 2), ("odd", 3)]);
        let definition = ProjectionDefinition::default();
        let events = source_events(&store, &definition).unwrap();
        let hash = verify_determinism(&definition, &events).unwrap();
        assert_eq!(hash, rebuild_hash(&definition, &events).unwrap());
    }

    #[test]
    fn test_rebuild_propagates_fault() {
        let events = vec![EventEnvelope::new("odd", "person", 0, 0, None)];
        assert!(matches!(
            rebuild_state(&ProjectionDefinition::default(), &events),
            Err(ProjectionFault::InvalidPayload { .. })
        ));
    }
}
