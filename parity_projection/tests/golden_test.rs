/// Golden determinism test: replays the frozen event stream
/// and asserts the canonical hash matches the permanent v1 value.
///
/// This test must NEVER be modified to match new behavior.
/// If it fails, the reducer has changed.

use std::fs;

use parity_projection::domain::{AccumulationMode, Link};
use parity_projection::engine::ParityProjection;
use parity_projection::events::EventEnvelope;
use parity_projection::hashing::canonical_hash;
use parity_projection::host::DiscardLinks;
use parity_projection::{ProjectionDefinition, PROJECTION_VERSION};

/// Hash of `{oddSum: 32, evenSum: 82, sum: 114}` under per-parity mode.
const PER_PARITY_HASH: &str =
    "7e7974ed3cbe72978db153f515d7d100632f65abbb541456e959b8f941704325";

fn load_events(path: &str) -> Vec<EventEnvelope> {
    let data = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e));
    let arr: Vec<serde_json::Value> =
        serde_json::from_str(&data).expect("Failed to parse events JSON");
    arr.iter().map(EventEnvelope::from_value).collect()
}

fn load_expected_hash(path: &str) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e))
        .trim()
        .to_string()
}

fn run(events: &[EventEnvelope], mode: AccumulationMode) -> (String, Vec<Link>) {
    let mut projection = ParityProjection::new(ProjectionDefinition::default().with_mode(mode));
    projection.initialize();
    let mut links: Vec<Link> = Vec::new();
    let state = projection
        .process_all(events, &mut links)
        .expect("golden events are valid");
    (canonical_hash(state), links)
}

#[test]
fn golden_replay_hash_matches() {
    let events = load_events("tests/golden/events.json");
    let (hash, _) = run(&events, AccumulationMode::SourceFaithful);

    let expected = load_expected_hash("tests/golden/expected_hash.txt");
    assert_eq!(
        hash, expected,
        "GOLDEN TEST FAILED: v1 replay produced a different hash.\n\
         Got:      {}\n\
         Expected: {}",
        hash, expected
    );
}

#[test]
fn golden_replay_per_parity_hash_matches() {
    let events = load_events("tests/golden/events.json");
    let (hash, _) = run(&events, AccumulationMode::PerParity);
    assert_eq!(hash, PER_PARITY_HASH);
}

#[test]
fn golden_replay_is_deterministic() {
    let events = load_events("tests/golden/events.json");

    let mut p1 = ParityProjection::new(ProjectionDefinition::default());
    let h1 = canonical_hash(p1.replay(&events, &mut DiscardLinks).unwrap());

    let mut p2 = ParityProjection::new(ProjectionDefinition::default());
    let h2 = canonical_hash(p2.replay(&events, &mut DiscardLinks).unwrap());

    assert_eq!(
        h1, h2,
        "DETERMINISM FAILURE: two replays of the same events produced different hashes.\n\
         Run 1: {}\n\
         Run 2: {}",
        h1, h2
    );
}

#[test]
fn golden_links_alternate_partitions() {
    let events = load_events("tests/golden/events.json");
    let (_, links) = run(&events, AccumulationMode::SourceFaithful);

    assert_eq!(links.len(), events.len());
    let odd = links.iter().filter(|l| l.target == "odd").count();
    let even = links.iter().filter(|l| l.target == "even").count();
    assert_eq!((odd, even), (6, 6));
    for (event, link) in events.iter().zip(&links) {
        assert_eq!(link.target, event.stream);
        assert_eq!(link.source_position, event.position);
    }
}

#[test]
fn projection_version_is_one() {
    assert_eq!(PROJECTION_VERSION, 1, "PROJECTION_VERSION must be 1 and never change");
}
