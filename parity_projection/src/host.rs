//! Callback seam into the hosting engine.

use crate::domain::Link;
use crate::events::EventEnvelope;

/// Receives `linkTo(target, event)` requests.
///
/// Fire-and-forget: the projection observes no result. A host that can
/// fail to persist a link should buffer here and surface errors itself.
pub trait LinkSink {
    fn link_to(&mut self, target: &str, event: &EventEnvelope);
}

/// Buffering sink, used by hosts and tests alike.
impl LinkSink for Vec<Link> {
    fn link_to(&mut self, target: &str, event: &EventEnvelope) {
        self.push(Link::new(target, event));
    }
}

/// Drops every link. Handy for replays that only care about state.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardLinks;

impl LinkSink for DiscardLinks {
    fn link_to(&mut self, _target: &str, _event: &EventEnvelope) {}
}
