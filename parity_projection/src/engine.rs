//! Engine.
//!
//! Stateful wrapper around the pure reducer in `transitions`. Holds the
//! definition, the injected state and an optional event filter, and
//! forwards each link to the host's [`LinkSink`].
//!
//! Lifecycle: uninitialised -> initialised -> processing. There is no
//! terminal state; the host simply stops delivering.

use std::fmt;

use tracing::{debug, info};

use crate::definition::{ProjectionDefinition, ProjectionOptions};
use crate::domain::{Link, ProjectionState};
use crate::error::ProjectionFault;
use crate::events::EventEnvelope;
use crate::host::LinkSink;
use crate::state::create_initial_state;
use crate::transitions::apply_event as transition_apply;

type EventFilter = Box<dyn Fn(&EventEnvelope) -> bool + Send + Sync>;

/// An event the reducer accepted, not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a routed event has no effect until committed"]
pub struct Routed {
    state: ProjectionState,
    link: Link,
}

impl Routed {
    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn state(&self) -> &ProjectionState {
        &self.state
    }
}

pub struct ParityProjection {
    definition: ProjectionDefinition,
    state: Option<ProjectionState>,
    filter: Option<EventFilter>,
    delivered: u64,
}

impl fmt::Debug for ParityProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParityProjection")
            .field("definition", &self.definition)
            .field("state", &self.state)
            .field("filtered", &self.filter.is_some())
            .field("delivered", &self.delivered)
            .finish()
    }
}

impl ParityProjection {
    /// Create a new, uninitialised projection.
    pub fn new(definition: ProjectionDefinition) -> Self {
        Self {
            definition,
            state: None,
            filter: None,
            delivered: 0,
        }
    }

    /// Only deliver events for which `predicate` holds. Rejected events
    /// cause neither a state mutation nor a link.
    pub fn with_filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&EventEnvelope) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    pub fn definition(&self) -> &ProjectionDefinition {
        &self.definition
    }

    /// The opaque options, as the host should see them.
    pub fn options(&self) -> &ProjectionOptions {
        &self.definition.options
    }

    /// Reset state to zero. Called once at projection (re)start.
    pub fn initialize(&mut self) -> &ProjectionState {
        info!(
            projection = %self.definition.name,
            mode = ?self.definition.mode,
            "projection initialised"
        );
        self.delivered = 0;
        self.state.insert(create_initial_state())
    }

    /// Adopt state held by the host instead of starting from zero.
    /// Starts a new lifecycle, so the delivered count restarts too.
    pub fn restore(&mut self, state: ProjectionState) -> &ProjectionState {
        self.delivered = 0;
        self.state.insert(state)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Result<&ProjectionState, ProjectionFault> {
        self.state.as_ref().ok_or(ProjectionFault::NotInitialized)
    }

    /// Hand the state back to the host.
    pub fn into_state(self) -> Option<ProjectionState> {
        self.state
    }

    /// Events folded into state since the last `initialize` or `restore`.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn accepts(&self, event: &EventEnvelope) -> bool {
        self.filter.as_ref().map_or(true, |f| f(event))
    }

    /// Compute the outcome of `event` without touching the projection.
    ///
    /// `Ok(None)` when the filter rejects the event. The returned
    /// [`Routed`] takes effect only once passed to [`ParityProjection::commit`],
    /// so a host can persist the link first and drop the step if that fails.
    pub fn route(&self, event: &EventEnvelope) -> Result<Option<Routed>, ProjectionFault> {
        let current = self.state.as_ref().ok_or(ProjectionFault::NotInitialized)?;

        if !self.accepts(event) {
            debug!(event = %event.event_id(), "event filtered out");
            return Ok(None);
        }

        let (state, link) = transition_apply(current, event, self.definition.mode)?;
        Ok(Some(Routed { state, link }))
    }

    /// Store the state of a routed event and hand back its link.
    pub fn commit(&mut self, routed: Routed) -> Link {
        let Routed { state, link } = routed;
        self.state = Some(state);
        self.delivered += 1;
        debug!(
            event = %link.source_id(),
            position = link.source_position,
            target = %link.target,
            "event routed"
        );
        link
    }

    /// Process one event:
    ///   1. Skip it if the filter rejects it (`Ok(None)`)
    ///   2. Delegate to `transitions::apply_event`
    ///   3. Store the new state
    ///   4. Emit exactly one link to `sink`
    ///
    /// On fault nothing is stored and nothing is emitted.
    pub fn on_event<S>(
        &mut self,
        event: &EventEnvelope,
        sink: &mut S,
    ) -> Result<Option<Link>, ProjectionFault>
    where
        S: LinkSink + ?Sized,
    {
        let Some(routed) = self.route(event)? else {
            return Ok(None);
        };
        let link = self.commit(routed);
        sink.link_to(&link.target, event);
        Ok(Some(link))
    }

    /// Apply an ordered sequence of events, stopping at the first fault.
    pub fn process_all<S>(
        &mut self,
        events: &[EventEnvelope],
        sink: &mut S,
    ) -> Result<&ProjectionState, ProjectionFault>
    where
        S: LinkSink + ?Sized,
    {
        for event in events {
            self.on_event(event, sink)?;
        }
        self.state()
    }

    /// Reset and replay.
    pub fn replay<S>(
        &mut self,
        events: &[EventEnvelope],
        sink: &mut S,
    ) -> Result<&ProjectionState, ProjectionFault>
    where
        S: LinkSink + ?Sized,
    {
        self.initialize();
        self.process_all(events, sink)
    }
}
