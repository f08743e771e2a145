//! Transition logic.
//!
//! ALL state mutation lives here. The reducer is pure:
//! `(state, event) -> (state', link)`. The input state is never touched,
//! so a faulting event leaves the caller's state exactly as it was.

use crate::arithmetic::{checked_add, read_age};
use crate::domain::{AccumulationMode, Link, Parity, ProjectionState};
use crate::error::ProjectionFault;
use crate::events::EventEnvelope;

/// Fold one event into a copy of `state` and decide its link.
pub fn apply_event(
    state: &ProjectionState,
    event: &EventEnvelope,
    mode: AccumulationMode,
) -> Result<(ProjectionState, Link), ProjectionFault> {
    let age = read_age(event).map_err(|defect| ProjectionFault::InvalidPayload {
        event_id: event.event_id(),
        defect,
    })?;

    let mut new_state = state.clone();
    let parity = Parity::of(age);

    // `sum` springs into existence on first use.
    let total = state.running_total();
    new_state.sum = Some(add(total, age, event)?);

    if mode == AccumulationMode::PerParity {
        match parity {
            Parity::Odd => new_state.odd_sum = add(state.odd_sum, age, event)?,
            Parity::Even => new_state.even_sum = add(state.even_sum, age, event)?,
        }
    }

    Ok((new_state, Link::new(parity.stream_name(), event)))
}

fn add(total: i64, age: i64, event: &EventEnvelope) -> Result<i64, ProjectionFault> {
    checked_add(total, age).ok_or_else(|| ProjectionFault::Overflow {
        event_id: event.event_id(),
        total,
        age,
    })
}
