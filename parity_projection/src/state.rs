//! State construction.

use crate::domain::ProjectionState;

/// Fresh state at projection (re)start: `oddSum = 0`, `evenSum = 0`,
/// running total not yet created.
pub fn create_initial_state() -> ProjectionState {
    ProjectionState {
        odd_sum: 0,
        even_sum: 0,
        sum: None,
    }
}
