//! Command handlers for the Dice context.

use cortex_core::error::DomainError;

use super::cascade::{CascadeTiming, RollHandle, SharedRng, spawn_cascade};
use crate::domain::aggregates::RollSession;
use crate::domain::commands::RollDice;

/// Handles the `RollDice` command: validates the pool size and starts the
/// cascade on its own task.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the dice count is out of range.
pub fn handle_roll_dice(
    command: &RollDice,
    rng: SharedRng,
    timing: CascadeTiming,
) -> Result<RollHandle, DomainError> {
    let session = RollSession::new(command.roll_id, command.count)?;
    tracing::debug!(
        correlation_id = %command.correlation_id,
        roll_id = %command.roll_id,
        count = command.count,
        "starting dice cascade"
    );
    Ok(spawn_cascade(session, rng, timing))
}
