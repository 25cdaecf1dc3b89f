//! Routes for the dice overclock cascade.

use std::sync::Arc;

use axum::extract::State;
use axum::{Json, Router, routing::post};
use cortex_core::error::DomainError;
use cortex_dice::application::cascade::CascadeOutcome;
use cortex_dice::application::command_handlers::handle_roll_dice;
use cortex_dice::domain::aggregates::{Die, roll_result_text};
use cortex_dice::domain::commands::RollDice;
use cortex_dice::domain::events::RollProgress;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /dice/roll.
#[derive(Debug, Deserialize)]
pub struct RollDiceRequest {
    /// Dice in the initial pool, 1 to 10.
    pub count: u32,
}

/// Response body for a completed roll.
#[derive(Debug, Serialize)]
pub struct RollDiceResponse {
    pub roll_id: Uuid,
    pub successes: u32,
    pub dice: Vec<Die>,
    pub rounds: u32,
    /// Every progress event, in emission order.
    pub progress: Vec<RollProgress>,
    /// Suggested next player action.
    pub input_text: String,
}

/// POST /dice/roll
///
/// Holds the request open for the full cascade. A client that disconnects
/// drops the handle, which cancels the roll.
#[instrument(skip(state, request), fields(count = request.count))]
async fn roll_dice(
    State(state): State<AppState>,
    Json(request): Json<RollDiceRequest>,
) -> Result<Json<RollDiceResponse>, ApiError> {
    let command = RollDice {
        correlation_id: Uuid::new_v4(),
        roll_id: Uuid::new_v4(),
        count: request.count,
    };

    info!(correlation_id = %command.correlation_id, "handling roll_dice command");

    let handle = handle_roll_dice(&command, Arc::clone(&state.rng), state.dice_timing)?;
    let (outcome, progress) = handle.finish_with_progress().await?;

    match outcome {
        CascadeOutcome::Completed(summary) => {
            info!(roll_id = %summary.roll_id, successes = summary.successes, "roll completed");
            Ok(Json(RollDiceResponse {
                input_text: roll_result_text(summary.successes),
                roll_id: summary.roll_id,
                successes: summary.successes,
                dice: summary.dice,
                rounds: summary.rounds,
                progress,
            }))
        }
        CascadeOutcome::Cancelled { roll_id } => Err(ApiError(DomainError::Infrastructure(
            format!("roll {roll_id} was dismissed before completion"),
        ))),
    }
}

/// Returns the router for dice rolls.
pub fn router() -> Router<AppState> {
    Router::new().route("/dice/roll", post(roll_dice))
}
