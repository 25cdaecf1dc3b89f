//! Routes for resolving player turns.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use cortex_core::entity::EncounterScope;
use cortex_narrative::application::pipeline::TurnReply;
use cortex_narrative::domain::commands::ResolveTurn;
use cortex_narrative::domain::turn::StyleMode;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /campaigns/{campaign_id}/turns.
#[derive(Debug, Deserialize)]
pub struct ResolveTurnRequest {
    /// Acting character.
    pub character_id: Uuid,
    /// Free-text player action.
    pub action: String,
    /// 1 tactical, 2 neutral, 3 immersive. Anything else is neutral.
    #[serde(default)]
    pub style: Option<i64>,
}

/// Response body for the turn-status query.
#[derive(Debug, Serialize)]
pub struct TurnStatusResponse {
    pub busy: bool,
}

/// POST /campaigns/{campaign_id}/turns
#[instrument(
    skip(state, request),
    fields(campaign_id = %campaign_id, character_id = %request.character_id)
)]
async fn resolve_turn(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
    Json(request): Json<ResolveTurnRequest>,
) -> Result<Json<TurnReply>, ApiError> {
    let command = ResolveTurn {
        correlation_id: Uuid::new_v4(),
        scope: EncounterScope::new(campaign_id, request.character_id),
        action: request.action,
        style: request.style.map(StyleMode::from_selector).unwrap_or_default(),
    };

    info!(correlation_id = %command.correlation_id, "handling resolve_turn command");

    let reply = state.pipeline.resolve_turn(&command).await?;

    Ok(Json(reply))
}

/// GET /campaigns/{campaign_id}/characters/{character_id}/turn-status
async fn turn_status(
    State(state): State<AppState>,
    Path((campaign_id, character_id)): Path<(Uuid, Uuid)>,
) -> Json<TurnStatusResponse> {
    let busy = state
        .pipeline
        .is_busy(EncounterScope::new(campaign_id, character_id));
    Json(TurnStatusResponse { busy })
}

/// Returns the router for turn resolution.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/campaigns/{campaign_id}/turns", post(resolve_turn))
        .route(
            "/campaigns/{campaign_id}/characters/{character_id}/turn-status",
            get(turn_status),
        )
}
