//! Shared application state.

use std::sync::Arc;

use cortex_dice::application::cascade::{CascadeTiming, SharedRng};
use cortex_narrative::application::pipeline::TurnPipeline;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Turn pipeline, including its single-flight gate.
    pub pipeline: Arc<TurnPipeline>,
    /// Random source for dice cascades.
    pub rng: SharedRng,
    /// Settle and reveal delays for dice cascades.
    pub dice_timing: CascadeTiming,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(pipeline: Arc<TurnPipeline>, rng: SharedRng, dice_timing: CascadeTiming) -> Self {
        Self {
            pipeline,
            rng,
            dice_timing,
        }
    }
}
