//! Commands for the Narrative context.

use cortex_core::command::Command;
use cortex_core::entity::EncounterScope;
use uuid::Uuid;

use super::turn::StyleMode;

/// Command to resolve one player turn.
#[derive(Debug, Clone)]
pub struct ResolveTurn {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Campaign and acting character.
    pub scope: EncounterScope,
    /// Free-text player action.
    pub action: String,
    /// Narrative tone.
    pub style: StyleMode,
}

impl Command for ResolveTurn {
    fn command_type(&self) -> &'static str {
        "narrative.resolve_turn"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
