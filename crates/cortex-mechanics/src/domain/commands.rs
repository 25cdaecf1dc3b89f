//! Commands for the Mechanics context.

use cortex_core::command::Command;
use cortex_core::entity::EncounterScope;
use uuid::Uuid;

use super::deltas::Mechanics;

/// Command to apply a validated narrator turn's mechanics.
#[derive(Debug, Clone)]
pub struct ApplyMechanics {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Campaign and character the turn belongs to.
    pub scope: EncounterScope,
    /// Deltas to apply.
    pub mechanics: Mechanics,
}

impl Command for ApplyMechanics {
    fn command_type(&self) -> &'static str {
        "mechanics.apply"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
