//! Commands for the Dice context.

use cortex_core::command::Command;
use uuid::Uuid;

/// Command to roll a pool of dice through the overclock cascade.
#[derive(Debug, Clone)]
pub struct RollDice {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Identifier given to the roll session.
    pub roll_id: Uuid,
    /// Number of dice in the initial pool.
    pub count: u32,
}

impl Command for RollDice {
    fn command_type(&self) -> &'static str {
        "dice.roll"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
