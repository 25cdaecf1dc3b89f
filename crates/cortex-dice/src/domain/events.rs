//! Progress notifications emitted while a cascade runs.

use serde::Serialize;

/// One die landing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettledFace {
    /// Die that landed.
    pub die_id: u32,
    /// Face it landed on.
    pub value: u8,
}

/// Cascade progress, in the order a viewer would see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RollProgress {
    /// A batch of dice left the hand.
    Thrown {
        /// Cascade level.
        round: u32,
        /// Dice in the batch.
        dice: Vec<u32>,
    },
    /// The batch landed.
    Settled {
        /// Cascade level.
        round: u32,
        /// Landed faces.
        faces: Vec<SettledFace>,
    },
    /// New 8s spawned golden companions.
    Overclocked {
        /// Level the companions will be thrown in.
        round: u32,
        /// Dice that triggered.
        triggered_by: Vec<u32>,
        /// Companions spawned.
        companions: Vec<u32>,
    },
    /// Final result. Emitted once.
    Completed {
        /// Even faces across the cascade.
        successes: u32,
    },
}
