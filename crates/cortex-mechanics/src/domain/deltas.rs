//! The `mechanics` object of a narrator turn.
//!
//! Every field is optional on the wire; missing pieces deserialize to
//! "no change".

use serde::{Deserialize, Serialize};

/// Structured state changes requested by the narrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mechanics {
    /// Player vitals deltas.
    #[serde(default)]
    pub player_updates: PlayerUpdates,
    /// Threat roster changes.
    #[serde(default)]
    pub threats_layer: ThreatsLayer,
}

impl Mechanics {
    /// True when applying this would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.player_updates.has_changes()
            && self.threats_layer.spawn.is_empty()
            && self.threats_layer.modify.is_empty()
            && self.threats_layer.remove.is_empty()
    }
}

/// HP/MP deltas for the acting character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerUpdates {
    #[serde(default)]
    pub hp_change: i32,
    #[serde(default)]
    pub mp_change: i32,
}

impl PlayerUpdates {
    /// Whether either delta is nonzero.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.hp_change != 0 || self.mp_change != 0
    }
}

/// Spawn, modify and remove requests, applied in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatsLayer {
    #[serde(default)]
    pub spawn: Vec<SpawnRequest>,
    #[serde(default)]
    pub modify: Vec<ModifyRequest>,
    /// Names of threats that left the scene.
    #[serde(default)]
    pub remove: Vec<String>,
}

/// New threats entering the encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub name: String,
    pub base_hp: i32,
    /// How many copies; absent or zero means one.
    #[serde(default)]
    pub count: Option<u32>,
}

/// A change to an existing active threat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyRequest {
    /// Matched case-insensitively against active threat names.
    pub target_name: String,
    #[serde(default)]
    pub hp_change: Option<i32>,
    #[serde(default)]
    pub new_status: Option<String>,
}
