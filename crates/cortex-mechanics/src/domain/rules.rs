//! Pure mechanics rules: clamping, spawn naming and threat transitions.

use cortex_core::entity::{Threat, ThreatStatus, Vitals};

use super::deltas::{ModifyRequest, PlayerUpdates, SpawnRequest};

/// Upper bound on copies a single spawn request may create.
pub const MAX_SPAWN_COUNT: u32 = 20;

/// `clamp(current + delta, 0, max)`.
#[must_use]
pub fn clamp_vital(current: i32, delta: i32, max: i32) -> i32 {
    current.saturating_add(delta).clamp(0, max.max(0))
}

/// New vitals after applying `updates`, or `None` when both deltas are zero.
#[must_use]
pub fn next_vitals(vitals: Vitals, updates: PlayerUpdates) -> Option<Vitals> {
    if !updates.has_changes() {
        return None;
    }

    Some(Vitals {
        current_hp: clamp_vital(vitals.current_hp, updates.hp_change, vitals.max_hp),
        current_mp: clamp_vital(vitals.current_mp, updates.mp_change, vitals.max_mp),
        ..vitals
    })
}

/// Names of the rows a spawn request creates. A count above one numbers
/// the copies `"{name} 1"..="{name} n"`.
#[must_use]
pub fn spawn_names(request: &SpawnRequest) -> Vec<String> {
    let count = request
        .count
        .filter(|&n| n > 0)
        .unwrap_or(1)
        .min(MAX_SPAWN_COUNT);

    if count == 1 {
        return vec![request.name.clone()];
    }
    (1..=count).map(|i| format!("{} {i}", request.name)).collect()
}

/// HP and status a threat ends up with after `request`.
///
/// HP never drops below zero. A threat at zero HP is `Defeated` whatever
/// status was asked for; otherwise an explicit, recognised status wins and
/// anything else leaves the status unchanged.
#[must_use]
pub fn modified_threat(threat: &Threat, request: &ModifyRequest) -> (i32, ThreatStatus) {
    let new_hp = threat
        .current_hp
        .saturating_add(request.hp_change.unwrap_or(0))
        .max(0);

    if new_hp == 0 {
        return (new_hp, ThreatStatus::Defeated);
    }

    let status = request
        .new_status
        .as_deref()
        .and_then(|s| s.parse::<ThreatStatus>().ok())
        .unwrap_or(threat.status);
    (new_hp, status)
}
