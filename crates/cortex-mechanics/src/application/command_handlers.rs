//! Command handlers for the Mechanics context.
//!
//! Mechanics are applied group by group: player updates, spawns, modifies,
//! removals. Each write stands alone. A failed write is logged and recorded
//! in the report, and the remaining groups still run.

use std::fmt;

use cortex_core::clock::Clock;
use cortex_core::entity::{NewThreat, Threat, ThreatStatus, Vitals};
use cortex_core::error::DomainError;
use cortex_core::repository::GameStore;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::commands::ApplyMechanics;
use crate::domain::deltas::{ModifyRequest, SpawnRequest};
use crate::domain::rules::{modified_threat, next_vitals, spawn_names};

/// The four write groups, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MechanicsGroup {
    PlayerUpdates,
    Spawn,
    Modify,
    Remove,
}

impl fmt::Display for MechanicsGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PlayerUpdates => "player_updates",
            Self::Spawn => "spawn",
            Self::Modify => "modify",
            Self::Remove => "remove",
        })
    }
}

/// A threat after a modify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreatChange {
    pub name: String,
    pub current_hp: i32,
    pub status: ThreatStatus,
}

/// What was written.
#[derive(Debug, Default)]
pub struct MechanicsReport {
    /// Vitals as persisted, when they changed.
    pub vitals: Option<Vitals>,
    /// Rows created by spawns.
    pub spawned: Vec<Threat>,
    /// Threats changed by modifies.
    pub modified: Vec<ThreatChange>,
    /// Modify targets with no active match.
    pub unmatched: Vec<String>,
    /// Threats moved to `fled`.
    pub fled: u64,
    /// Writes that failed, by group.
    pub failures: Vec<(MechanicsGroup, DomainError)>,
}

impl MechanicsReport {
    /// Whether every attempted write succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, group: MechanicsGroup, error: DomainError) {
        warn!(group = %group, error = %error, "mechanics write failed");
        self.failures.push((group, error));
    }
}

/// Handles the `ApplyMechanics` command against the character's pre-turn
/// `vitals`. Never fails as a whole; see [`MechanicsReport::failures`].
pub async fn handle_apply_mechanics(
    command: &ApplyMechanics,
    vitals: Vitals,
    clock: &dyn Clock,
    store: &dyn GameStore,
) -> MechanicsReport {
    let mut report = MechanicsReport::default();
    let layer = &command.mechanics.threats_layer;

    if let Some(next) = next_vitals(vitals, command.mechanics.player_updates) {
        match store
            .update_vitals(command.scope.character_id, next.current_hp, next.current_mp)
            .await
        {
            Ok(()) => report.vitals = Some(next),
            Err(e) => report.record(MechanicsGroup::PlayerUpdates, e),
        }
    }

    for request in &layer.spawn {
        spawn(command, request, clock, store, &mut report).await;
    }

    for request in &layer.modify {
        modify(command, request, store, &mut report).await;
    }

    for name in &layer.remove {
        match store.mark_fled(command.scope, name).await {
            Ok(changed) => report.fled += changed,
            Err(e) => report.record(MechanicsGroup::Remove, e),
        }
    }

    info!(
        correlation_id = %command.correlation_id,
        character_id = %command.scope.character_id,
        spawned = report.spawned.len(),
        modified = report.modified.len(),
        fled = report.fled,
        failures = report.failures.len(),
        "mechanics applied"
    );
    report
}

async fn spawn(
    command: &ApplyMechanics,
    request: &SpawnRequest,
    clock: &dyn Clock,
    store: &dyn GameStore,
    report: &mut MechanicsReport,
) {
    // Rows may not carry negative hit points.
    let hp = request.base_hp.max(0);
    for name in spawn_names(request) {
        let new_threat = NewThreat {
            scope: command.scope,
            name,
            hp,
            created_at: clock.now(),
        };
        match store.insert_threat(new_threat).await {
            Ok(row) => report.spawned.push(row),
            Err(e) => report.record(MechanicsGroup::Spawn, e),
        }
    }
}

async fn modify(
    command: &ApplyMechanics,
    request: &ModifyRequest,
    store: &dyn GameStore,
    report: &mut MechanicsReport,
) {
    let threat = match store
        .find_active_threat(command.scope, &request.target_name)
        .await
    {
        Ok(Some(threat)) => threat,
        Ok(None) => {
            report.unmatched.push(request.target_name.clone());
            return;
        }
        Err(e) => {
            report.record(MechanicsGroup::Modify, e);
            return;
        }
    };

    let (current_hp, status) = modified_threat(&threat, request);
    match store.update_threat(threat.id, current_hp, status).await {
        Ok(()) => report.modified.push(ThreatChange {
            name: threat.name,
            current_hp,
            status,
        }),
        Err(e) => report.record(MechanicsGroup::Modify, e),
    }
}

#[cfg(test)]
mod tests {
    use cortex_core::entity::EncounterScope;
    use cortex_test_support::{
        FailingGameStore, FixedClock, InMemoryGameStore, fixed_now, sample_campaign,
        sample_character,
    };
    use uuid::Uuid;

    use super::*;
    use crate::domain::deltas::{Mechanics, PlayerUpdates, ThreatsLayer};

    struct Fixture {
        store: InMemoryGameStore,
        scope: EncounterScope,
        vitals: Vitals,
    }

    fn fixture() -> Fixture {
        let campaign = sample_campaign();
        let character = sample_character(campaign.id);
        let scope = EncounterScope::new(campaign.id, character.id);
        let vitals = character.vitals();
        Fixture {
            store: InMemoryGameStore::new()
                .with_campaign(campaign)
                .with_character(character),
            scope,
            vitals,
        }
    }

    fn active_threat(scope: EncounterScope, name: &str, hp: i32) -> Threat {
        Threat {
            id: Uuid::new_v4(),
            campaign_id: scope.campaign_id,
            character_id: scope.character_id,
            name: name.to_owned(),
            current_hp: hp,
            max_hp: hp,
            status: ThreatStatus::Active,
            created_at: fixed_now(),
        }
    }

    fn command(scope: EncounterScope, mechanics: Mechanics) -> ApplyMechanics {
        ApplyMechanics {
            correlation_id: Uuid::new_v4(),
            scope,
            mechanics,
        }
    }

    fn modify_only(target: &str, hp_change: Option<i32>) -> Mechanics {
        Mechanics {
            threats_layer: ThreatsLayer {
                modify: vec![ModifyRequest {
                    target_name: target.to_owned(),
                    hp_change,
                    new_status: None,
                }],
                ..ThreatsLayer::default()
            },
            ..Mechanics::default()
        }
    }

    #[tokio::test]
    async fn test_player_updates_clamp_and_persist() {
        let f = fixture();
        let mechanics = Mechanics {
            player_updates: PlayerUpdates {
                hp_change: -20,
                mp_change: -2,
            },
            ..Mechanics::default()
        };

        let report = handle_apply_mechanics(
            &command(f.scope, mechanics),
            f.vitals,
            &FixedClock::default(),
            &f.store,
        )
        .await;

        let character = f.store.character(f.scope.character_id).unwrap();
        assert_eq!(character.current_hp, Some(0));
        assert_eq!(character.current_mp, Some(3));
        assert_eq!(report.vitals.unwrap().current_hp, 0);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_zero_deltas_do_not_write_vitals() {
        let f = fixture();

        handle_apply_mechanics(
            &command(f.scope, Mechanics::default()),
            f.vitals,
            &FixedClock::default(),
            &f.store,
        )
        .await;

        assert_eq!(f.store.vitals_writes(), 0);
    }

    #[tokio::test]
    async fn test_spawn_with_count_creates_numbered_rows() {
        let f = fixture();
        let mechanics = Mechanics {
            threats_layer: ThreatsLayer {
                spawn: vec![SpawnRequest {
                    name: "Drone".to_owned(),
                    base_hp: 5,
                    count: Some(3),
                }],
                ..ThreatsLayer::default()
            },
            ..Mechanics::default()
        };

        let report = handle_apply_mechanics(
            &command(f.scope, mechanics),
            f.vitals,
            &FixedClock::default(),
            &f.store,
        )
        .await;

        let threats = f.store.threats();
        let names: Vec<&str> = threats.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Drone 1", "Drone 2", "Drone 3"]);
        assert!(threats.iter().all(|t| t.current_hp == 5
            && t.max_hp == 5
            && t.status == ThreatStatus::Active
            && t.scope() == f.scope
            && t.created_at == fixed_now()));
        assert_eq!(report.spawned.len(), 3);
    }

    #[tokio::test]
    async fn test_spawn_without_hit_points_is_still_created() {
        let f = fixture();
        let mechanics = Mechanics {
            threats_layer: ThreatsLayer {
                spawn: vec![
                    SpawnRequest {
                        name: "Ghost".to_owned(),
                        base_hp: 0,
                        count: None,
                    },
                    SpawnRequest {
                        name: "Wraith".to_owned(),
                        base_hp: -3,
                        count: None,
                    },
                ],
                ..ThreatsLayer::default()
            },
            ..Mechanics::default()
        };

        let report = handle_apply_mechanics(
            &command(f.scope, mechanics),
            f.vitals,
            &FixedClock::default(),
            &f.store,
        )
        .await;

        let threats = f.store.threats();
        let names: Vec<&str> = threats.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Ghost", "Wraith"]);
        assert!(threats.iter().all(|t| t.current_hp == 0
            && t.max_hp == 0
            && t.status == ThreatStatus::Active));
        assert_eq!(report.spawned.len(), 2);
    }

    #[tokio::test]
    async fn test_modify_without_active_match_is_noop() {
        let f = fixture();
        let store = f.store.with_threat(active_threat(f.scope, "Ganger", 6));
        let before = store.threats();

        let report = handle_apply_mechanics(
            &command(f.scope, modify_only("Sniper", Some(-3))),
            f.vitals,
            &FixedClock::default(),
            &store,
        )
        .await;

        assert_eq!(store.threats(), before);
        assert_eq!(store.threat_writes(), 0);
        assert_eq!(report.unmatched, vec!["Sniper".to_owned()]);
    }

    #[tokio::test]
    async fn test_modify_to_zero_hp_marks_defeated() {
        let f = fixture();
        let store = f.store.with_threat(active_threat(f.scope, "Ganger", 4));

        handle_apply_mechanics(
            &command(f.scope, modify_only("GANGER", Some(-4))),
            f.vitals,
            &FixedClock::default(),
            &store,
        )
        .await;

        let threat = &store.threats()[0];
        assert_eq!(threat.current_hp, 0);
        assert_eq!(threat.status, ThreatStatus::Defeated);
    }

    #[tokio::test]
    async fn test_modify_ignores_threats_of_other_characters() {
        let f = fixture();
        let other_scope = EncounterScope::new(f.scope.campaign_id, Uuid::new_v4());
        let store = f.store.with_threat(active_threat(other_scope, "Ganger", 4));

        let report = handle_apply_mechanics(
            &command(f.scope, modify_only("Ganger", Some(-4))),
            f.vitals,
            &FixedClock::default(),
            &store,
        )
        .await;

        assert_eq!(store.threats()[0].status, ThreatStatus::Active);
        assert_eq!(report.unmatched.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_marks_matching_threats_fled() {
        let f = fixture();
        let store = f
            .store
            .with_threat(active_threat(f.scope, "Sniper", 4))
            .with_threat(active_threat(f.scope, "Ganger", 4));
        let mechanics = Mechanics {
            threats_layer: ThreatsLayer {
                remove: vec!["sniper".to_owned()],
                ..ThreatsLayer::default()
            },
            ..Mechanics::default()
        };

        let report = handle_apply_mechanics(
            &command(f.scope, mechanics),
            f.vitals,
            &FixedClock::default(),
            &store,
        )
        .await;

        let threats = store.threats();
        assert_eq!(threats[0].status, ThreatStatus::Fled);
        assert_eq!(threats[1].status, ThreatStatus::Active);
        assert_eq!(report.fled, 1);
    }

    #[tokio::test]
    async fn test_threat_write_failure_does_not_block_vitals() {
        let f = fixture();
        f.store.fail_threat_writes();
        let mechanics = Mechanics {
            player_updates: PlayerUpdates {
                hp_change: -2,
                mp_change: 0,
            },
            threats_layer: ThreatsLayer {
                spawn: vec![SpawnRequest {
                    name: "Drone".to_owned(),
                    base_hp: 5,
                    count: None,
                }],
                ..ThreatsLayer::default()
            },
        };

        let report = handle_apply_mechanics(
            &command(f.scope, mechanics),
            f.vitals,
            &FixedClock::default(),
            &f.store,
        )
        .await;

        assert_eq!(f.store.character(f.scope.character_id).unwrap().current_hp, Some(8));
        assert!(f.store.threats().is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, MechanicsGroup::Spawn);
    }

    #[tokio::test]
    async fn test_vitals_failure_does_not_block_threat_groups() {
        let f = fixture();
        f.store.fail_vitals_writes();
        let mechanics = Mechanics {
            player_updates: PlayerUpdates {
                hp_change: -2,
                mp_change: 0,
            },
            threats_layer: ThreatsLayer {
                spawn: vec![SpawnRequest {
                    name: "Drone".to_owned(),
                    base_hp: 5,
                    count: None,
                }],
                ..ThreatsLayer::default()
            },
        };

        let report = handle_apply_mechanics(
            &command(f.scope, mechanics),
            f.vitals,
            &FixedClock::default(),
            &f.store,
        )
        .await;

        assert_eq!(f.store.threats().len(), 1);
        assert_eq!(report.failures[0].0, MechanicsGroup::PlayerUpdates);
        assert!(report.vitals.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_store_reports_every_group() {
        let scope = EncounterScope::new(Uuid::new_v4(), Uuid::new_v4());
        let mechanics = Mechanics {
            player_updates: PlayerUpdates {
                hp_change: 1,
                mp_change: 0,
            },
            threats_layer: ThreatsLayer {
                spawn: vec![SpawnRequest {
                    name: "Drone".to_owned(),
                    base_hp: 5,
                    count: None,
                }],
                modify: vec![ModifyRequest {
                    target_name: "Drone".to_owned(),
                    hp_change: Some(-1),
                    new_status: None,
                }],
                remove: vec!["Drone".to_owned()],
            },
        };
        let vitals = Vitals {
            current_hp: 5,
            max_hp: 10,
            current_mp: 5,
            max_mp: 5,
        };

        let report = handle_apply_mechanics(
            &command(scope, mechanics),
            vitals,
            &FixedClock::default(),
            &FailingGameStore,
        )
        .await;

        let groups: Vec<MechanicsGroup> = report.failures.iter().map(|(g, _)| *g).collect();
        assert_eq!(
            groups,
            vec![
                MechanicsGroup::PlayerUpdates,
                MechanicsGroup::Spawn,
                MechanicsGroup::Modify,
                MechanicsGroup::Remove,
            ]
        );
    }
}
