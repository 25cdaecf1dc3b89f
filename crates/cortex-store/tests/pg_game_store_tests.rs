//! Integration tests for `PgGameStore` and `PgContentStore`.
//!
//! These need a live database: `DATABASE_URL=... cargo test -- --ignored`.

use cortex_core::content::ContentStore;
use cortex_core::entity::{
    Attributes, EncounterScope, MessageRole, NewMessage, NewThreat, Skills, ThreatStatus,
};
use cortex_core::error::DomainError;
use cortex_core::repository::{
    CampaignRepository, CharacterRepository, MessageRepository, SummaryRepository,
    ThreatRepository,
};
use cortex_store::{PgContentStore, PgGameStore};
use cortex_test_support::fixed_now;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

/// Inserts a campaign and an enrolled character with no stored vitals.
async fn seed(pool: &PgPool) -> EncounterScope {
    let campaign_id = Uuid::new_v4();
    let character_id = Uuid::new_v4();
    sqlx::query("INSERT INTO campaigns (id, title, description) VALUES ($1, $2, $3)")
        .bind(campaign_id)
        .bind("Neon Abyss")
        .bind("A drowned megacity.")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO characters (id, campaign_id, user_id, name, attributes, skills) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(character_id)
    .bind(campaign_id)
    .bind(Uuid::new_v4())
    .bind("Vex")
    .bind(Json(Attributes::from_primary(5, 3, 4)))
    .bind(Json(Skills::default()))
    .execute(pool)
    .await
    .unwrap();
    EncounterScope::new(campaign_id, character_id)
}

fn new_threat(scope: EncounterScope, name: &str, hp: i32) -> NewThreat {
    NewThreat {
        scope,
        name: name.to_owned(),
        hp,
        created_at: fixed_now(),
    }
}

// --- campaigns and characters ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_character_without_vitals_uses_defaults(pool: PgPool) {
    let scope = seed(&pool).await;
    let store = PgGameStore::new(pool);

    let campaign = store.find_campaign(scope.campaign_id).await.unwrap().unwrap();
    let character = store
        .find_character(scope.character_id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(campaign.title, "Neon Abyss");
    assert_eq!(character.campaign_id, Some(scope.campaign_id));
    assert_eq!(character.vitals().max_hp, 10);
    assert_eq!(character.vitals().current_mp, 5);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_update_vitals_persists(pool: PgPool) {
    let scope = seed(&pool).await;
    let store = PgGameStore::new(pool);

    store.update_vitals(scope.character_id, 4, 2).await.unwrap();

    let character = store
        .find_character(scope.character_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(character.current_hp, Some(4));
    assert_eq!(character.current_mp, Some(2));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_missing_rows_read_as_none(pool: PgPool) {
    let store = PgGameStore::new(pool);

    assert!(store.find_campaign(Uuid::new_v4()).await.unwrap().is_none());
    assert!(store.find_character(Uuid::new_v4()).await.unwrap().is_none());
}

// --- threats ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_threat_lookup_is_case_insensitive_and_active_only(pool: PgPool) {
    let scope = seed(&pool).await;
    let store = PgGameStore::new(pool);
    let drone = store.insert_threat(new_threat(scope, "Drone 1", 5)).await.unwrap();

    let found = store.find_active_threat(scope, "drone 1").await.unwrap();
    assert_eq!(found.map(|t| t.id), Some(drone.id));

    store
        .update_threat(drone.id, 0, ThreatStatus::Defeated)
        .await
        .unwrap();

    assert!(store.find_active_threat(scope, "Drone 1").await.unwrap().is_none());
    assert!(store.active_threats(scope).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_mark_fled_counts_changed_rows(pool: PgPool) {
    let scope = seed(&pool).await;
    let store = PgGameStore::new(pool);
    store.insert_threat(new_threat(scope, "Guard", 6)).await.unwrap();
    store.insert_threat(new_threat(scope, "guard", 6)).await.unwrap();
    store.insert_threat(new_threat(scope, "Sniper", 4)).await.unwrap();

    let fled = store.mark_fled(scope, "GUARD").await.unwrap();

    assert_eq!(fled, 2);
    let active = store.active_threats(scope).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "Sniper");
}

// --- messages and summaries ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_recent_messages_are_newest_window_oldest_first(pool: PgPool) {
    let scope = seed(&pool).await;
    let store = PgGameStore::new(pool);
    for i in 0..5 {
        store
            .append_message(NewMessage {
                campaign_id: scope.campaign_id,
                role: MessageRole::User,
                content: format!("line {i}"),
                created_at: fixed_now(),
            })
            .await
            .unwrap();
    }

    let recent = store.recent_messages(scope.campaign_id, 3).await.unwrap();

    let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["line 2", "line 3", "line 4"]);
    let positions: Vec<u64> = recent.iter().map(|m| m.position).collect();
    assert_eq!(positions, vec![3, 4, 5]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_appends_get_distinct_positions(pool: PgPool) {
    let scope = seed(&pool).await;
    let store = PgGameStore::new(pool);
    let append = |content: &'static str| {
        store.append_message(NewMessage {
            campaign_id: scope.campaign_id,
            role: MessageRole::User,
            content: content.to_owned(),
            created_at: fixed_now(),
        })
    };

    let (a, b, c) = tokio::join!(append("a"), append("b"), append("c"));

    let mut positions = vec![
        a.unwrap().position,
        b.unwrap().position,
        c.unwrap().position,
    ];
    positions.sort_unstable();
    assert_eq!(positions, vec![1, 2, 3]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_append_to_unknown_campaign_is_not_found(pool: PgPool) {
    let store = PgGameStore::new(pool);
    let campaign_id = Uuid::new_v4();

    let err = store
        .append_message(NewMessage {
            campaign_id,
            role: MessageRole::User,
            content: "hello".to_owned(),
            created_at: fixed_now(),
        })
        .await
        .unwrap_err();

    match err {
        DomainError::EntityNotFound(id) => assert_eq!(id, campaign_id),
        other => panic!("expected EntityNotFound, got {other:?}"),
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_latest_summary_supersedes(pool: PgPool) {
    let scope = seed(&pool).await;
    let store = PgGameStore::new(pool);

    store
        .insert_summary(scope.campaign_id, "First.".into(), fixed_now())
        .await
        .unwrap();
    store
        .insert_summary(scope.campaign_id, "Second.".into(), fixed_now())
        .await
        .unwrap();

    let latest = store.latest_summary(scope.campaign_id).await.unwrap().unwrap();
    assert_eq!(latest.summary, "Second.");
}

// --- content ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_content_store_filters_by_category(pool: PgPool) {
    sqlx::query(
        "INSERT INTO rule_modules (category, content) VALUES ('core', 'Roll d8s.'), ('magic', 'Spells cost MP.')",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO prompt_templates (key, template) VALUES ('campaign_intro', 'Open {{campaign_title}}.')")
        .execute(&pool)
        .await
        .unwrap();
    let content = PgContentStore::new(pool);

    let rules = content.rule_modules(&["core".to_owned()]).await.unwrap();
    let intro = content.prompt_template("campaign_intro").await.unwrap();

    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].content, "Roll d8s.");
    assert_eq!(intro.as_deref(), Some("Open {{campaign_title}}."));
}
