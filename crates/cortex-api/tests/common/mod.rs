//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use cortex_api::build_router;
use cortex_api::state::AppState;
use cortex_core::entity::{Campaign, Character, EncounterScope};
use cortex_dice::application::cascade::{CascadeTiming, SharedRng};
use cortex_narrative::application::pipeline::{AgentSettings, TurnPipeline};
use cortex_test_support::{
    FixedClock, InMemoryGameStore, ScriptedBackend, SequenceRng, StaticContentStore,
    sample_campaign, sample_character,
};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// A narrator answer that hurts the character and spawns one drone.
pub const VALID_TURN: &str = r#"{
  "narrative": { "text": "A drone drops from the ceiling." },
  "mechanics": {
    "player_updates": { "hp_change": -2, "mp_change": 0 },
    "threats_layer": { "spawn": [{ "name": "Drone", "base_hp": 5 }], "modify": [], "remove": [] }
  },
  "world_state": {}
}"#;

/// Everything a test may want to inspect after driving the router.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryGameStore>,
    pub pipeline: Arc<TurnPipeline>,
    pub campaign: Campaign,
    pub character: Character,
}

impl TestApp {
    pub fn scope(&self) -> EncounterScope {
        EncounterScope::new(self.campaign.id, self.character.id)
    }
}

fn settings() -> AgentSettings {
    AgentSettings {
        operator_model: "operator".into(),
        narrator_model: "narrator".into(),
        summarizer_model: "summarizer".into(),
        generation_timeout: Duration::from_secs(5),
        summary_timeout: Duration::from_secs(5),
    }
}

/// Builds the full router over in-memory doubles. Dice rolls use `faces`
/// and settle instantly.
pub fn build_test_app(backend: ScriptedBackend, faces: Vec<u32>) -> TestApp {
    let campaign = sample_campaign();
    let character = sample_character(campaign.id);
    let store = Arc::new(
        InMemoryGameStore::new()
            .with_campaign(campaign.clone())
            .with_character(character.clone()),
    );
    let pipeline = Arc::new(TurnPipeline::new(
        store.clone(),
        Arc::new(StaticContentStore::new().with_rule("core", "Roll d8s; evens succeed.")),
        Arc::new(backend),
        Arc::new(ScriptedBackend::new().respond("summarizer", "Summary.")),
        Arc::new(FixedClock::default()),
        settings(),
    ));
    let rng: SharedRng = Arc::new(Mutex::new(SequenceRng::new(faces)));
    let router = build_router(AppState::new(
        Arc::clone(&pipeline),
        rng,
        CascadeTiming::instant(),
    ));

    TestApp {
        router,
        store,
        pipeline,
        campaign,
        character,
    }
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
