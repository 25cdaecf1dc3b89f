//! In-memory and failing `GameStore` implementations.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cortex_core::entity::{
    Attributes, Campaign, Character, ContextSummary, EncounterScope, Message, MessageRole,
    NewMessage, NewThreat, Skills, Threat, ThreatStatus,
};
use cortex_core::error::DomainError;
use cortex_core::repository::{
    CampaignRepository, CharacterRepository, MessageRepository, SummaryRepository,
    ThreatRepository,
};
use uuid::Uuid;

/// A campaign fixture.
#[must_use]
pub fn sample_campaign() -> Campaign {
    Campaign {
        id: Uuid::new_v4(),
        title: "Neon Abyss".to_owned(),
        description: "A drowned megacity ruled by rogue AIs.".to_owned(),
    }
}

/// A character fixture enrolled in `campaign_id`, at full default vitals.
#[must_use]
pub fn sample_character(campaign_id: Uuid) -> Character {
    Character {
        id: Uuid::new_v4(),
        campaign_id: Some(campaign_id),
        user_id: Uuid::new_v4(),
        name: "Vex".to_owned(),
        physical_description: "Chrome jaw, tired eyes.".to_owned(),
        origin_description: "Former corporate courier.".to_owned(),
        attributes: Attributes::from_primary(5, 3, 4),
        skills: Skills {
            passive: "Street Sense".to_owned(),
            active1: "Overload".to_owned(),
            active2: "Ghost Step".to_owned(),
            details: None,
            equipment: None,
        },
        current_hp: Some(10),
        max_hp: Some(10),
        current_mp: Some(5),
        max_mp: Some(5),
    }
}

#[derive(Debug, Default)]
struct State {
    campaigns: HashMap<Uuid, Campaign>,
    characters: HashMap<Uuid, Character>,
    threats: Vec<Threat>,
    messages: Vec<Message>,
    summaries: Vec<ContextSummary>,
}

/// A fully working in-memory store. Individual write families can be switched
/// to fail so tests can check that mechanics groups are applied
/// independently.
#[derive(Debug, Default)]
pub struct InMemoryGameStore {
    state: Mutex<State>,
    vitals_writes: AtomicUsize,
    threat_writes: AtomicUsize,
    fail_vitals: AtomicBool,
    fail_threats: AtomicBool,
    fail_messages: AtomicBool,
    fail_summaries: AtomicBool,
}

impl InMemoryGameStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a campaign.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_campaign(self, campaign: Campaign) -> Self {
        self.state
            .lock()
            .unwrap()
            .campaigns
            .insert(campaign.id, campaign);
        self
    }

    /// Seeds a character.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_character(self, character: Character) -> Self {
        self.state
            .lock()
            .unwrap()
            .characters
            .insert(character.id, character);
        self
    }

    /// Seeds a threat row.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_threat(self, threat: Threat) -> Self {
        self.state.lock().unwrap().threats.push(threat);
        self
    }

    /// Seeds `count` alternating user/assistant messages for a campaign.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_history(self, campaign_id: Uuid, count: usize, at: DateTime<Utc>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for i in 0..count {
                let (role, content) = if i % 2 == 0 {
                    (MessageRole::User, format!("I press on ({i})."))
                } else {
                    (
                        MessageRole::Assistant,
                        format!("The corridor hums around you ({i})."),
                    )
                };
                let position = Self::next_position(&state, campaign_id);
                state.messages.push(Message {
                    id: Uuid::new_v4(),
                    campaign_id,
                    position,
                    role,
                    content,
                    created_at: at,
                });
            }
        }
        self
    }

    /// Seeds a summary row.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_summary(self, campaign_id: Uuid, summary: &str, at: DateTime<Utc>) -> Self {
        self.state.lock().unwrap().summaries.push(ContextSummary {
            id: Uuid::new_v4(),
            campaign_id,
            summary: summary.to_owned(),
            created_at: at,
        });
        self
    }

    /// Makes every vitals write fail.
    pub fn fail_vitals_writes(&self) {
        self.fail_vitals.store(true, Ordering::SeqCst);
    }

    /// Makes every threat insert/update fail.
    pub fn fail_threat_writes(&self) {
        self.fail_threats.store(true, Ordering::SeqCst);
    }

    /// Makes every message append fail.
    pub fn fail_message_writes(&self) {
        self.fail_messages.store(true, Ordering::SeqCst);
    }

    /// Makes every summary insert fail.
    pub fn fail_summary_writes(&self) {
        self.fail_summaries.store(true, Ordering::SeqCst);
    }

    /// Current snapshot of a character.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn character(&self, character_id: Uuid) -> Option<Character> {
        self.state
            .lock()
            .unwrap()
            .characters
            .get(&character_id)
            .cloned()
    }

    /// Every threat row, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn threats(&self) -> Vec<Threat> {
        self.state.lock().unwrap().threats.clone()
    }

    /// Every message row, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().unwrap().messages.clone()
    }

    /// Every summary row, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn summaries(&self) -> Vec<ContextSummary> {
        self.state.lock().unwrap().summaries.clone()
    }

    /// Number of successful vitals writes.
    #[must_use]
    pub fn vitals_writes(&self) -> usize {
        self.vitals_writes.load(Ordering::SeqCst)
    }

    /// Number of successful threat inserts, updates and flee transitions.
    #[must_use]
    pub fn threat_writes(&self) -> usize {
        self.threat_writes.load(Ordering::SeqCst)
    }

    fn next_position(state: &State, campaign_id: Uuid) -> u64 {
        state
            .messages
            .iter()
            .filter(|m| m.campaign_id == campaign_id)
            .count() as u64
            + 1
    }

    fn check(flag: &AtomicBool) -> Result<(), DomainError> {
        if flag.load(Ordering::SeqCst) {
            Err(DomainError::Infrastructure("write rejected".into()))
        } else {
            Ok(())
        }
    }
}

fn in_scope(threat: &Threat, scope: EncounterScope) -> bool {
    threat.campaign_id == scope.campaign_id && threat.character_id == scope.character_id
}

#[async_trait]
impl CampaignRepository for InMemoryGameStore {
    async fn find_campaign(&self, campaign_id: Uuid) -> Result<Option<Campaign>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .campaigns
            .get(&campaign_id)
            .cloned())
    }
}

#[async_trait]
impl CharacterRepository for InMemoryGameStore {
    async fn find_character(&self, character_id: Uuid) -> Result<Option<Character>, DomainError> {
        Ok(self.character(character_id))
    }

    async fn update_vitals(
        &self,
        character_id: Uuid,
        current_hp: i32,
        current_mp: i32,
    ) -> Result<(), DomainError> {
        Self::check(&self.fail_vitals)?;
        let mut state = self.state.lock().unwrap();
        let character = state
            .characters
            .get_mut(&character_id)
            .ok_or(DomainError::EntityNotFound(character_id))?;
        character.current_hp = Some(current_hp);
        character.current_mp = Some(current_mp);
        self.vitals_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ThreatRepository for InMemoryGameStore {
    async fn active_threats(&self, scope: EncounterScope) -> Result<Vec<Threat>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .threats
            .iter()
            .filter(|t| in_scope(t, scope) && t.status == ThreatStatus::Active)
            .cloned()
            .collect())
    }

    async fn insert_threat(&self, threat: NewThreat) -> Result<Threat, DomainError> {
        Self::check(&self.fail_threats)?;
        let row = Threat {
            id: Uuid::new_v4(),
            campaign_id: threat.scope.campaign_id,
            character_id: threat.scope.character_id,
            name: threat.name,
            current_hp: threat.hp,
            max_hp: threat.hp,
            status: ThreatStatus::Active,
            created_at: threat.created_at,
        };
        self.state.lock().unwrap().threats.push(row.clone());
        self.threat_writes.fetch_add(1, Ordering::SeqCst);
        Ok(row)
    }

    async fn find_active_threat(
        &self,
        scope: EncounterScope,
        name: &str,
    ) -> Result<Option<Threat>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .threats
            .iter()
            .find(|t| {
                in_scope(t, scope)
                    && t.status == ThreatStatus::Active
                    && t.name.eq_ignore_ascii_case(name)
            })
            .cloned())
    }

    async fn update_threat(
        &self,
        threat_id: Uuid,
        current_hp: i32,
        status: ThreatStatus,
    ) -> Result<(), DomainError> {
        Self::check(&self.fail_threats)?;
        let mut state = self.state.lock().unwrap();
        let threat = state
            .threats
            .iter_mut()
            .find(|t| t.id == threat_id)
            .ok_or(DomainError::EntityNotFound(threat_id))?;
        threat.current_hp = current_hp;
        threat.status = status;
        self.threat_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn mark_fled(&self, scope: EncounterScope, name: &str) -> Result<u64, DomainError> {
        Self::check(&self.fail_threats)?;
        let mut state = self.state.lock().unwrap();
        let mut changed = 0;
        for threat in state.threats.iter_mut().filter(|t| {
            in_scope(t, scope) && t.status == ThreatStatus::Active && t.name.eq_ignore_ascii_case(name)
        }) {
            threat.status = ThreatStatus::Fled;
            changed += 1;
        }
        if changed > 0 {
            self.threat_writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(changed)
    }
}

#[async_trait]
impl MessageRepository for InMemoryGameStore {
    async fn append_message(&self, message: NewMessage) -> Result<Message, DomainError> {
        Self::check(&self.fail_messages)?;
        let mut state = self.state.lock().unwrap();
        let row = Message {
            id: Uuid::new_v4(),
            campaign_id: message.campaign_id,
            position: Self::next_position(&state, message.campaign_id),
            role: message.role,
            content: message.content,
            created_at: message.created_at,
        };
        state.messages.push(row.clone());
        Ok(row)
    }

    async fn recent_messages(
        &self,
        campaign_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Message>, DomainError> {
        let state = self.state.lock().unwrap();
        let all: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.campaign_id == campaign_id)
            .cloned()
            .collect();
        let skip = all.len().saturating_sub(limit);
        Ok(all.into_iter().skip(skip).collect())
    }
}

#[async_trait]
impl SummaryRepository for InMemoryGameStore {
    async fn latest_summary(
        &self,
        campaign_id: Uuid,
    ) -> Result<Option<ContextSummary>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .summaries
            .iter()
            .rev()
            .find(|s| s.campaign_id == campaign_id)
            .cloned())
    }

    async fn insert_summary(
        &self,
        campaign_id: Uuid,
        summary: String,
        created_at: DateTime<Utc>,
    ) -> Result<ContextSummary, DomainError> {
        Self::check(&self.fail_summaries)?;
        let row = ContextSummary {
            id: Uuid::new_v4(),
            campaign_id,
            summary,
            created_at,
        };
        self.state.lock().unwrap().summaries.push(row.clone());
        Ok(row)
    }
}

/// A store whose every call returns an infrastructure error.
#[derive(Debug)]
pub struct FailingGameStore;

fn refused<T>() -> Result<T, DomainError> {
    Err(DomainError::Infrastructure("connection refused".into()))
}

#[async_trait]
impl CampaignRepository for FailingGameStore {
    async fn find_campaign(&self, _campaign_id: Uuid) -> Result<Option<Campaign>, DomainError> {
        refused()
    }
}

#[async_trait]
impl CharacterRepository for FailingGameStore {
    async fn find_character(&self, _character_id: Uuid) -> Result<Option<Character>, DomainError> {
        refused()
    }

    async fn update_vitals(
        &self,
        _character_id: Uuid,
        _current_hp: i32,
        _current_mp: i32,
    ) -> Result<(), DomainError> {
        refused()
    }
}

#[async_trait]
impl ThreatRepository for FailingGameStore {
    async fn active_threats(&self, _scope: EncounterScope) -> Result<Vec<Threat>, DomainError> {
        refused()
    }

    async fn insert_threat(&self, _threat: NewThreat) -> Result<Threat, DomainError> {
        refused()
    }

    async fn find_active_threat(
        &self,
        _scope: EncounterScope,
        _name: &str,
    ) -> Result<Option<Threat>, DomainError> {
        refused()
    }

    async fn update_threat(
        &self,
        _threat_id: Uuid,
        _current_hp: i32,
        _status: ThreatStatus,
    ) -> Result<(), DomainError> {
        refused()
    }

    async fn mark_fled(&self, _scope: EncounterScope, _name: &str) -> Result<u64, DomainError> {
        refused()
    }
}

#[async_trait]
impl MessageRepository for FailingGameStore {
    async fn append_message(&self, _message: NewMessage) -> Result<Message, DomainError> {
        refused()
    }

    async fn recent_messages(
        &self,
        _campaign_id: Uuid,
        _limit: usize,
    ) -> Result<Vec<Message>, DomainError> {
        refused()
    }
}

#[async_trait]
impl SummaryRepository for FailingGameStore {
    async fn latest_summary(
        &self,
        _campaign_id: Uuid,
    ) -> Result<Option<ContextSummary>, DomainError> {
        refused()
    }

    async fn insert_summary(
        &self,
        _campaign_id: Uuid,
        _summary: String,
        _created_at: DateTime<Utc>,
    ) -> Result<ContextSummary, DomainError> {
        refused()
    }
}
