//! Persistent store abstractions.
//!
//! Each trait covers one record family from [`crate::entity`]. Schema
//! management lives outside the core; implementations only need to honour
//! the read/write contracts documented here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entity::{
    Campaign, Character, ContextSummary, EncounterScope, Message, NewMessage, NewThreat, Threat,
    ThreatStatus,
};
use crate::error::DomainError;

/// Read access to campaigns.
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Loads a campaign by ID.
    async fn find_campaign(&self, campaign_id: Uuid) -> Result<Option<Campaign>, DomainError>;
}

/// Read access to characters plus the single vitals write the pipeline makes.
#[async_trait]
pub trait CharacterRepository: Send + Sync {
    /// Loads a character by ID.
    async fn find_character(&self, character_id: Uuid) -> Result<Option<Character>, DomainError>;

    /// Persists new current HP and MP values for a character.
    async fn update_vitals(
        &self,
        character_id: Uuid,
        current_hp: i32,
        current_mp: i32,
    ) -> Result<(), DomainError>;
}

/// Threat roster for an encounter.
#[async_trait]
pub trait ThreatRepository: Send + Sync {
    /// All threats in the scope whose status is `active`, oldest first.
    async fn active_threats(&self, scope: EncounterScope) -> Result<Vec<Threat>, DomainError>;

    /// Inserts an `active` threat with `current_hp = max_hp = hp`.
    async fn insert_threat(&self, threat: NewThreat) -> Result<Threat, DomainError>;

    /// Finds the active threat in the scope whose name matches
    /// case-insensitively.
    async fn find_active_threat(
        &self,
        scope: EncounterScope,
        name: &str,
    ) -> Result<Option<Threat>, DomainError>;

    /// Overwrites a threat's HP and status.
    async fn update_threat(
        &self,
        threat_id: Uuid,
        current_hp: i32,
        status: ThreatStatus,
    ) -> Result<(), DomainError>;

    /// Moves every active threat in the scope whose name matches
    /// case-insensitively to `fled`. Returns the number of rows changed.
    async fn mark_fled(&self, scope: EncounterScope, name: &str) -> Result<u64, DomainError>;
}

/// Append-only campaign message log.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Appends a message at the next free position of its campaign log.
    async fn append_message(&self, message: NewMessage) -> Result<Message, DomainError>;

    /// The newest `limit` messages of a campaign, returned oldest first.
    async fn recent_messages(
        &self,
        campaign_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Message>, DomainError>;
}

/// Rolling summary history. Inserts supersede; nothing is merged.
#[async_trait]
pub trait SummaryRepository: Send + Sync {
    /// The newest summary for a campaign, if any.
    async fn latest_summary(&self, campaign_id: Uuid)
    -> Result<Option<ContextSummary>, DomainError>;

    /// Stores a new summary row that replaces the previous one as the
    /// authoritative summary.
    async fn insert_summary(
        &self,
        campaign_id: Uuid,
        summary: String,
        created_at: DateTime<Utc>,
    ) -> Result<ContextSummary, DomainError>;
}

/// Every repository the turn pipeline needs, behind one object.
pub trait GameStore:
    CampaignRepository + CharacterRepository + ThreatRepository + MessageRepository + SummaryRepository
{
}

impl<T> GameStore for T where
    T: CampaignRepository
        + CharacterRepository
        + ThreatRepository
        + MessageRepository
        + SummaryRepository
{
}
