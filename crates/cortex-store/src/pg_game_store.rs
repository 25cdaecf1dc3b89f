//! `PostgreSQL` implementation of every `GameStore` repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cortex_core::entity::{
    Campaign, Character, ContextSummary, EncounterScope, Message, NewMessage, NewThreat, Threat,
    ThreatStatus,
};
use cortex_core::error::DomainError;
use cortex_core::repository::{
    CampaignRepository, CharacterRepository, MessageRepository, SummaryRepository,
    ThreatRepository,
};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::schema::{
    CAMPAIGN_COLUMNS, CHARACTER_COLUMNS, MESSAGE_COLUMNS, SUMMARY_COLUMNS, THREAT_COLUMNS,
    campaign_from_row, character_from_row, infra, message_from_row, summary_from_row,
    threat_from_row,
};

/// PostgreSQL-backed game store.
#[derive(Debug, Clone)]
pub struct PgGameStore {
    pool: PgPool,
}

impl PgGameStore {
    /// Creates a new `PgGameStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl CampaignRepository for PgGameStore {
    async fn find_campaign(&self, campaign_id: Uuid) -> Result<Option<Campaign>, DomainError> {
        let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1");
        sqlx::query(&sql)
            .bind(campaign_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .map(|row| campaign_from_row(&row))
            .transpose()
            .map_err(infra)
    }
}

#[async_trait]
impl CharacterRepository for PgGameStore {
    async fn find_character(&self, character_id: Uuid) -> Result<Option<Character>, DomainError> {
        let sql = format!("SELECT {CHARACTER_COLUMNS} FROM characters WHERE id = $1");
        sqlx::query(&sql)
            .bind(character_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .map(|row| character_from_row(&row))
            .transpose()
            .map_err(infra)
    }

    async fn update_vitals(
        &self,
        character_id: Uuid,
        current_hp: i32,
        current_mp: i32,
    ) -> Result<(), DomainError> {
        let result =
            sqlx::query("UPDATE characters SET current_hp = $2, current_mp = $3 WHERE id = $1")
                .bind(character_id)
                .bind(current_hp)
                .bind(current_mp)
                .execute(&self.pool)
                .await
                .map_err(infra)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound(character_id));
        }
        Ok(())
    }
}

#[async_trait]
impl ThreatRepository for PgGameStore {
    async fn active_threats(&self, scope: EncounterScope) -> Result<Vec<Threat>, DomainError> {
        let sql = format!(
            "SELECT {THREAT_COLUMNS} FROM threats \
             WHERE campaign_id = $1 AND character_id = $2 AND status = 'active' \
             ORDER BY created_at, id"
        );
        let rows = sqlx::query(&sql)
            .bind(scope.campaign_id)
            .bind(scope.character_id)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?;
        rows.iter()
            .map(threat_from_row)
            .collect::<Result<_, _>>()
            .map_err(infra)
    }

    async fn insert_threat(&self, threat: NewThreat) -> Result<Threat, DomainError> {
        let sql = format!(
            "INSERT INTO threats (id, campaign_id, character_id, name, current_hp, max_hp, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $5, 'active', $6) \
             RETURNING {THREAT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::now_v7())
            .bind(threat.scope.campaign_id)
            .bind(threat.scope.character_id)
            .bind(&threat.name)
            .bind(threat.hp)
            .bind(threat.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(infra)?;
        threat_from_row(&row).map_err(infra)
    }

    async fn find_active_threat(
        &self,
        scope: EncounterScope,
        name: &str,
    ) -> Result<Option<Threat>, DomainError> {
        let sql = format!(
            "SELECT {THREAT_COLUMNS} FROM threats \
             WHERE campaign_id = $1 AND character_id = $2 AND status = 'active' \
               AND lower(name) = lower($3) \
             ORDER BY created_at, id LIMIT 1"
        );
        sqlx::query(&sql)
            .bind(scope.campaign_id)
            .bind(scope.character_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .map(|row| threat_from_row(&row))
            .transpose()
            .map_err(infra)
    }

    async fn update_threat(
        &self,
        threat_id: Uuid,
        current_hp: i32,
        status: ThreatStatus,
    ) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE threats SET current_hp = $2, status = $3 WHERE id = $1")
            .bind(threat_id)
            .bind(current_hp)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound(threat_id));
        }
        Ok(())
    }

    async fn mark_fled(&self, scope: EncounterScope, name: &str) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "UPDATE threats SET status = 'fled' \
             WHERE campaign_id = $1 AND character_id = $2 AND status = 'active' \
               AND lower(name) = lower($3)",
        )
        .bind(scope.campaign_id)
        .bind(scope.character_id)
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        debug!(name, fled = result.rows_affected(), "threats marked fled");
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl MessageRepository for PgGameStore {
    async fn append_message(&self, message: NewMessage) -> Result<Message, DomainError> {
        // The counter row lock serialises appends within one campaign.
        let sql = format!(
            "WITH bumped AS ( \
               UPDATE campaigns SET message_count = message_count + 1 \
               WHERE id = $2 RETURNING message_count \
             ) \
             INSERT INTO messages (id, campaign_id, position, role, content, created_at) \
             SELECT $1, $2, bumped.message_count, $3, $4, $5 FROM bumped \
             RETURNING {MESSAGE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::now_v7())
            .bind(message.campaign_id)
            .bind(message.role.as_str())
            .bind(&message.content)
            .bind(message.created_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .ok_or(DomainError::EntityNotFound(message.campaign_id))?;
        let stored = message_from_row(&row).map_err(infra)?;
        debug!(position = stored.position, "message appended");
        Ok(stored)
    }

    async fn recent_messages(
        &self,
        campaign_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Message>, DomainError> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM ( \
               SELECT seq, {MESSAGE_COLUMNS} FROM messages \
               WHERE campaign_id = $1 ORDER BY seq DESC LIMIT $2 \
             ) recent ORDER BY seq"
        );
        let rows = sqlx::query(&sql)
            .bind(campaign_id)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?;
        rows.iter()
            .map(message_from_row)
            .collect::<Result<_, _>>()
            .map_err(infra)
    }
}

#[async_trait]
impl SummaryRepository for PgGameStore {
    async fn latest_summary(
        &self,
        campaign_id: Uuid,
    ) -> Result<Option<ContextSummary>, DomainError> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM context_summaries \
             WHERE campaign_id = $1 ORDER BY seq DESC LIMIT 1"
        );
        sqlx::query(&sql)
            .bind(campaign_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .map(|row| summary_from_row(&row))
            .transpose()
            .map_err(infra)
    }

    async fn insert_summary(
        &self,
        campaign_id: Uuid,
        summary: String,
        created_at: DateTime<Utc>,
    ) -> Result<ContextSummary, DomainError> {
        let sql = format!(
            "INSERT INTO context_summaries (id, campaign_id, summary, created_at) \
             VALUES ($1, $2, $3, $4) RETURNING {SUMMARY_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::now_v7())
            .bind(campaign_id)
            .bind(summary)
            .bind(created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(infra)?;
        summary_from_row(&row).map_err(infra)
    }
}
