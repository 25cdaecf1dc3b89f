//! Row decoding for the tables created by `migrations/0001_init.sql`.

use cortex_core::content::ContentBlock;
use cortex_core::entity::{
    Attributes, Campaign, Character, ContextSummary, Message, MessageRole, Skills, Threat,
    ThreatStatus,
};
use cortex_core::error::DomainError;
use sqlx::Row;
use sqlx::postgres::PgRow;
use sqlx::types::Json;

/// Column list matching [`campaign_from_row`].
pub const CAMPAIGN_COLUMNS: &str = "id, title, description";

/// Column list matching [`character_from_row`].
pub const CHARACTER_COLUMNS: &str = "id, campaign_id, user_id, name, physical_description, \
     origin_description, attributes, skills, current_hp, max_hp, current_mp, max_mp";

/// Column list matching [`threat_from_row`].
pub const THREAT_COLUMNS: &str =
    "id, campaign_id, character_id, name, current_hp, max_hp, status, created_at";

/// Column list matching [`message_from_row`].
pub const MESSAGE_COLUMNS: &str = "id, campaign_id, position, role, content, created_at";

/// Column list matching [`summary_from_row`].
pub const SUMMARY_COLUMNS: &str = "id, campaign_id, summary, created_at";

/// Maps a driver error onto the domain's infrastructure variant.
pub fn infra(e: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(e.to_string())
}

fn decode_err(e: DomainError) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(e))
}

/// Decodes a `campaigns` row.
///
/// # Errors
///
/// Returns `sqlx::Error` if a column is missing or has the wrong type.
pub fn campaign_from_row(row: &PgRow) -> Result<Campaign, sqlx::Error> {
    Ok(Campaign {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
    })
}

/// Decodes a `characters` row. Attributes and skills are stored as JSONB.
///
/// # Errors
///
/// Returns `sqlx::Error` if a column is missing or does not decode.
pub fn character_from_row(row: &PgRow) -> Result<Character, sqlx::Error> {
    let attributes: Json<Attributes> = row.try_get("attributes")?;
    let skills: Json<Skills> = row.try_get("skills")?;
    Ok(Character {
        id: row.try_get("id")?,
        campaign_id: row.try_get("campaign_id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        physical_description: row.try_get("physical_description")?,
        origin_description: row.try_get("origin_description")?,
        attributes: attributes.0,
        skills: skills.0,
        current_hp: row.try_get("current_hp")?,
        max_hp: row.try_get("max_hp")?,
        current_mp: row.try_get("current_mp")?,
        max_mp: row.try_get("max_mp")?,
    })
}

/// Decodes a `threats` row.
///
/// # Errors
///
/// Returns `sqlx::Error` if a column is missing or the status is unknown.
pub fn threat_from_row(row: &PgRow) -> Result<Threat, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Threat {
        id: row.try_get("id")?,
        campaign_id: row.try_get("campaign_id")?,
        character_id: row.try_get("character_id")?,
        name: row.try_get("name")?,
        current_hp: row.try_get("current_hp")?,
        max_hp: row.try_get("max_hp")?,
        status: status.parse::<ThreatStatus>().map_err(decode_err)?,
        created_at: row.try_get("created_at")?,
    })
}

/// Decodes a `messages` row.
///
/// # Errors
///
/// Returns `sqlx::Error` if a column is missing or the role is unknown.
pub fn message_from_row(row: &PgRow) -> Result<Message, sqlx::Error> {
    let role: String = row.try_get("role")?;
    let position: i64 = row.try_get("position")?;
    Ok(Message {
        id: row.try_get("id")?,
        campaign_id: row.try_get("campaign_id")?,
        position: u64::try_from(position).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        role: role.parse::<MessageRole>().map_err(decode_err)?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Decodes a `context_summaries` row.
///
/// # Errors
///
/// Returns `sqlx::Error` if a column is missing.
pub fn summary_from_row(row: &PgRow) -> Result<ContextSummary, sqlx::Error> {
    Ok(ContextSummary {
        id: row.try_get("id")?,
        campaign_id: row.try_get("campaign_id")?,
        summary: row.try_get("summary")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Decodes a `rule_modules` or `instruction_guides` row.
///
/// # Errors
///
/// Returns `sqlx::Error` if a column is missing.
pub fn block_from_row(row: &PgRow) -> Result<ContentBlock, sqlx::Error> {
    Ok(ContentBlock {
        category: row.try_get("category")?,
        content: row.try_get("content")?,
    })
}
