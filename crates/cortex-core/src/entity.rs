//! Persisted records consumed and produced by the turn pipeline.
//!
//! These mirror the rows of the persistent store. Only the Mechanics
//! Resolver writes to character vitals and threats; every other component
//! treats them as read-only input.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Hit points assumed when a character row carries no vitals.
pub const DEFAULT_MAX_HP: i32 = 10;

/// Mana points assumed when a character row carries no vitals.
pub const DEFAULT_MAX_MP: i32 = 5;

/// Both traits of an attribute axis always add up to this total.
pub const ATTRIBUTE_AXIS_TOTAL: i32 = 8;

/// A campaign setting. Read-only during a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    /// Campaign identifier.
    pub id: Uuid,
    /// Display title.
    pub title: String,
    /// Setting description fed to the narrator.
    pub description: String,
}

/// Physical axis: raw force versus agility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalAxis {
    pub brute: i32,
    pub fluid: i32,
}

/// Mental axis: reasoning versus gut feeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentalAxis {
    pub intelligence: i32,
    pub instinct: i32,
}

/// Social axis: open presence versus subtlety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialAxis {
    pub presence: i32,
    pub subtlety: i32,
}

/// The three fixed attribute axes of a character sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub physical: PhysicalAxis,
    pub mental: MentalAxis,
    pub social: SocialAxis,
}

impl Attributes {
    /// Builds a balanced sheet from the first trait of each axis; the
    /// opposing trait takes the remainder of [`ATTRIBUTE_AXIS_TOTAL`].
    #[must_use]
    pub fn from_primary(brute: i32, intelligence: i32, presence: i32) -> Self {
        Self {
            physical: PhysicalAxis {
                brute,
                fluid: ATTRIBUTE_AXIS_TOTAL - brute,
            },
            mental: MentalAxis {
                intelligence,
                instinct: ATTRIBUTE_AXIS_TOTAL - intelligence,
            },
            social: SocialAxis {
                presence,
                subtlety: ATTRIBUTE_AXIS_TOTAL - presence,
            },
        }
    }

    /// Checks that every axis sums to the fixed total with no negative trait.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` naming the first offending axis.
    pub fn validate(&self) -> Result<(), DomainError> {
        let axes = [
            ("physical", self.physical.brute, self.physical.fluid),
            ("mental", self.mental.intelligence, self.mental.instinct),
            ("social", self.social.presence, self.social.subtlety),
        ];
        for (axis, left, right) in axes {
            if left < 0 || right < 0 || left + right != ATTRIBUTE_AXIS_TOTAL {
                return Err(DomainError::Validation(format!(
                    "{axis} axis must split {ATTRIBUTE_AXIS_TOTAL} points between its two traits"
                )));
            }
        }
        Ok(())
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self::from_primary(4, 4, 4)
    }
}

/// Generated effect and cost text for one ability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDetail {
    #[serde(default)]
    pub effect: String,
    #[serde(default)]
    pub cost: String,
}

/// Effect/cost text for each of the three abilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDetails {
    #[serde(default)]
    pub passive: SkillDetail,
    #[serde(default)]
    pub active1: SkillDetail,
    #[serde(default)]
    pub active2: SkillDetail,
}

/// Starting weapon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub attribute: String,
    #[serde(default)]
    pub effect: String,
}

/// Starting armor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Armor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ac: String,
    #[serde(default)]
    pub effect: String,
}

/// Optional starting equipment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default)]
    pub weapon: Weapon,
    #[serde(default)]
    pub armor: Armor,
}

/// One passive and two active abilities, plus optional generated detail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skills {
    #[serde(default)]
    pub passive: String,
    #[serde(default)]
    pub active1: String,
    #[serde(default)]
    pub active2: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<SkillDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<Equipment>,
}

/// Current/max hit-point and mana-point pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    pub current_hp: i32,
    pub max_hp: i32,
    pub current_mp: i32,
    pub max_mp: i32,
}

/// A player character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Character identifier.
    pub id: Uuid,
    /// Campaign the character is currently playing, if any.
    pub campaign_id: Option<Uuid>,
    /// Owning user.
    pub user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Visual appearance.
    pub physical_description: String,
    /// Backstory / origin.
    pub origin_description: String,
    /// Attribute axes.
    pub attributes: Attributes,
    /// Abilities and equipment.
    pub skills: Skills,
    pub current_hp: Option<i32>,
    pub max_hp: Option<i32>,
    pub current_mp: Option<i32>,
    pub max_mp: Option<i32>,
}

impl Character {
    /// Returns the character's vitals, filling absent columns with the
    /// 10/10 HP and 5/5 MP defaults.
    #[must_use]
    pub fn vitals(&self) -> Vitals {
        let max_hp = self.max_hp.unwrap_or(DEFAULT_MAX_HP);
        let max_mp = self.max_mp.unwrap_or(DEFAULT_MAX_MP);
        Vitals {
            current_hp: self.current_hp.unwrap_or(max_hp),
            max_hp,
            current_mp: self.current_mp.unwrap_or(max_mp),
            max_mp,
        }
    }
}

/// Campaign + character pair that scopes an encounter's threats and the
/// single-flight turn gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EncounterScope {
    pub campaign_id: Uuid,
    pub character_id: Uuid,
}

impl EncounterScope {
    /// Creates a new scope.
    #[must_use]
    pub fn new(campaign_id: Uuid, character_id: Uuid) -> Self {
        Self {
            campaign_id,
            character_id,
        }
    }
}

/// Lifecycle of a threat. Threats are never deleted, only moved out of
/// `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatStatus {
    Active,
    Defeated,
    Fled,
}

impl ThreatStatus {
    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Defeated => "defeated",
            Self::Fled => "fled",
        }
    }
}

impl fmt::Display for ThreatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreatStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "defeated" => Ok(Self::Defeated),
            "fled" => Ok(Self::Fled),
            other => Err(DomainError::Validation(format!(
                "unknown threat status: {other}"
            ))),
        }
    }
}

/// An adversary scoped to a character's current encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threat {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub character_id: Uuid,
    pub name: String,
    pub current_hp: i32,
    pub max_hp: i32,
    pub status: ThreatStatus,
    pub created_at: DateTime<Utc>,
}

impl Threat {
    /// The encounter this threat belongs to.
    #[must_use]
    pub fn scope(&self) -> EncounterScope {
        EncounterScope::new(self.campaign_id, self.character_id)
    }
}

/// Insert payload for a freshly spawned threat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewThreat {
    pub scope: EncounterScope,
    pub name: String,
    pub hp: i32,
    pub created_at: DateTime<Utc>,
}

/// Author of a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            other => Err(DomainError::Validation(format!(
                "unknown message role: {other}"
            ))),
        }
    }
}

/// One entry of the append-only campaign log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub campaign_id: Uuid,
    /// 1-based place in the campaign log. Each value is handed out once.
    pub position: u64,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub campaign_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Rolling narrative summary. The newest row per campaign is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSummary {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}
