//! Rule-module tag vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A rule-module category the operator may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleTag {
    /// Baseline rules. Always loaded.
    Core,
    Combat,
    Magic,
    Social,
    Exploration,
    Lore,
    Inventory,
}

impl RuleTag {
    /// Tags the operator chooses from.
    pub const SELECTABLE: [Self; 6] = [
        Self::Combat,
        Self::Magic,
        Self::Social,
        Self::Exploration,
        Self::Lore,
        Self::Inventory,
    ];

    /// Content category key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Combat => "combat",
            Self::Magic => "magic",
            Self::Social => "social",
            Self::Exploration => "exploration",
            Self::Lore => "lore",
            Self::Inventory => "inventory",
        }
    }
}

impl fmt::Display for RuleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "core" => Ok(Self::Core),
            "combat" => Ok(Self::Combat),
            "magic" => Ok(Self::Magic),
            "social" => Ok(Self::Social),
            "exploration" => Ok(Self::Exploration),
            "lore" => Ok(Self::Lore),
            "inventory" => Ok(Self::Inventory),
            other => Err(format!("unknown rule tag: {other}")),
        }
    }
}

/// Parses the operator's raw answer: a JSON array of strings, optionally
/// wrapped in a Markdown code fence. Unknown tags and duplicates are
/// dropped; order is kept.
///
/// # Errors
///
/// Returns a description of the problem when the answer is not a JSON array.
pub fn parse_tag_list(raw: &str) -> Result<Vec<RuleTag>, String> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let values: Vec<serde_json::Value> =
        serde_json::from_str(cleaned.trim()).map_err(|e| format!("not a JSON array: {e}"))?;

    let mut tags = Vec::new();
    for tag in values
        .iter()
        .filter_map(serde_json::Value::as_str)
        .filter_map(|s| s.parse::<RuleTag>().ok())
    {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

/// `core` followed by `requested`, without duplicates.
#[must_use]
pub fn with_core(requested: &[RuleTag]) -> Vec<RuleTag> {
    let mut tags = vec![RuleTag::Core];
    for &tag in requested {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_list_reads_plain_array() {
        let tags = parse_tag_list(r#"["combat", "magic"]"#).unwrap();

        assert_eq!(tags, vec![RuleTag::Combat, RuleTag::Magic]);
    }

    #[test]
    fn test_parse_tag_list_strips_code_fence() {
        let tags = parse_tag_list("```json\n[\"Social\"]\n```").unwrap();

        assert_eq!(tags, vec![RuleTag::Social]);
    }

    #[test]
    fn test_parse_tag_list_drops_unknown_and_duplicate_tags() {
        let tags = parse_tag_list(r#"["combat", "hacking", 7, "COMBAT", "lore"]"#).unwrap();

        assert_eq!(tags, vec![RuleTag::Combat, RuleTag::Lore]);
    }

    #[test]
    fn test_parse_tag_list_accepts_empty_array() {
        assert!(parse_tag_list("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_tag_list_rejects_prose() {
        assert!(parse_tag_list("You will need the combat rules.").is_err());
    }

    #[test]
    fn test_with_core_always_leads_with_core() {
        assert_eq!(with_core(&[]), vec![RuleTag::Core]);
        assert_eq!(
            with_core(&[RuleTag::Magic, RuleTag::Core]),
            vec![RuleTag::Core, RuleTag::Magic]
        );
    }
}
