//! Turn type, style directive and the narrator's response contract.

use cortex_mechanics::domain::deltas::Mechanics;
use serde::{Deserialize, Serialize};

/// Shown to the player whenever a turn cannot be resolved.
pub const TRANSMISSION_ERROR: &str =
    "NEURAL SYNC ERROR: the transmission was lost in the static. Try again.";

/// Which base instruction the narrator receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnType {
    /// First turn of a campaign.
    Intro,
    /// Every later turn.
    Standard,
}

impl TurnType {
    /// `Intro` when the campaign has no prior messages.
    #[must_use]
    pub fn from_history_len(len: usize) -> Self {
        if len == 0 { Self::Intro } else { Self::Standard }
    }
}

/// Narrative tone. Governs wording only, never the response structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleMode {
    Tactical,
    #[default]
    Neutral,
    Immersive,
}

impl StyleMode {
    /// Maps the numeric selector used by clients: 1 tactical, 2 neutral,
    /// 3 immersive. Anything else is neutral.
    #[must_use]
    pub fn from_selector(selector: i64) -> Self {
        match selector {
            1 => Self::Tactical,
            3 => Self::Immersive,
            _ => Self::Neutral,
        }
    }

    /// Directive appended to the narrator prompt.
    #[must_use]
    pub fn directive(self) -> &'static str {
        match self {
            Self::Tactical => {
                "STYLE DIRECTIVE: TACTICAL MODE (OBJECTIVE AND CASUAL). Be extremely concise. \
                 Use short sentences. Focus entirely on the immediate action. Avoid adjectives, \
                 metaphors or poetic description. Get straight to the point."
            }
            Self::Neutral => {
                "STYLE DIRECTIVE: NEUTRAL MODE. Use the occasional adjective to illustrate the \
                 scene, but keep the language objective and simple."
            }
            Self::Immersive => {
                "STYLE DIRECTIVE: IMMERSIVE MODE (IMAGINATIVE AND EVOCATIVE). Be eloquent and \
                 literary. Explore the atmosphere, the five senses (smells, sounds, lights) and \
                 the drama of the scene. Use rich vocabulary."
            }
        }
    }
}

/// A narrator response that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NarratorTurn {
    /// Prose shown to the player.
    pub narrative: String,
    /// State changes to apply.
    pub mechanics: Mechanics,
    /// Free-form world notes. Logged, not stored.
    pub world_state: serde_json::Value,
}

/// Result of parsing a narrator response. Only `ValidTurn` carries
/// mechanics.
#[derive(Debug, Clone, PartialEq)]
pub enum NarratorOutcome {
    ValidTurn(NarratorTurn),
    /// The raw response, kept for logging.
    MalformedResponse(String),
}

#[derive(Debug, Deserialize)]
struct WireTurn {
    #[serde(default)]
    narrative: Option<WireNarrative>,
    #[serde(default)]
    mechanics: Option<Mechanics>,
    #[serde(default)]
    world_state: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WireNarrative {
    #[serde(default)]
    text: Option<String>,
}

/// Returns the first balanced `{...}` span in `raw`. Braces inside JSON
/// string literals are ignored.
#[must_use]
pub fn first_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Validates a raw narrator response.
#[must_use]
pub fn parse_narrator_response(raw: &str) -> NarratorOutcome {
    let malformed = || NarratorOutcome::MalformedResponse(raw.to_owned());

    let Some(span) = first_json_object(raw) else {
        return malformed();
    };
    let Ok(wire) = serde_json::from_str::<WireTurn>(span) else {
        return malformed();
    };
    let Some(narrative) = wire
        .narrative
        .and_then(|n| n.text)
        .filter(|text| !text.trim().is_empty())
    else {
        return malformed();
    };

    NarratorOutcome::ValidTurn(NarratorTurn {
        narrative,
        mechanics: wire.mechanics.unwrap_or_default(),
        world_state: wire.world_state,
    })
}
