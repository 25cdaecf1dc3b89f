//! Narrator agent: turns the assembled context into prose plus mechanics.

use std::time::Duration;

use cortex_core::content::{ContentStore, resolve_prompt};
use cortex_core::entity::Message;
use cortex_core::generation::{GenerationBackend, GenerationError, GenerationRequest};
use tracing::{debug, warn};

use crate::domain::context::ContextBundle;
use crate::domain::summary::START_OF_ADVENTURE;
use crate::domain::turn::{NarratorOutcome, StyleMode, TurnType, parse_narrator_response};

/// Sampling temperature for narration.
pub const NARRATOR_TEMPERATURE: f32 = 0.7;

/// System directive sent with every narrator call.
pub const NARRATOR_SYSTEM: &str = "You are a JSON-speaking Game Engine.";

/// Template for the first turn of a campaign.
pub const INTRO_TEMPLATE: &str = "campaign_intro";

/// Template for every later turn.
pub const STANDARD_TEMPLATE: &str = "master_interaction";

/// Seed value of the standard template; treated as absent.
const STANDARD_PLACEHOLDER: &str = "Narrate.";

/// Messages of history the narrator sees.
pub const NARRATOR_HISTORY_MESSAGES: usize = 10;

const OUTPUT_CONTRACT: &str = r#"Respond ONLY with one JSON object, no markdown and no text before or after it, shaped as:
{
  "narrative": { "text": string },
  "mechanics": {
    "player_updates": { "hp_change": int, "mp_change": int },
    "threats_layer": {
      "spawn": [{ "name": string, "base_hp": int, "count": int }],
      "modify": [{ "target_name": string, "hp_change": int, "new_status": string }],
      "remove": [string]
    }
  },
  "world_state": object
}"#;

/// Everything the narrator needs for one call.
#[derive(Debug, Clone, Copy)]
pub struct NarratorInput<'a> {
    pub turn_type: TurnType,
    pub style: StyleMode,
    pub bundle: &'a ContextBundle,
    /// Latest rolling summary, if the campaign has one.
    pub summary: Option<&'a str>,
    /// Recent messages, oldest first, excluding the current action.
    pub recent_log: &'a [Message],
    pub action: &'a str,
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() { default } else { value }
}

fn intro_fallback(title: &str, name: &str) -> String {
    format!(
        "You are a cinematic narrator.\nDescribe the world of {title} and the character {name} \
         entering it.\nSet a dark, immersive tone."
    )
}

fn standard_fallback() -> String {
    "You are a Cyberpunk RPG Game Master. Narrate the outcome.\nSTRICT GUIDELINES:\n\
     1. WRITE LIKE A NOVEL. No \"Narrative:\" prefixes.\n\
     2. SHOW, DON'T TELL.\n\
     3. Ask for rolls only if uncertain."
        .to_owned()
}

/// Base instruction for the turn type, from the content store when a
/// usable template exists.
pub async fn base_instruction(
    turn_type: TurnType,
    bundle: &ContextBundle,
    content: &dyn ContentStore,
) -> String {
    match turn_type {
        TurnType::Intro => {
            let title = or_default(&bundle.campaign.title, "Unknown World");
            let description = or_default(&bundle.campaign.description, "A mysterious place.");
            let name = or_default(&bundle.character.name, "Traveler");
            let origin = or_default(&bundle.character.origin_description, "Unknown origin.");
            resolve_prompt(
                content,
                INTRO_TEMPLATE,
                &[
                    ("campaign_title", title),
                    ("campaign_description", description),
                    ("character_name", name),
                    ("character_origin", origin),
                ],
            )
            .await
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| intro_fallback(title, name))
        }
        TurnType::Standard => resolve_prompt(content, STANDARD_TEMPLATE, &[])
            .await
            .filter(|t| !t.trim().is_empty() && t.trim() != STANDARD_PLACEHOLDER)
            .unwrap_or_else(standard_fallback),
    }
}

/// Full user prompt: base instruction, style, context, summary, recent log,
/// action and the output contract.
#[must_use]
pub fn narrator_prompt(base: &str, input: &NarratorInput<'_>) -> String {
    let recent_log = input
        .recent_log
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{base}\n\n{style}\n\nCURRENT CONTEXT:\n{context}\n<game_history>\n{summary}\n</game_history>\n\n\
         <recent_log>\n{recent_log}\n</recent_log>\n\n<player_action>\n{action}\n</player_action>\n\n\
         {OUTPUT_CONTRACT}",
        style = input.style.directive(),
        context = input.bundle.render(),
        summary = input.summary.unwrap_or(START_OF_ADVENTURE),
        action = input.action,
    )
}

/// Calls the narrator and validates its answer.
///
/// # Errors
///
/// Returns the backend's `GenerationError`, or `GenerationError::Timeout`
/// when the call exceeds `timeout`. A response that arrives but cannot be
/// validated is not an error: it comes back as
/// `NarratorOutcome::MalformedResponse`.
pub async fn narrate(
    input: &NarratorInput<'_>,
    backend: &dyn GenerationBackend,
    content: &dyn ContentStore,
    model: &str,
    timeout: Duration,
) -> Result<NarratorOutcome, GenerationError> {
    let base = base_instruction(input.turn_type, input.bundle, content).await;
    let request = GenerationRequest::new(
        NARRATOR_SYSTEM,
        narrator_prompt(&base, input),
        model,
        NARRATOR_TEMPERATURE,
    );

    debug!(turn_type = ?input.turn_type, style = ?input.style, "calling narrator");
    let raw = tokio::time::timeout(timeout, backend.generate(request))
        .await
        .map_err(|_| GenerationError::Timeout(timeout.as_secs()))??;

    let outcome = parse_narrator_response(&raw);
    if let NarratorOutcome::MalformedResponse(raw) = &outcome {
        warn!(raw = %raw, "narrator response failed validation");
    }
    Ok(outcome)
}
