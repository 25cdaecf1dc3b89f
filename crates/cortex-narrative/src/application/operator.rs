//! Operator agent: picks the rule modules a player action needs.
//!
//! The operator only ever narrows context. Any failure degrades to an empty
//! tag set and the turn carries on.

use std::fmt::Write as _;
use std::time::Duration;

use cortex_core::content::ContentStore;
use cortex_core::entity::Message;
use cortex_core::generation::{GenerationBackend, GenerationRequest};
use tracing::{debug, warn};

use crate::domain::tags::{RuleTag, parse_tag_list};

/// Sampling temperature for classification.
pub const OPERATOR_TEMPERATURE: f32 = 0.3;

/// Prompt template holding the operator's system prompt.
pub const OPERATOR_TEMPLATE: &str = "operator_system";

/// Messages of history the operator sees.
pub const OPERATOR_HISTORY_MESSAGES: usize = 3;

const HISTORY_TAIL_CHARS: usize = 500;
const MIN_TEMPLATE_CHARS: usize = 10;

fn tag_hint(tag: RuleTag) -> &'static str {
    match tag {
        RuleTag::Core => "baseline rules, always loaded.",
        RuleTag::Combat => "the player attacks, defends, takes damage or uses weapons.",
        RuleTag::Magic => "the player casts spells, senses the supernatural or uses artifacts.",
        RuleTag::Social => "the player talks, lies, intimidates or deals with NPCs.",
        RuleTag::Exploration => "the player searches, travels, sneaks or investigates.",
        RuleTag::Lore => "the player asks about history, religion or the world.",
        RuleTag::Inventory => "the player uses an item, loots or checks equipment.",
    }
}

/// Built-in system prompt, used when no usable template is stored.
#[must_use]
pub fn fallback_system_prompt() -> String {
    let mut prompt = String::from(
        "You are the OPERATOR of a tabletop RPG system.\n\
         Your job is to analyze the PLAYER'S ACTION and decide which RULE MODULES the \
         Game Master needs to resolve it.\n\nAVAILABLE MODULES:\n",
    );
    for tag in RuleTag::SELECTABLE {
        let _ = writeln!(prompt, "- \"{tag}\": {}", tag_hint(tag));
    }
    prompt.push_str(
        "\nOUTPUT FORMAT:\nReturn ONLY a JSON array of strings. Example: [\"combat\", \"magic\"]\n\
         If no specific rules are needed, return an empty array [].",
    );
    prompt
}

/// The last few messages as `role: content` lines.
#[must_use]
pub fn history_slice(history: &[Message]) -> String {
    let start = history.len().saturating_sub(OPERATOR_HISTORY_MESSAGES);
    history[start..]
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The last `n` characters of `s`.
fn tail_chars(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    let skip = count - n;
    s.char_indices().nth(skip).map_or(s, |(i, _)| &s[i..])
}

/// User prompt for the operator.
#[must_use]
pub fn operator_prompt(action: &str, recent_history: &str) -> String {
    format!(
        "[RECENT HISTORY]: {}...\n[PLAYER ACTION]: \"{action}\"\n\nWhich modules are required? JSON ONLY.",
        tail_chars(recent_history, HISTORY_TAIL_CHARS)
    )
}

async fn system_prompt(content: &dyn ContentStore) -> String {
    match content.prompt_template(OPERATOR_TEMPLATE).await {
        Ok(Some(template)) if template.trim().chars().count() >= MIN_TEMPLATE_CHARS => template,
        Ok(_) => fallback_system_prompt(),
        Err(e) => {
            warn!(error = %e, "operator template unavailable, using built-in prompt");
            fallback_system_prompt()
        }
    }
}

/// Classifies `action`. Never fails: transport errors, timeouts and
/// unparseable answers all yield an empty set.
pub async fn decide_tags(
    action: &str,
    recent_history: &str,
    backend: &dyn GenerationBackend,
    content: &dyn ContentStore,
    model: &str,
    timeout: Duration,
) -> Vec<RuleTag> {
    let request = GenerationRequest::new(
        system_prompt(content).await,
        operator_prompt(action, recent_history),
        model,
        OPERATOR_TEMPERATURE,
    );

    let raw = match tokio::time::timeout(timeout, backend.generate(request)).await {
        Ok(Ok(raw)) => raw,
        Ok(Err(e)) => {
            warn!(error = %e, "operator call failed, loading no extra modules");
            return Vec::new();
        }
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "operator call timed out, loading no extra modules");
            return Vec::new();
        }
    };

    match parse_tag_list(&raw) {
        Ok(tags) => {
            debug!(?tags, "operator decided");
            tags
        }
        Err(e) => {
            warn!(error = %e, "operator answer unusable, loading no extra modules");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use cortex_core::entity::MessageRole;
    use cortex_core::generation::GenerationError;
    use cortex_test_support::{
        FailingBackend, ScriptedBackend, StaticContentStore, fixed_now,
    };
    use uuid::Uuid;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn message(role: MessageRole, content: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            campaign_id: Uuid::new_v4(),
            position: 1,
            role,
            content: content.to_owned(),
            created_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn test_decide_tags_parses_fenced_answer() {
        let backend = ScriptedBackend::new().respond("operator", "```json\n[\"combat\"]\n```");

        let tags = decide_tags(
            "I shoot the drone",
            "",
            &backend,
            &StaticContentStore::new(),
            "operator",
            TIMEOUT,
        )
        .await;

        assert_eq!(tags, vec![RuleTag::Combat]);
        let request = &backend.requests()[0];
        assert!((request.temperature - OPERATOR_TEMPERATURE).abs() < f32::EPSILON);
        assert!(request.prompt.contains("[PLAYER ACTION]: \"I shoot the drone\""));
    }

    #[tokio::test]
    async fn test_decide_tags_swallows_backend_failure() {
        let tags = decide_tags(
            "I pick the lock",
            "",
            &FailingBackend::default(),
            &StaticContentStore::new(),
            "operator",
            TIMEOUT,
        )
        .await;

        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn test_decide_tags_swallows_prose_answer() {
        let backend = ScriptedBackend::new().respond("operator", "Combat, obviously.");

        let tags = decide_tags(
            "I punch him",
            "",
            &backend,
            &StaticContentStore::new(),
            "operator",
            TIMEOUT,
        )
        .await;

        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn test_decide_tags_swallows_timeout() {
        let backend = ScriptedBackend::new()
            .fail("operator", GenerationError::Timeout(5));

        let tags = decide_tags(
            "I wait",
            "",
            &backend,
            &StaticContentStore::new(),
            "operator",
            TIMEOUT,
        )
        .await;

        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn test_stored_template_replaces_builtin_prompt() {
        let backend = ScriptedBackend::new().respond("operator", "[]");
        let content = StaticContentStore::new()
            .with_prompt(OPERATOR_TEMPLATE, "Route the action to modules. JSON array only.");

        decide_tags("I look around", "", &backend, &content, "operator", TIMEOUT).await;

        assert_eq!(
            backend.requests()[0].system,
            "Route the action to modules. JSON array only."
        );
    }

    #[tokio::test]
    async fn test_too_short_template_falls_back_to_builtin_prompt() {
        let backend = ScriptedBackend::new().respond("operator", "[]");
        let content = StaticContentStore::new().with_prompt(OPERATOR_TEMPLATE, "tags?");

        decide_tags("I look around", "", &backend, &content, "operator", TIMEOUT).await;

        assert_eq!(backend.requests()[0].system, fallback_system_prompt());
    }

    #[test]
    fn test_fallback_prompt_lists_every_selectable_module() {
        let prompt = fallback_system_prompt();

        for tag in RuleTag::SELECTABLE {
            assert!(prompt.contains(&format!("\"{tag}\"")), "missing {tag}");
        }
    }

    #[test]
    fn test_history_slice_keeps_last_three_messages() {
        let history = vec![
            message(MessageRole::User, "one"),
            message(MessageRole::Assistant, "two"),
            message(MessageRole::User, "three"),
            message(MessageRole::Assistant, "four"),
        ];

        assert_eq!(
            history_slice(&history),
            "assistant: two\nuser: three\nassistant: four"
        );
    }

    #[test]
    fn test_operator_prompt_keeps_last_500_chars_of_history() {
        let history = format!("{}{}", "a".repeat(100), "é".repeat(500));

        let prompt = operator_prompt("I run", &history);

        assert!(prompt.starts_with(&format!("[RECENT HISTORY]: {}...", "é".repeat(500))));
    }
}
