//! Context assembler: builds the narrator's bundle from persisted state and
//! the content store.

use cortex_core::content::{ContentBlock, ContentStore};
use cortex_core::entity::{Campaign, Character, Threat};
use cortex_core::error::DomainError;
use tracing::debug;

use crate::domain::context::ContextBundle;
use crate::domain::tags::{RuleTag, with_core};

/// Orders blocks by the position of their category in `tags`. Blocks of
/// the same category keep their store order.
fn order_by_tags(mut blocks: Vec<ContentBlock>, tags: &[RuleTag]) -> Vec<ContentBlock> {
    blocks.sort_by_key(|b| {
        tags.iter()
            .position(|t| t.as_str() == b.category)
            .unwrap_or(usize::MAX)
    });
    blocks
}

/// Builds the bundle for `requested` tags. The `core` module is always
/// fetched, whatever the operator chose.
///
/// # Errors
///
/// Returns the content store's `DomainError` if rules or instructions
/// cannot be read.
pub async fn assemble_context(
    campaign: Campaign,
    character: Character,
    threats: Vec<Threat>,
    requested: &[RuleTag],
    content: &dyn ContentStore,
) -> Result<ContextBundle, DomainError> {
    let tags = with_core(requested);
    let categories: Vec<String> = tags.iter().map(|t| t.as_str().to_owned()).collect();

    let rules = order_by_tags(content.rule_modules(&categories).await?, &tags);
    let instructions = order_by_tags(content.instruction_guides(&categories).await?, &tags);
    debug!(
        ?categories,
        rules = rules.len(),
        instructions = instructions.len(),
        "context assembled"
    );

    let vitals = character.vitals();
    Ok(ContextBundle {
        campaign,
        character,
        vitals,
        threats,
        tags,
        rules,
        instructions,
    })
}
