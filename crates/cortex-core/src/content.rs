//! Content store abstraction: rule modules, instruction guides and prompt
//! templates.
//!
//! Content is authored elsewhere; the pipeline only reads it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A categorised content block (rule module or instruction guide).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Category key the block is filed under (e.g. `combat`).
    pub category: String,
    /// Raw content injected into the narrator context.
    pub content: String,
}

impl ContentBlock {
    /// Creates a block.
    #[must_use]
    pub fn new(category: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            content: content.into(),
        }
    }
}

/// Keyed, read-only lookup of rule/instruction/prompt content.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Rule modules for the given categories. Categories without content are
    /// simply absent from the result.
    async fn rule_modules(&self, categories: &[String]) -> Result<Vec<ContentBlock>, DomainError>;

    /// Instruction guides for the given categories.
    async fn instruction_guides(
        &self,
        categories: &[String],
    ) -> Result<Vec<ContentBlock>, DomainError>;

    /// Raw prompt template stored under `key`.
    async fn prompt_template(&self, key: &str) -> Result<Option<String>, DomainError>;
}

/// Replaces every `{{name}}` placeholder with its value. Unknown placeholders
/// are left untouched.
#[must_use]
pub fn render_template(template: &str, variables: &[(&str, &str)]) -> String {
    variables
        .iter()
        .fold(template.to_owned(), |rendered, (name, value)| {
            rendered.replace(&format!("{{{{{name}}}}}"), value)
        })
}

/// Looks up and renders a prompt template. Returns `None` when the template
/// is absent or the store cannot be reached, so callers can fall back to a
/// built-in prompt.
pub async fn resolve_prompt(
    store: &dyn ContentStore,
    key: &str,
    variables: &[(&str, &str)],
) -> Option<String> {
    match store.prompt_template(key).await {
        Ok(Some(template)) => Some(render_template(&template, variables)),
        Ok(None) | Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template_substitutes_every_occurrence() {
        let rendered = render_template(
            "{{name}} enters {{world}}. {{name}} hesitates.",
            &[("name", "Vex"), ("world", "Neo Lisboa")],
        );

        assert_eq!(rendered, "Vex enters Neo Lisboa. Vex hesitates.");
    }

    #[test]
    fn test_render_template_leaves_unknown_placeholders() {
        let rendered = render_template("Hello {{who}} from {{where}}", &[("who", "runner")]);

        assert_eq!(rendered, "Hello runner from {{where}}");
    }

    #[test]
    fn test_render_template_supports_dotted_keys() {
        let rendered = render_template("Passive: {{skills.passive}}", &[("skills.passive", "Iron Skin")]);

        assert_eq!(rendered, "Passive: Iron Skin");
    }
}
