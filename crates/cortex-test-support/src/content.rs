//! In-memory `ContentStore`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use cortex_core::content::{ContentBlock, ContentStore};
use cortex_core::error::DomainError;

/// Content store backed by plain maps. Records every category list it was
/// asked for so tests can check what the assembler fetched.
#[derive(Debug, Default)]
pub struct StaticContentStore {
    rules: Vec<ContentBlock>,
    instructions: Vec<ContentBlock>,
    prompts: HashMap<String, String>,
    requested: Mutex<Vec<Vec<String>>>,
    fail: bool,
}

impl StaticContentStore {
    /// An empty store: no rules, no instructions, no prompt templates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose lookups always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Adds a rule module.
    #[must_use]
    pub fn with_rule(mut self, category: &str, content: &str) -> Self {
        self.rules.push(ContentBlock::new(category, content));
        self
    }

    /// Adds an instruction guide.
    #[must_use]
    pub fn with_instruction(mut self, category: &str, content: &str) -> Self {
        self.instructions.push(ContentBlock::new(category, content));
        self
    }

    /// Adds a prompt template.
    #[must_use]
    pub fn with_prompt(mut self, key: &str, template: &str) -> Self {
        self.prompts.insert(key.to_owned(), template.to_owned());
        self
    }

    /// Category lists passed to `rule_modules`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn requested_categories(&self) -> Vec<Vec<String>> {
        self.requested.lock().unwrap().clone()
    }

    fn guard(&self) -> Result<(), DomainError> {
        if self.fail {
            Err(DomainError::Infrastructure("content store offline".into()))
        } else {
            Ok(())
        }
    }
}

fn select(blocks: &[ContentBlock], categories: &[String]) -> Vec<ContentBlock> {
    blocks
        .iter()
        .filter(|b| categories.iter().any(|c| c == &b.category))
        .cloned()
        .collect()
}

#[async_trait]
impl ContentStore for StaticContentStore {
    async fn rule_modules(&self, categories: &[String]) -> Result<Vec<ContentBlock>, DomainError> {
        self.guard()?;
        self.requested.lock().unwrap().push(categories.to_vec());
        Ok(select(&self.rules, categories))
    }

    async fn instruction_guides(
        &self,
        categories: &[String],
    ) -> Result<Vec<ContentBlock>, DomainError> {
        self.guard()?;
        Ok(select(&self.instructions, categories))
    }

    async fn prompt_template(&self, key: &str) -> Result<Option<String>, DomainError> {
        self.guard()?;
        Ok(self.prompts.get(key).cloned())
    }
}
