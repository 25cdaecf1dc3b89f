//! File-based content store.
//!
//! A content pack is a YAML document with `rules`, `instructions` and
//! `prompts` maps, optionally pointing at Markdown rulebooks. Each `##`
//! heading in a rulebook opens a rule module filed under the lowercased
//! heading text.
//!
//! ```yaml
//! rules:
//!   core: Roll d8s. Evens succeed; an 8 overclocks.
//! instructions:
//!   combat: Describe wounds, not numbers.
//! prompts:
//!   master_interaction: You run a neon-soaked cyberpunk table.
//! rulebooks:
//!   - rulebook.md
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use cortex_core::content::{ContentBlock, ContentStore};
use cortex_core::error::DomainError;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Errors raised while loading a content pack.
#[derive(Debug, Error)]
pub enum ContentPackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Default, Deserialize)]
struct PackFile {
    #[serde(default)]
    rules: BTreeMap<String, String>,
    #[serde(default)]
    instructions: BTreeMap<String, String>,
    #[serde(default)]
    prompts: BTreeMap<String, String>,
    #[serde(default)]
    rulebooks: Vec<String>,
}

/// In-memory content loaded from a pack file.
#[derive(Debug, Clone, Default)]
pub struct ContentPack {
    rules: Vec<ContentBlock>,
    instructions: Vec<ContentBlock>,
    prompts: BTreeMap<String, String>,
}

impl ContentPack {
    /// Loads a pack file. Rulebook paths are resolved relative to the
    /// pack's directory.
    ///
    /// # Errors
    ///
    /// Returns `ContentPackError` if a file cannot be read or the YAML is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ContentPackError> {
        let file: PackFile = serde_yaml::from_str(&fs::read_to_string(path)?)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        let mut pack = Self::from_file(file.rules, file.instructions, file.prompts);
        for rulebook in &file.rulebooks {
            let markdown = fs::read_to_string(base.join(rulebook))?;
            pack.add_rulebook(&markdown);
        }
        info!(
            path = %path.display(),
            rules = pack.rules.len(),
            instructions = pack.instructions.len(),
            prompts = pack.prompts.len(),
            "content pack loaded"
        );
        Ok(pack)
    }

    /// Parses a pack from YAML text. Rulebook references are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ContentPackError::Parse` if the YAML is invalid.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ContentPackError> {
        let file: PackFile = serde_yaml::from_str(yaml)?;
        Ok(Self::from_file(file.rules, file.instructions, file.prompts))
    }

    fn from_file(
        rules: BTreeMap<String, String>,
        instructions: BTreeMap<String, String>,
        prompts: BTreeMap<String, String>,
    ) -> Self {
        let blocks = |map: BTreeMap<String, String>| {
            map.into_iter()
                .map(|(category, content)| ContentBlock::new(category.to_lowercase(), content))
                .collect()
        };
        Self {
            rules: blocks(rules),
            instructions: blocks(instructions),
            prompts,
        }
    }

    /// Appends one rule module per `##` section of `markdown`.
    pub fn add_rulebook(&mut self, markdown: &str) {
        self.rules.extend(rulebook_sections(markdown));
    }

    fn matching(blocks: &[ContentBlock], categories: &[String]) -> Vec<ContentBlock> {
        blocks
            .iter()
            .filter(|b| categories.iter().any(|c| c.eq_ignore_ascii_case(&b.category)))
            .cloned()
            .collect()
    }
}

/// Splits a Markdown document into blocks keyed by its `##` headings. Text
/// before the first such heading is dropped.
#[must_use]
pub fn rulebook_sections(markdown: &str) -> Vec<ContentBlock> {
    let mut sections = Vec::new();
    // (category, body start offset)
    let mut open: Option<(String, usize)> = None;
    let mut heading: Option<String> = None;

    for (event, range) in Parser::new(markdown).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H2,
                ..
            }) => {
                if let Some((category, start)) = open.take() {
                    push_section(&mut sections, category, &markdown[start..range.start]);
                }
                heading = Some(String::new());
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(h) = heading.as_mut() {
                    h.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(HeadingLevel::H2)) => {
                if let Some(h) = heading.take() {
                    open = Some((h.trim().to_lowercase(), range.end));
                }
            }
            _ => {}
        }
    }
    if let Some((category, start)) = open {
        push_section(&mut sections, category, &markdown[start..]);
    }
    sections
}

fn push_section(sections: &mut Vec<ContentBlock>, category: String, body: &str) {
    let body = body.trim();
    if !category.is_empty() && !body.is_empty() {
        sections.push(ContentBlock::new(category, body));
    }
}

#[async_trait]
impl ContentStore for ContentPack {
    async fn rule_modules(&self, categories: &[String]) -> Result<Vec<ContentBlock>, DomainError> {
        Ok(Self::matching(&self.rules, categories))
    }

    async fn instruction_guides(
        &self,
        categories: &[String],
    ) -> Result<Vec<ContentBlock>, DomainError> {
        Ok(Self::matching(&self.instructions, categories))
    }

    async fn prompt_template(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.prompts.get(key).cloned())
    }
}
