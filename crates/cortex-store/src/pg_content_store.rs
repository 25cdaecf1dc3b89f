//! `PostgreSQL` implementation of the `ContentStore` trait.

use async_trait::async_trait;
use cortex_core::content::{ContentBlock, ContentStore};
use cortex_core::error::DomainError;
use sqlx::PgPool;

use crate::schema::{block_from_row, infra};

/// Reads rule modules, instruction guides and prompt templates from their
/// tables.
#[derive(Debug, Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    /// Creates a new `PgContentStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn blocks(
        &self,
        table: &str,
        categories: &[String],
    ) -> Result<Vec<ContentBlock>, DomainError> {
        if categories.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT category, content FROM {table} WHERE category = ANY($1) ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(categories)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?;
        rows.iter()
            .map(block_from_row)
            .collect::<Result<_, _>>()
            .map_err(infra)
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn rule_modules(&self, categories: &[String]) -> Result<Vec<ContentBlock>, DomainError> {
        self.blocks("rule_modules", categories).await
    }

    async fn instruction_guides(
        &self,
        categories: &[String],
    ) -> Result<Vec<ContentBlock>, DomainError> {
        self.blocks("instruction_guides", categories).await
    }

    async fn prompt_template(&self, key: &str) -> Result<Option<String>, DomainError> {
        sqlx::query_scalar("SELECT template FROM prompt_templates WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)
    }
}
