//! Cortex storage adapters.
//!
//! PostgreSQL implementations of the repository traits and of the content
//! store, plus a file-based content pack for running without seeded
//! content tables.

pub mod content_pack;
pub mod pg_content_store;
pub mod pg_game_store;
pub mod schema;

pub use content_pack::{ContentPack, ContentPackError};
pub use pg_content_store::PgContentStore;
pub use pg_game_store::PgGameStore;
