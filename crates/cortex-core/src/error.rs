//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A campaign, character or other record was not found.
    #[error("entity not found: {0}")]
    EntityNotFound(Uuid),

    /// A request violated a domain rule.
    #[error("validation error: {0}")]
    Validation(String),

    /// A request collided with work already in flight (e.g. a running turn).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
