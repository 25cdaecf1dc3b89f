//! Generation backend abstraction.
//!
//! The backend is an opaque text-in/text-out oracle. Any structure imposed on
//! its output (JSON envelopes, tag arrays) is the caller's business.

use async_trait::async_trait;
use thiserror::Error;

/// A single generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// System directive.
    pub system: String,
    /// User-composed prompt.
    pub prompt: String,
    /// Backing model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl GenerationRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(
        system: impl Into<String>,
        prompt: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            model: model.into(),
            temperature,
        }
    }

    /// Same request against a different model.
    #[must_use]
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }
}

/// Failures raised by a generation backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// Credentials or endpoint missing. Raised before any call is made.
    #[error("generation backend not configured: {0}")]
    Configuration(String),

    /// Transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("provider error ({status}): {message}")]
    Provider {
        /// HTTP status code.
        status: u16,
        /// Error body or reason.
        message: String,
    },

    /// The call exceeded its time budget.
    #[error("generation timed out after {0}s")]
    Timeout(u64),

    /// The backend answered but produced no text.
    #[error("no content returned from {0}")]
    EmptyResponse(String),
}

/// Text-in/text-out generation oracle.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Runs one generation and returns the raw text.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}
