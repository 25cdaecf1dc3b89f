//! Ordered model fallback for plain-text generation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cortex_core::generation::{GenerationBackend, GenerationError, GenerationRequest};
use tracing::warn;

/// Retries a failed call against alternate models, in order.
///
/// The requested model is always tried first. Each attempt gets its own
/// timeout. Configuration errors stop the chain immediately, since no other
/// model can fix missing credentials.
pub struct ModelFallback {
    inner: Arc<dyn GenerationBackend>,
    alternates: Vec<String>,
    attempt_timeout: Duration,
}

impl ModelFallback {
    /// Wraps `inner` with the given alternates.
    #[must_use]
    pub fn new(
        inner: Arc<dyn GenerationBackend>,
        alternates: Vec<String>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            inner,
            alternates,
            attempt_timeout,
        }
    }

    /// Worst-case duration of one request for `model` when every attempt in
    /// the chain runs out its timeout.
    #[must_use]
    pub fn time_budget(&self, model: &str) -> Duration {
        let attempts = u32::try_from(self.chain(model).len()).unwrap_or(u32::MAX);
        self.attempt_timeout.saturating_mul(attempts)
    }

    fn chain<'a>(&'a self, requested: &'a str) -> Vec<&'a str> {
        let mut models = vec![requested];
        for model in &self.alternates {
            if !models.contains(&model.as_str()) {
                models.push(model.as_str());
            }
        }
        models
    }
}

#[async_trait]
impl GenerationBackend for ModelFallback {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let mut last_error = GenerationError::EmptyResponse(request.model.clone());

        for model in self.chain(&request.model) {
            let attempt = request.with_model(model);
            let result = tokio::time::timeout(self.attempt_timeout, self.inner.generate(attempt))
                .await
                .unwrap_or(Err(GenerationError::Timeout(self.attempt_timeout.as_secs())));

            match result {
                Ok(text) => return Ok(text),
                Err(e @ GenerationError::Configuration(_)) => return Err(e),
                Err(e) => {
                    warn!(model, error = %e, "generation attempt failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
