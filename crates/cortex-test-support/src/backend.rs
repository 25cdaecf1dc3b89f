//! Scripted `GenerationBackend` implementations.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cortex_core::generation::{GenerationBackend, GenerationError, GenerationRequest};

/// Replays canned responses per model and records every request.
///
/// Each model has its own queue. Responses are consumed in order; the last
/// one is sticky and keeps being returned once the queue is down to it. A
/// model with no script answers with `GenerationError::EmptyResponse`.
/// Models can also be made slow or never answer at all.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<String, VecDeque<Result<String, GenerationError>>>>,
    delays: Mutex<HashMap<String, Duration>>,
    stalled: Mutex<HashSet<String>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedBackend {
    /// Creates a backend with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response for `model`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn respond(self, model: &str, text: &str) -> Self {
        self.push(model, Ok(text.to_owned()));
        self
    }

    /// Queues a failure for `model`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn fail(self, model: &str, error: GenerationError) -> Self {
        self.push(model, Err(error));
        self
    }

    /// Makes every call for `model` sleep for `delay` before answering.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn delay(self, model: &str, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(model.to_owned(), delay);
        self
    }

    /// Makes every call for `model` hang forever.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn stall(self, model: &str) -> Self {
        self.stalled.lock().unwrap().insert(model.to_owned());
        self
    }

    fn push(&self, model: &str, response: Result<String, GenerationError>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(model.to_owned())
            .or_default()
            .push_back(response);
    }

    /// Every request received, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests received for one model.
    #[must_use]
    pub fn requests_for(&self, model: &str) -> Vec<GenerationRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.model == model)
            .collect()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);

        let stalled = self.stalled.lock().unwrap().contains(&model);
        if stalled {
            std::future::pending::<()>().await;
        }
        let delay = self.delays.lock().unwrap().get(&model).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut scripts = self.scripts.lock().unwrap();
        let Some(queue) = scripts.get_mut(&model) else {
            return Err(GenerationError::EmptyResponse(model));
        };
        if queue.len() > 1 {
            queue
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::EmptyResponse(model)))
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(GenerationError::EmptyResponse(model)))
        }
    }
}

/// A backend whose every call fails with a transport error.
#[derive(Debug, Default)]
pub struct FailingBackend {
    calls: Mutex<usize>,
}

impl FailingBackend {
    /// Number of calls attempted.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl GenerationBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
        *self.calls.lock().unwrap() += 1;
        Err(GenerationError::Network("connection reset by peer".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(model: &str) -> GenerationRequest {
        GenerationRequest::new("sys", "prompt", model, 0.3)
    }

    #[tokio::test]
    async fn test_scripted_backend_consumes_queue_then_sticks_on_last() {
        let backend = ScriptedBackend::new()
            .respond("narrator", "first")
            .respond("narrator", "second");

        assert_eq!(backend.generate(request("narrator")).await.unwrap(), "first");
        assert_eq!(backend.generate(request("narrator")).await.unwrap(), "second");
        assert_eq!(backend.generate(request("narrator")).await.unwrap(), "second");
        assert_eq!(backend.requests_for("narrator").len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_model_never_answers() {
        let backend = ScriptedBackend::new()
            .respond("narrator", "unused")
            .stall("narrator");

        let result =
            tokio::time::timeout(Duration::from_secs(600), backend.generate(request("narrator")))
                .await;

        assert!(result.is_err());
        assert_eq!(backend.requests_for("narrator").len(), 1);
    }

    #[tokio::test]
    async fn test_unscripted_model_returns_empty_response() {
        let backend = ScriptedBackend::new();

        let result = backend.generate(request("operator")).await;

        assert_eq!(
            result.unwrap_err(),
            GenerationError::EmptyResponse("operator".to_owned())
        );
    }
}
