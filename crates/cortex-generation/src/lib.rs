//! Cortex — generation backend adapters.
//!
//! [`OpenAiCompatBackend`] speaks the `/chat/completions` protocol shared by
//! most hosted model providers. [`ModelFallback`] wraps any backend and
//! retries a failed call against an ordered list of alternate models.

mod fallback;
mod openai_compat;

pub use fallback::ModelFallback;
pub use openai_compat::{DEFAULT_BASE_URL, OpenAiCompatBackend};
