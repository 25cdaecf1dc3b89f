//! Background summarizer: compresses the recent log into the rolling
//! campaign summary.

use std::time::Duration;

use cortex_core::clock::Clock;
use cortex_core::entity::ContextSummary;
use cortex_core::error::DomainError;
use cortex_core::generation::{GenerationBackend, GenerationError, GenerationRequest};
use cortex_core::repository::GameStore;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::summary::{
    START_OF_ADVENTURE, SUMMARY_WINDOW, narrative_transcript, summary_prompt,
};

/// System directive for summary calls.
pub const SUMMARIZER_SYSTEM: &str = "You are a summarizer.";

/// Sampling temperature for summaries.
pub const SUMMARIZER_TEMPERATURE: f32 = 0.3;

/// Why a summary run produced nothing.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error(transparent)]
    Store(#[from] DomainError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Every recent line was mechanical noise.
    #[error("no narrative lines to summarize")]
    NothingToSummarize,

    #[error("summarizer returned an empty summary")]
    EmptySummary,
}

/// Summarizes the newest messages of a campaign on top of its previous
/// summary and stores the result as the new authoritative row. `timeout`
/// bounds the whole backend call, so a fallback chain must get its full
/// budget.
///
/// # Errors
///
/// Returns `SummaryError` when the store or backend fails, or when there is
/// nothing worth storing. The previous summary stays authoritative in every
/// error case.
pub async fn summarize_campaign(
    campaign_id: Uuid,
    store: &dyn GameStore,
    backend: &dyn GenerationBackend,
    model: &str,
    timeout: Duration,
    clock: &dyn Clock,
) -> Result<ContextSummary, SummaryError> {
    let messages = store.recent_messages(campaign_id, SUMMARY_WINDOW).await?;
    let transcript = narrative_transcript(&messages);
    if transcript.is_empty() {
        return Err(SummaryError::NothingToSummarize);
    }

    let previous = store.latest_summary(campaign_id).await?;
    let previous = previous
        .as_ref()
        .map_or(START_OF_ADVENTURE, |s| s.summary.as_str());
    debug!(%campaign_id, lines = transcript.len(), "summarizing campaign log");

    let request = GenerationRequest::new(
        SUMMARIZER_SYSTEM,
        summary_prompt(&transcript, previous),
        model,
        SUMMARIZER_TEMPERATURE,
    );
    let raw = tokio::time::timeout(timeout, backend.generate(request))
        .await
        .map_err(|_| GenerationError::Timeout(timeout.as_secs()))??;

    let summary = raw.trim();
    if summary.is_empty() {
        return Err(SummaryError::EmptySummary);
    }

    let stored = store
        .insert_summary(campaign_id, summary.to_owned(), clock.now())
        .await?;
    info!(%campaign_id, summary_id = %stored.id, "campaign summary updated");
    Ok(stored)
}
