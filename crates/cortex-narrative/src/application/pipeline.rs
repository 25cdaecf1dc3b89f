//! Turn pipeline: operator, assembler, narrator and mechanics resolver run
//! strictly in sequence under the per-encounter turn gate.

use std::sync::Arc;
use std::time::Duration;

use cortex_core::clock::Clock;
use cortex_core::content::ContentStore;
use cortex_core::entity::{EncounterScope, MessageRole, NewMessage};
use cortex_core::error::DomainError;
use cortex_core::generation::GenerationBackend;
use cortex_core::repository::GameStore;
use cortex_mechanics::application::command_handlers::handle_apply_mechanics;
use cortex_mechanics::domain::commands::ApplyMechanics;
use serde::Serialize;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};
use uuid::Uuid;

use super::assembler::assemble_context;
use super::gate::TurnGate;
use super::narrator::{NARRATOR_HISTORY_MESSAGES, NarratorInput, narrate};
use super::operator::{decide_tags, history_slice};
use super::summarizer::summarize_campaign;
use crate::domain::commands::ResolveTurn;
use crate::domain::summary::is_summary_boundary;
use crate::domain::turn::{NarratorOutcome, TRANSMISSION_ERROR, TurnType};

/// Models and time budget for the agent calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    pub operator_model: String,
    pub narrator_model: String,
    pub summarizer_model: String,
    /// Upper bound for a single generation call.
    pub generation_timeout: Duration,
    /// Upper bound for a whole background summary run. A fallback chain
    /// needs room for every attempt.
    pub summary_timeout: Duration,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            operator_model: "grok-4-1-fast-non-reasoning".to_owned(),
            narrator_model: "grok-4-1-fast-reasoning".to_owned(),
            summarizer_model: "grok-4-1-fast-non-reasoning".to_owned(),
            generation_timeout: Duration::from_secs(60),
            summary_timeout: Duration::from_secs(60),
        }
    }
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    Resolved,
    /// The narrator call failed or timed out.
    GenerationFailed,
    /// The narrator answered with something that is not a valid turn.
    MalformedResponse,
    /// Rules or instructions could not be loaded.
    ContextUnavailable,
}

/// What the player gets back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnReply {
    /// Narrative text, or the transmission error on failure.
    pub narrative: String,
    pub outcome: TurnOutcome,
    /// Whether a message of this turn closed a summary window.
    pub summary_scheduled: bool,
}

/// Runs player turns against the store, content and generation backends.
pub struct TurnPipeline {
    store: Arc<dyn GameStore>,
    content: Arc<dyn ContentStore>,
    backend: Arc<dyn GenerationBackend>,
    summarizer: Arc<dyn GenerationBackend>,
    clock: Arc<dyn Clock>,
    settings: AgentSettings,
    gate: TurnGate,
    background: TaskTracker,
}

impl TurnPipeline {
    /// Creates a pipeline. `summarizer` serves the background summary
    /// calls and may be a fallback chain over `backend`.
    #[must_use]
    pub fn new(
        store: Arc<dyn GameStore>,
        content: Arc<dyn ContentStore>,
        backend: Arc<dyn GenerationBackend>,
        summarizer: Arc<dyn GenerationBackend>,
        clock: Arc<dyn Clock>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            store,
            content,
            backend,
            summarizer,
            clock,
            settings,
            gate: TurnGate::new(),
            background: TaskTracker::new(),
        }
    }

    /// Whether a turn is in flight for `scope`.
    #[must_use]
    pub fn is_busy(&self, scope: EncounterScope) -> bool {
        self.gate.is_busy(scope)
    }

    /// Waits for every scheduled background summary to finish.
    pub async fn drain_background(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    /// Resolves one player turn.
    ///
    /// Generation and parse failures are not errors: they come back as a
    /// `TurnReply` carrying the transmission error and no mechanics are
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank action or a character
    /// outside the campaign, `DomainError::Conflict` while another turn runs
    /// for the same scope, `DomainError::EntityNotFound` for unknown
    /// campaigns or characters, and `DomainError::Infrastructure` when the
    /// store cannot be read.
    #[instrument(
        skip(self, command),
        fields(
            correlation_id = %command.correlation_id,
            campaign_id = %command.scope.campaign_id,
            character_id = %command.scope.character_id,
        )
    )]
    pub async fn resolve_turn(&self, command: &ResolveTurn) -> Result<TurnReply, DomainError> {
        let action = command.action.trim();
        if action.is_empty() {
            return Err(DomainError::Validation("action must not be empty".into()));
        }

        let scope = command.scope;
        let Some(_permit) = self.gate.try_acquire(scope) else {
            return Err(DomainError::Conflict(
                "a turn is already in progress for this character".into(),
            ));
        };

        let campaign = self
            .store
            .find_campaign(scope.campaign_id)
            .await?
            .ok_or(DomainError::EntityNotFound(scope.campaign_id))?;
        let character = self
            .store
            .find_character(scope.character_id)
            .await?
            .ok_or(DomainError::EntityNotFound(scope.character_id))?;
        if character.campaign_id != Some(campaign.id) {
            return Err(DomainError::Validation(format!(
                "character {} is not enrolled in campaign {}",
                character.id, campaign.id
            )));
        }
        character.attributes.validate()?;

        let history = self
            .store
            .recent_messages(campaign.id, NARRATOR_HISTORY_MESSAGES)
            .await?;
        let summary = self.store.latest_summary(campaign.id).await?;
        let user_position = self.log_message(campaign.id, MessageRole::User, action).await;

        let tags = decide_tags(
            action,
            &history_slice(&history),
            self.backend.as_ref(),
            self.content.as_ref(),
            &self.settings.operator_model,
            self.settings.generation_timeout,
        )
        .await;
        info!(?tags, "operator selected rule modules");

        let campaign_id = campaign.id;
        let vitals = character.vitals();
        let assembled = async {
            let threats = self.store.active_threats(scope).await?;
            assemble_context(campaign, character, threats, &tags, self.content.as_ref()).await
        };
        let bundle = match assembled.await {
            Ok(bundle) => bundle,
            Err(e) => {
                error!(error = %e, "context assembly failed");
                return Ok(self.failed_turn(
                    TurnOutcome::ContextUnavailable,
                    campaign_id,
                    user_position,
                ));
            }
        };

        let input = NarratorInput {
            turn_type: TurnType::from_history_len(history.len()),
            style: command.style,
            bundle: &bundle,
            summary: summary.as_ref().map(|s| s.summary.as_str()),
            recent_log: &history,
            action,
        };
        let turn = match narrate(
            &input,
            self.backend.as_ref(),
            self.content.as_ref(),
            &self.settings.narrator_model,
            self.settings.generation_timeout,
        )
        .await
        {
            Ok(NarratorOutcome::ValidTurn(turn)) => turn,
            Ok(NarratorOutcome::MalformedResponse(_)) => {
                return Ok(self.failed_turn(
                    TurnOutcome::MalformedResponse,
                    campaign_id,
                    user_position,
                ));
            }
            Err(e) => {
                error!(error = %e, "narrator call failed");
                return Ok(self.failed_turn(
                    TurnOutcome::GenerationFailed,
                    campaign_id,
                    user_position,
                ));
            }
        };

        let apply = ApplyMechanics {
            correlation_id: command.correlation_id,
            scope,
            mechanics: turn.mechanics,
        };
        let report =
            handle_apply_mechanics(&apply, vitals, self.clock.as_ref(), self.store.as_ref()).await;
        if !report.is_clean() {
            warn!(
                failures = report.failures.len(),
                "mechanics applied partially"
            );
        }
        debug!(world_state = %turn.world_state, "narrator world state");

        let assistant_position = self
            .log_message(campaign_id, MessageRole::Assistant, &turn.narrative)
            .await;
        let summary_scheduled =
            self.schedule_summary(campaign_id, &[user_position, assistant_position]);

        Ok(TurnReply {
            narrative: turn.narrative,
            outcome: TurnOutcome::Resolved,
            summary_scheduled,
        })
    }

    fn failed_turn(
        &self,
        outcome: TurnOutcome,
        campaign_id: Uuid,
        user_position: Option<u64>,
    ) -> TurnReply {
        warn!(?outcome, "turn failed; no mechanics applied");
        TurnReply {
            narrative: TRANSMISSION_ERROR.to_owned(),
            outcome,
            summary_scheduled: self.schedule_summary(campaign_id, &[user_position]),
        }
    }

    /// Appends to the campaign log and returns the message's position, or
    /// `None` when the write failed.
    async fn log_message(
        &self,
        campaign_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Option<u64> {
        let message = NewMessage {
            campaign_id,
            role,
            content: content.to_owned(),
            created_at: self.clock.now(),
        };
        match self.store.append_message(message).await {
            Ok(stored) => Some(stored.position),
            Err(e) => {
                warn!(%campaign_id, %role, error = %e, "message log write failed");
                None
            }
        }
    }

    /// Spawns a summary run when one of this turn's messages landed on a
    /// summary boundary.
    fn schedule_summary(&self, campaign_id: Uuid, logged: &[Option<u64>]) -> bool {
        if !logged.iter().flatten().any(|&p| is_summary_boundary(p)) {
            return false;
        }

        let store = Arc::clone(&self.store);
        let backend = Arc::clone(&self.summarizer);
        let clock = Arc::clone(&self.clock);
        let model = self.settings.summarizer_model.clone();
        let timeout = self.settings.summary_timeout;
        self.background.spawn(
            async move {
                if let Err(e) = summarize_campaign(
                    campaign_id,
                    store.as_ref(),
                    backend.as_ref(),
                    &model,
                    timeout,
                    clock.as_ref(),
                )
                .await
                {
                    warn!(error = %e, "background summary failed");
                }
            }
            .instrument(info_span!("summarize", %campaign_id)),
        );
        true
    }
}
