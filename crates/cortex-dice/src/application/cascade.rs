//! Timer-driven cascade runner.
//!
//! One task owns the `RollSession` and walks it through
//! throw → settle → check until the pool runs dry. Every wait races a
//! `CancellationToken`, so dismissing a roll drops its pending timer with
//! the task.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cortex_core::error::DomainError;
use cortex_core::rng::DeterministicRng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::aggregates::{CheckOutcome, RollSession, RollSummary};
use crate::domain::events::RollProgress;

/// Settle and reveal delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeTiming {
    /// Wait after the initial throw.
    pub initial_settle: Duration,
    /// Wait after each batch of companions.
    pub companion_settle: Duration,
    /// Pause between the last check and the result.
    pub reveal: Duration,
}

impl Default for CascadeTiming {
    fn default() -> Self {
        Self {
            initial_settle: Duration::from_millis(4000),
            companion_settle: Duration::from_millis(3000),
            reveal: Duration::from_millis(1000),
        }
    }
}

impl CascadeTiming {
    /// No waits at all.
    #[must_use]
    pub fn instant() -> Self {
        Self {
            initial_settle: Duration::ZERO,
            companion_settle: Duration::ZERO,
            reveal: Duration::ZERO,
        }
    }
}

/// How a cascade ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeOutcome {
    /// The cascade ran dry.
    Completed(RollSummary),
    /// The roll was dismissed before the result was revealed.
    Cancelled {
        /// Session that was dropped.
        roll_id: Uuid,
    },
}

/// Shared random source for cascades.
pub type SharedRng = Arc<Mutex<dyn DeterministicRng + Send>>;

/// Sleeps for `delay` unless `cancel` fires first. Returns `false` on
/// cancellation.
async fn wait(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}

fn emit(progress: &mpsc::UnboundedSender<RollProgress>, event: RollProgress) {
    // A dropped receiver only means nobody is watching.
    let _ = progress.send(event);
}

/// Drives `session` to completion.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the session was already started and
/// `DomainError::Infrastructure` if the RNG mutex is poisoned.
pub async fn run_cascade(
    mut session: RollSession,
    rng: &Mutex<dyn DeterministicRng + Send>,
    timing: CascadeTiming,
    progress: &mpsc::UnboundedSender<RollProgress>,
    cancel: &CancellationToken,
) -> Result<CascadeOutcome, DomainError> {
    let roll_id = session.id;

    loop {
        let round = session.round();
        let dice = session.throw()?;
        emit(progress, RollProgress::Thrown { round, dice });

        let delay = if round == 0 {
            timing.initial_settle
        } else {
            timing.companion_settle
        };
        if !wait(delay, cancel).await {
            info!(roll_id = %roll_id, round, "roll cancelled while settling");
            return Ok(CascadeOutcome::Cancelled { roll_id });
        }

        // Lock RNG only for the synchronous settle, never across an await.
        let faces = {
            let mut rng_guard = rng
                .lock()
                .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))?;
            session.settle(&mut *rng_guard)?
        };
        emit(progress, RollProgress::Settled { round, faces });

        match session.check()? {
            CheckOutcome::Overclock {
                triggered_by,
                companions,
            } => {
                debug!(roll_id = %roll_id, ?triggered_by, "overclock");
                emit(
                    progress,
                    RollProgress::Overclocked {
                        round: session.round(),
                        triggered_by,
                        companions,
                    },
                );
            }
            CheckOutcome::Complete { successes } => {
                if !wait(timing.reveal, cancel).await {
                    info!(roll_id = %roll_id, "roll cancelled before reveal");
                    return Ok(CascadeOutcome::Cancelled { roll_id });
                }
                emit(progress, RollProgress::Completed { successes });
                info!(roll_id = %roll_id, successes, rounds = round + 1, "roll completed");
                return session.summary().map(CascadeOutcome::Completed);
            }
        }
    }
}

/// A cascade running on its own task.
///
/// Dropping the handle cancels the roll.
#[derive(Debug)]
pub struct RollHandle {
    /// Session identifier.
    pub roll_id: Uuid,
    /// Progress stream; closes when the cascade ends.
    pub progress: mpsc::UnboundedReceiver<RollProgress>,
    cancel: CancellationToken,
    task: JoinHandle<Result<CascadeOutcome, DomainError>>,
    guard: DropGuard,
}

impl RollHandle {
    /// Dismisses the roll. Pending timers are released and no result is
    /// revealed.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the cascade and returns its single outcome.
    ///
    /// # Errors
    ///
    /// Returns the cascade's `DomainError`, or `DomainError::Infrastructure`
    /// if the task panicked.
    pub async fn finish(self) -> Result<CascadeOutcome, DomainError> {
        let Self { task, guard, .. } = self;
        let outcome = task
            .await
            .map_err(|e| DomainError::Infrastructure(format!("dice task failed: {e}")))?;
        drop(guard.disarm());
        outcome
    }

    /// Waits for the cascade while collecting every progress event.
    ///
    /// # Errors
    ///
    /// Same as [`RollHandle::finish`].
    pub async fn finish_with_progress(
        mut self,
    ) -> Result<(CascadeOutcome, Vec<RollProgress>), DomainError> {
        let mut events = Vec::new();
        while let Some(event) = self.progress.recv().await {
            events.push(event);
        }
        let outcome = self.finish().await?;
        Ok((outcome, events))
    }
}

/// Starts `session` on a new task.
#[must_use]
pub fn spawn_cascade(session: RollSession, rng: SharedRng, timing: CascadeTiming) -> RollHandle {
    let roll_id = session.id;
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();

    let task_cancel = cancel.clone();
    let task = tokio::spawn(async move {
        run_cascade(session, rng.as_ref(), timing, &tx, &task_cancel).await
    });

    RollHandle {
        roll_id,
        progress: rx,
        guard: cancel.clone().drop_guard(),
        cancel,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_test_support::{MockRng, SequenceRng};
    use tokio::time::Instant;

    fn shared(rng: impl DeterministicRng + Send + 'static) -> SharedRng {
        Arc::new(Mutex::new(rng))
    }

    #[tokio::test(start_paused = true)]
    async fn test_cascade_waits_initial_then_companion_then_reveal() {
        let session = RollSession::new(Uuid::new_v4(), 3).unwrap();
        let started = Instant::now();

        let handle = spawn_cascade(
            session,
            shared(SequenceRng::new(vec![3, 4, 8, 2])),
            CascadeTiming::default(),
        );
        let (outcome, events) = handle.finish_with_progress().await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_millis(8000));
        match outcome {
            CascadeOutcome::Completed(summary) => {
                assert_eq!(summary.successes, 3);
                assert_eq!(summary.rounds, 2);
                assert_eq!(summary.dice.len(), 4);
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(events.len(), 6);
        assert_eq!(
            events[2],
            RollProgress::Overclocked {
                round: 1,
                triggered_by: vec![3],
                companions: vec![4],
            }
        );
        assert_eq!(events[5], RollProgress::Completed { successes: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_is_emitted_exactly_once() {
        let session = RollSession::new(Uuid::new_v4(), 2).unwrap();

        let handle = spawn_cascade(
            session,
            shared(SequenceRng::new(vec![8, 8, 8, 1, 6])),
            CascadeTiming::default(),
        );
        let (_, events) = handle.finish_with_progress().await.unwrap();

        let completions = events
            .iter()
            .filter(|e| matches!(e, RollProgress::Completed { .. }))
            .count();
        assert_eq!(completions, 1);
        assert_eq!(events.last(), Some(&RollProgress::Completed { successes: 4 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_settling_releases_the_roll() {
        let session = RollSession::new(Uuid::new_v4(), 4).unwrap();
        let roll_id = session.id;
        let started = Instant::now();

        let handle = spawn_cascade(session, shared(MockRng), CascadeTiming::default());
        handle.cancel();
        let (outcome, events) = handle.finish_with_progress().await.unwrap();

        assert_eq!(outcome, CascadeOutcome::Cancelled { roll_id });
        assert!(started.elapsed() < Duration::from_millis(4000));
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, RollProgress::Completed { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels_the_task() {
        let session = RollSession::new(Uuid::new_v4(), 1).unwrap();
        let handle = spawn_cascade(session, shared(MockRng), CascadeTiming::default());
        let token = handle.cancel.clone();

        drop(handle);

        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_run_cascade_inline_with_instant_timing() {
        let session = RollSession::new(Uuid::new_v4(), 2).unwrap();
        let rng: Mutex<SequenceRng> = Mutex::new(SequenceRng::new(vec![2, 6]));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = run_cascade(
            session,
            &rng,
            CascadeTiming::instant(),
            &tx,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        drop(tx);

        match outcome {
            CascadeOutcome::Completed(summary) => assert_eq!(summary.successes, 2),
            other => panic!("expected Completed, got {other:?}"),
        }
        let mut seen = 0;
        while rx.recv().await.is_some() {
            seen += 1;
        }
        assert_eq!(seen, 3);
    }
}
