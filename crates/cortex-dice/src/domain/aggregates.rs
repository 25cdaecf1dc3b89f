//! The `RollSession` aggregate: one pool of dice and its overclock cascade.

use std::collections::HashSet;

use cortex_core::error::DomainError;
use cortex_core::rng::DeterministicRng;
use serde::Serialize;
use uuid::Uuid;

use super::events::SettledFace;

/// Most dice a single roll may start with.
pub const MAX_DICE: u32 = 10;

/// Faces on every die.
pub const DIE_FACES: u32 = 8;

/// The face that scores and spawns a companion.
pub const OVERCLOCK_FACE: u8 = 8;

/// Cascade phase state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadePhase {
    /// The initial pool has been created but not thrown.
    Rolling,
    /// Dice are in the air.
    Settling,
    /// Every die has landed; waiting to be read.
    Checking,
    /// Companions were spawned and wait to be thrown.
    ExtraRolling,
    /// The cascade is finished and the result has been handed out.
    Done,
}

/// A single die in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Die {
    /// Identifier, unique within the session.
    pub id: u32,
    /// Companion spawned by an overclock.
    pub is_golden: bool,
    /// Cascade level the die was thrown in (0 for the initial pool).
    pub round: u32,
    /// Face it settled on, once it has.
    pub value: Option<u8>,
}

impl Die {
    /// Whether the die counts as a success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.value.is_some_and(|v| v % 2 == 0)
    }
}

/// What a check found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// New 8s were found; one companion per 8 awaits throwing.
    Overclock {
        /// Dice that triggered on this check.
        triggered_by: Vec<u32>,
        /// Companions spawned for them.
        companions: Vec<u32>,
    },
    /// No unprocessed 8 remains. Returned exactly once per session.
    Complete {
        /// Even faces across every level of the cascade.
        successes: u32,
    },
}

/// Final state of a completed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollSummary {
    /// Session identifier.
    pub roll_id: Uuid,
    /// Even faces across the whole cascade.
    pub successes: u32,
    /// Every die, original and golden, in spawn order.
    pub dice: Vec<Die>,
    /// Number of throws, including the initial one.
    pub rounds: u32,
}

/// The aggregate root for one dice roll.
///
/// The session is owned by a single cascade runner and dropped once the
/// summary has been taken; nothing about it is persisted.
#[derive(Debug)]
pub struct RollSession {
    /// Session identifier.
    pub id: Uuid,
    pub(crate) phase: CascadePhase,
    pub(crate) round: u32,
    dice: Vec<Die>,
    processed: HashSet<u32>,
    next_die_id: u32,
}

impl RollSession {
    /// Creates a session with `count` fresh dice.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `count` is outside `1..=MAX_DICE`.
    pub fn new(id: Uuid, count: u32) -> Result<Self, DomainError> {
        if !(1..=MAX_DICE).contains(&count) {
            return Err(DomainError::Validation(format!(
                "dice count must be between 1 and {MAX_DICE}, got {count}"
            )));
        }

        let dice = (1..=count)
            .map(|id| Die {
                id,
                is_golden: false,
                round: 0,
                value: None,
            })
            .collect();

        Ok(Self {
            id,
            phase: CascadePhase::Rolling,
            round: 0,
            dice,
            processed: HashSet::new(),
            next_die_id: count + 1,
        })
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> CascadePhase {
        self.phase
    }

    /// Current cascade level.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Every die so far.
    #[must_use]
    pub fn dice(&self) -> &[Die] {
        &self.dice
    }

    /// Throws every unsettled die. Returns their ids.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless in `Rolling` or
    /// `ExtraRolling` phase.
    pub fn throw(&mut self) -> Result<Vec<u32>, DomainError> {
        if !matches!(
            self.phase,
            CascadePhase::Rolling | CascadePhase::ExtraRolling
        ) {
            return Err(DomainError::Validation(
                "roll session must be in Rolling or ExtraRolling phase".to_owned(),
            ));
        }

        self.phase = CascadePhase::Settling;
        Ok(self
            .dice
            .iter()
            .filter(|d| d.value.is_none())
            .map(|d| d.id)
            .collect())
    }

    /// Lands every die still in the air, drawing its face from `rng`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if not in `Settling` phase.
    pub fn settle(&mut self, rng: &mut dyn DeterministicRng) -> Result<Vec<SettledFace>, DomainError> {
        if self.phase != CascadePhase::Settling {
            return Err(DomainError::Validation(
                "roll session must be in Settling phase".to_owned(),
            ));
        }

        let mut landed = Vec::new();
        for die in self.dice.iter_mut().filter(|d| d.value.is_none()) {
            // Faces are 1..=8, so the narrowing never truncates.
            #[allow(clippy::cast_possible_truncation)]
            let face = rng.next_u32_range(1, DIE_FACES) as u8;
            die.value = Some(face);
            landed.push(SettledFace {
                die_id: die.id,
                value: face,
            });
        }

        self.phase = CascadePhase::Checking;
        Ok(landed)
    }

    /// Reads the settled pool. Every settled 8 not yet processed spawns one
    /// golden companion and is marked processed; if none remain the session
    /// completes.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if not in `Checking` phase, which
    /// includes any check after completion.
    pub fn check(&mut self) -> Result<CheckOutcome, DomainError> {
        if self.phase != CascadePhase::Checking {
            return Err(DomainError::Validation(
                "roll session must be in Checking phase".to_owned(),
            ));
        }

        let triggered_by: Vec<u32> = self
            .dice
            .iter()
            .filter(|d| d.value == Some(OVERCLOCK_FACE) && !self.processed.contains(&d.id))
            .map(|d| d.id)
            .collect();

        if triggered_by.is_empty() {
            self.phase = CascadePhase::Done;
            return Ok(CheckOutcome::Complete {
                successes: self.successes(),
            });
        }

        self.round += 1;
        let mut companions = Vec::with_capacity(triggered_by.len());
        for &source in &triggered_by {
            self.processed.insert(source);
            let id = self.next_die_id;
            self.next_die_id += 1;
            self.dice.push(Die {
                id,
                is_golden: true,
                round: self.round,
                value: None,
            });
            companions.push(id);
        }

        self.phase = CascadePhase::ExtraRolling;
        Ok(CheckOutcome::Overclock {
            triggered_by,
            companions,
        })
    }

    /// Even faces among every settled die.
    #[must_use]
    pub fn successes(&self) -> u32 {
        let count = self.dice.iter().filter(|d| d.is_success()).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Snapshot of a finished session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the cascade has not completed.
    pub fn summary(&self) -> Result<RollSummary, DomainError> {
        if self.phase != CascadePhase::Done {
            return Err(DomainError::Validation(
                "roll session must be in Done phase".to_owned(),
            ));
        }

        Ok(RollSummary {
            roll_id: self.id,
            successes: self.successes(),
            dice: self.dice.clone(),
            rounds: self.round + 1,
        })
    }

    /// Runs the whole cascade without any settle delay.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the session was already started.
    pub fn resolve(mut self, rng: &mut dyn DeterministicRng) -> Result<RollSummary, DomainError> {
        loop {
            self.throw()?;
            self.settle(rng)?;
            if let CheckOutcome::Complete { .. } = self.check()? {
                return self.summary();
            }
        }
    }
}

/// The player input that reports a finished roll back to the narrator.
#[must_use]
pub fn roll_result_text(successes: u32) -> String {
    format!("I got {successes} success(es) on the roll.")
}
