//! Per-encounter turn gate: at most one turn in flight per scope.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use cortex_core::entity::EncounterScope;

/// Tracks scopes with a turn in progress.
#[derive(Debug, Default)]
pub struct TurnGate {
    busy: Mutex<HashSet<EncounterScope>>,
}

impl TurnGate {
    /// Creates an idle gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `scope`. Returns `None` while another permit for the same
    /// scope is alive.
    pub fn try_acquire(&self, scope: EncounterScope) -> Option<TurnPermit<'_>> {
        let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        busy.insert(scope).then(|| TurnPermit { gate: self, scope })
    }

    /// Whether a turn is running for `scope`.
    #[must_use]
    pub fn is_busy(&self, scope: EncounterScope) -> bool {
        self.busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&scope)
    }
}

/// Releases its scope on drop.
#[derive(Debug)]
pub struct TurnPermit<'a> {
    gate: &'a TurnGate,
    scope: EncounterScope,
}

impl Drop for TurnPermit<'_> {
    fn drop(&mut self) {
        self.gate
            .busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.scope);
    }
}
