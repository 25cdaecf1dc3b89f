//! Shared test doubles for the Cortex narrative RPG engine.

mod backend;
mod clock;
mod content;
mod rng;
mod store;

pub use backend::{FailingBackend, ScriptedBackend};
pub use clock::{FixedClock, fixed_now};
pub use content::StaticContentStore;
pub use rng::{MockRng, SequenceRng};
pub use store::{FailingGameStore, InMemoryGameStore, sample_campaign, sample_character};
