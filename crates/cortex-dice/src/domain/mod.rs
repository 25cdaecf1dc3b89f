//! Domain layer for the Dice context.

pub mod aggregates;
pub mod commands;
pub mod events;
