//! Domain layer for the Mechanics context.

pub mod commands;
pub mod deltas;
pub mod rules;
