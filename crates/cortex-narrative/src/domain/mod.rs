//! Domain layer for the Narrative context.

pub mod commands;
pub mod context;
pub mod summary;
pub mod tags;
pub mod turn;
