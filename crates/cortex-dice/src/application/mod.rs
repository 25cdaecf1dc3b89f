//! Application layer for the Dice context.

pub mod cascade;
pub mod command_handlers;
