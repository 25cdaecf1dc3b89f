//! Application layer for the Mechanics context.

pub mod command_handlers;
