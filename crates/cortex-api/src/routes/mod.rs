//! Route modules.

pub mod dice;
pub mod health;
pub mod turns;
