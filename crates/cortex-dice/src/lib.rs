//! Cortex — Dice Overclock Cascade bounded context.
//!
//! Rolls a pool of eight-sided dice, spawns a golden companion for every
//! die that lands on 8, and reports the number of even faces once the
//! cascade has run dry.

pub mod application;
pub mod domain;
