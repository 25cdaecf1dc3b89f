//! Cortex — Mechanics Resolution bounded context.
//!
//! Turns the narrator's structured mechanics deltas into writes against
//! character vitals and the threat roster.

pub mod application;
pub mod domain;
