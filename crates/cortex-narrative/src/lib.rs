//! Cortex — Narrative Orchestration bounded context.
//!
//! Runs a player turn through the agent chain: the operator picks rule
//! modules, the assembler builds the narrator's context, the narrator
//! answers with prose plus mechanics, and the mechanics resolver applies
//! them. A summarizer compresses the message log in the background.

pub mod application;
pub mod domain;
