//! Application layer for the Narrative context.
//!
//! Each agent is a standalone stage with typed input and output. The
//! pipeline wires them together and owns the per-stage error boundaries.

pub mod assembler;
pub mod gate;
pub mod narrator;
pub mod operator;
pub mod pipeline;
pub mod summarizer;
