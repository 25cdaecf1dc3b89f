//! Cortex Core — shared domain abstractions.
//!
//! This crate defines the records, collaborator traits and error types that
//! every bounded context depends on. It contains no infrastructure code: the
//! persistent store, the content store and the generation backend are all
//! reached through the traits declared here.

pub mod clock;
pub mod command;
pub mod content;
pub mod entity;
pub mod error;
pub mod generation;
pub mod repository;
pub mod rng;
