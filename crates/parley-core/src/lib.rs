//! Parley Core: shared abstractions for the dialog engine.
//!
//! This crate defines the values and collaborator traits the engine talks
//! to: the inbound turn, the persistent state store, the clock, and the
//! settings view. It contains no orchestration logic.

pub mod activity;
pub mod clock;
pub mod error;
pub mod repository;
pub mod settings;
