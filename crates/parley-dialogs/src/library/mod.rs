//! Reusable dialog variants built on the engine.

pub mod component;
pub mod prompt;
pub mod waterfall;
