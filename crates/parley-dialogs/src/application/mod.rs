//! Turn handling around the engine: load state, run one turn, save state.

pub mod memory_store;
pub mod runner;
pub mod turn_handlers;
