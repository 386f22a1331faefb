//! The dialog engine: registry, frames, scoped state and the context that
//! orchestrates them.

pub mod context;
pub mod dialog;
pub mod events;
pub mod frame;
pub mod registry;
pub mod scope;
pub mod turn;
