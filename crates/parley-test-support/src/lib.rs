//! Shared test doubles and utilities for the Parley dialog engine.

mod activity;
mod clock;
mod store;

pub use activity::{TEST_CONVERSATION_ID, event, message};
pub use clock::FixedClock;
pub use store::{EmptyStateStore, FailingStateStore, RecordingStateStore};
