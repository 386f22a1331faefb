//! Test state stores: `StateStore` doubles for exercising turn handling.

use std::sync::Mutex;

use async_trait::async_trait;
use parley_core::error::DialogError;
use parley_core::repository::{StateStore, StoredState};

/// A state store that returns a configured snapshot from every `load` and
/// records every `save`.
#[derive(Debug)]
pub struct RecordingStateStore {
    load_result: Option<StoredState>,
    loaded: Mutex<Vec<String>>,
    saved: Mutex<Vec<(String, StoredState)>>,
}

impl RecordingStateStore {
    /// Create a store whose `load` always returns `load_result`.
    #[must_use]
    pub fn new(load_result: Option<StoredState>) -> Self {
        Self {
            load_result,
            loaded: Mutex::new(Vec::new()),
            saved: Mutex::new(Vec::new()),
        }
    }

    /// Conversation ids passed to `load`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn loaded_conversations(&self) -> Vec<String> {
        self.loaded.lock().unwrap().clone()
    }

    /// Snapshots passed to `save`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved_states(&self) -> Vec<(String, StoredState)> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl StateStore for RecordingStateStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<StoredState>, DialogError> {
        self.loaded.lock().unwrap().push(conversation_id.to_owned());
        Ok(self.load_result.clone())
    }

    async fn save(&self, conversation_id: &str, state: &StoredState) -> Result<(), DialogError> {
        self.saved
            .lock()
            .unwrap()
            .push((conversation_id.to_owned(), state.clone()));
        Ok(())
    }
}

/// A state store with nothing in it that silently accepts saves. Every turn
/// starts a fresh conversation.
#[derive(Debug)]
pub struct EmptyStateStore;

#[async_trait]
impl StateStore for EmptyStateStore {
    async fn load(&self, _conversation_id: &str) -> Result<Option<StoredState>, DialogError> {
        Ok(None)
    }

    async fn save(&self, _conversation_id: &str, _state: &StoredState) -> Result<(), DialogError> {
        Ok(())
    }
}

/// A state store that always returns an infrastructure error. Useful for
/// testing error propagation.
#[derive(Debug)]
pub struct FailingStateStore;

#[async_trait]
impl StateStore for FailingStateStore {
    async fn load(&self, _conversation_id: &str) -> Result<Option<StoredState>, DialogError> {
        Err(DialogError::Infrastructure("connection refused".into()))
    }

    async fn save(&self, _conversation_id: &str, _state: &StoredState) -> Result<(), DialogError> {
        Err(DialogError::Infrastructure("connection refused".into()))
    }
}
