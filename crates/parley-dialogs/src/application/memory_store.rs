//! In-memory `StateStore`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use parley_core::error::DialogError;
use parley_core::repository::{StateStore, StoredState};

/// Keeps snapshots in a process-local map. State is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: Mutex<HashMap<String, StoredState>>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conversations with saved state.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::Infrastructure` if the store's lock is poisoned.
    pub fn len(&self) -> Result<usize, DialogError> {
        Ok(self.lock()?.len())
    }

    /// Returns `true` if nothing has been saved.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::Infrastructure` if the store's lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, DialogError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, StoredState>>, DialogError> {
        self.states
            .lock()
            .map_err(|e| DialogError::Infrastructure(format!("state store lock poisoned: {e}")))
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<StoredState>, DialogError> {
        Ok(self.lock()?.get(conversation_id).cloned())
    }

    async fn save(&self, conversation_id: &str, state: &StoredState) -> Result<(), DialogError> {
        self.lock()?
            .insert(conversation_id.to_owned(), state.clone());
        Ok(())
    }
}
