//! Persistent state collaborator.
//!
//! The engine reads two opaque snapshots per conversation, user and
//! conversation, and hands them back after the turn. Storing them is the
//! caller's business; this module only fixes the interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DialogError;

/// The pair of snapshots persisted for one conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredState {
    /// State that follows the user across conversations.
    #[serde(default)]
    pub user: Map<String, Value>,
    /// State scoped to this conversation, including the serialized dialog
    /// stack.
    #[serde(default)]
    pub conversation: Map<String, Value>,
}

/// Repository trait for loading and saving conversation state.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the snapshots for a conversation, or `None` if nothing was
    /// saved yet.
    async fn load(&self, conversation_id: &str) -> Result<Option<StoredState>, DialogError>;

    /// Replaces the snapshots for a conversation.
    async fn save(&self, conversation_id: &str, state: &StoredState) -> Result<(), DialogError>;
}
