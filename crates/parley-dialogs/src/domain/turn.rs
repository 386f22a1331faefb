//! Per-turn state.

use std::sync::Arc;

use parley_core::activity::Activity;
use parley_core::error::DialogError;
use parley_core::repository::StoredState;
use serde_json::{Map, Value};

use crate::domain::frame::DialogStack;

/// Key under which the root dialog stack is kept in the conversation
/// snapshot.
pub const DIALOG_STACK_KEY: &str = "dialogStack";

/// Everything one turn operates on.
///
/// Built from the stored snapshots at the start of a turn and turned back
/// into them with [`TurnState::into_stored_state`] once the turn is done.
/// Dialog contexts borrow it for the duration of the turn.
#[derive(Debug)]
pub struct TurnState {
    activity: Activity,
    settings: Arc<Map<String, Value>>,
    pub(crate) user: Map<String, Value>,
    pub(crate) conversation: Map<String, Value>,
    pub(crate) turn: Map<String, Value>,
    pub(crate) stack: DialogStack,
    outbox: Vec<Activity>,
    global_tags: Vec<String>,
}

impl TurnState {
    /// Starts a turn for `activity` over the stored snapshots.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::Serialization` if the stored dialog stack is
    /// malformed or the activity cannot be represented as JSON.
    pub fn new(
        activity: Activity,
        stored: StoredState,
        settings: Arc<Map<String, Value>>,
    ) -> Result<Self, DialogError> {
        let StoredState {
            user,
            mut conversation,
        } = stored;
        let stack = match conversation.remove(DIALOG_STACK_KEY) {
            Some(value) => serde_json::from_value(value)?,
            None => DialogStack::new(),
        };
        let mut turn = Map::new();
        turn.insert("activity".to_owned(), serde_json::to_value(&activity)?);

        Ok(Self {
            activity,
            settings,
            user,
            conversation,
            turn,
            stack,
            outbox: Vec::new(),
            global_tags: Vec::new(),
        })
    }

    /// The inbound activity.
    #[must_use]
    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Read-only settings.
    #[must_use]
    pub fn settings(&self) -> &Map<String, Value> {
        &self.settings
    }

    /// The root dialog stack.
    #[must_use]
    pub fn stack(&self) -> &DialogStack {
        &self.stack
    }

    /// Queues an outbound reply.
    pub fn send_activity(&mut self, activity: Activity) {
        self.outbox.push(activity);
    }

    /// Returns `true` once anything was sent this turn.
    #[must_use]
    pub fn responded(&self) -> bool {
        !self.outbox.is_empty()
    }

    /// Replies queued so far.
    #[must_use]
    pub fn replies(&self) -> &[Activity] {
        &self.outbox
    }

    /// Drains the queued replies.
    pub fn take_replies(&mut self) -> Vec<Activity> {
        std::mem::take(&mut self.outbox)
    }

    /// Tags active for the whole turn regardless of the stack.
    #[must_use]
    pub fn global_tags(&self) -> &[String] {
        &self.global_tags
    }

    /// Replaces the turn's global tags.
    pub fn set_global_tags(&mut self, tags: Vec<String>) {
        self.global_tags = tags;
    }

    /// Ends the turn, folding the dialog stack back into the conversation
    /// snapshot. Turn-scoped state is dropped.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::Serialization` if the stack cannot be encoded.
    pub fn into_stored_state(self) -> Result<StoredState, DialogError> {
        let mut conversation = self.conversation;
        if self.stack.is_empty() {
            conversation.remove(DIALOG_STACK_KEY);
        } else {
            conversation.insert(
                DIALOG_STACK_KEY.to_owned(),
                serde_json::to_value(&self.stack)?,
            );
        }
        Ok(StoredState {
            user: self.user,
            conversation,
        })
    }
}
