//! Serialized turn execution.
//!
//! The engine does no locking of its own. Two turns for the same
//! conversation must not run against the same stack at once, so the runner
//! keeps one async gate per conversation id and holds it for the whole
//! load-run-save cycle. Turns for different conversations run concurrently.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use parley_core::activity::Activity;
use parley_core::clock::{Clock, SystemClock};
use parley_core::error::DialogError;
use parley_core::repository::StateStore;
use serde_json::{Map, Value};
use tracing::debug;

use crate::application::turn_handlers::{TurnOutcome, handle_turn};
use crate::domain::registry::DialogSet;

type Gate = Arc<tokio::sync::Mutex<()>>;

/// Owns everything needed to run turns for many conversations.
pub struct DialogRunner {
    dialogs: Arc<DialogSet>,
    root_dialog_id: String,
    store: Arc<dyn StateStore>,
    settings: Arc<Map<String, Value>>,
    clock: Arc<dyn Clock>,
    gates: Mutex<HashMap<String, Gate>>,
}

impl fmt::Debug for DialogRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogRunner")
            .field("root_dialog_id", &self.root_dialog_id)
            .field("dialogs", &self.dialogs.len())
            .finish_non_exhaustive()
    }
}

impl DialogRunner {
    /// Creates a runner that begins `root_dialog_id` for new conversations.
    #[must_use]
    pub fn new(
        dialogs: DialogSet,
        root_dialog_id: impl Into<String>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            dialogs: Arc::new(dialogs),
            root_dialog_id: root_dialog_id.into(),
            store,
            settings: Arc::new(Map::new()),
            clock: Arc::new(SystemClock),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the read-only settings scope.
    #[must_use]
    pub fn with_settings(mut self, settings: Map<String, Value>) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    /// Sets the clock used to stamp replies.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs one turn, waiting for any turn already running in the same
    /// conversation to finish first.
    ///
    /// # Errors
    ///
    /// Returns whatever [`handle_turn`] returns, and
    /// `DialogError::Infrastructure` if the gate registry is poisoned.
    pub async fn run_turn(&self, activity: Activity) -> Result<TurnOutcome, DialogError> {
        // Locals drop in reverse order: lock, then gate, then the release.
        let _release = GateRelease {
            runner: self,
            conversation_id: activity.conversation_id.clone(),
        };
        let gate = self.gate(&activity.conversation_id)?;
        let _turn = gate.lock().await;

        handle_turn(
            activity,
            &self.dialogs,
            &self.root_dialog_id,
            self.store.as_ref(),
            &self.settings,
            self.clock.as_ref(),
        )
        .await
    }

    /// Number of conversations with a turn running or queued.
    #[must_use]
    pub fn active_conversations(&self) -> usize {
        self.gates.lock().map_or(0, |gates| gates.len())
    }

    fn gate(&self, conversation_id: &str) -> Result<Gate, DialogError> {
        let mut gates = self
            .gates
            .lock()
            .map_err(|e| DialogError::Infrastructure(format!("turn gate lock poisoned: {e}")))?;
        Ok(Arc::clone(
            gates.entry(conversation_id.to_owned()).or_default(),
        ))
    }

    /// Drops the gate once no other turn holds or awaits it.
    fn release(&self, conversation_id: &str) {
        let Ok(mut gates) = self.gates.lock() else {
            return;
        };
        if gates
            .get(conversation_id)
            .is_some_and(|gate| Arc::strong_count(gate) == 1)
        {
            gates.remove(conversation_id);
            debug!(conversation_id, "released turn gate");
        }
    }
}

/// Releases a conversation's gate when a turn finishes or its future is
/// dropped.
struct GateRelease<'r> {
    runner: &'r DialogRunner,
    conversation_id: String,
}

impl Drop for GateRelease<'_> {
    fn drop(&mut self) {
        self.runner.release(&self.conversation_id);
    }
}
