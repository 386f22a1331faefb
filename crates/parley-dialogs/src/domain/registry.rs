//! Dialog registry.

use std::collections::HashMap;
use std::sync::Arc;

use parley_core::error::DialogError;

use crate::domain::dialog::Dialog;

/// Maps dialog ids to their behavior. Holds no runtime state.
///
/// Lookups never leave this set; delegation to enclosing sets is done by
/// `DialogContext::find_dialog`.
#[derive(Debug, Clone, Default)]
pub struct DialogSet {
    dialogs: HashMap<String, Arc<dyn Dialog>>,
}

impl DialogSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `dialog` under `id`.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::EmptyDialogId` for an empty id and
    /// `DialogError::DuplicateId` if `id` is already registered.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        dialog: Arc<dyn Dialog>,
    ) -> Result<(), DialogError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DialogError::EmptyDialogId);
        }
        if self.dialogs.contains_key(&id) {
            return Err(DialogError::DuplicateId(id));
        }
        self.dialogs.insert(id, dialog);
        Ok(())
    }

    /// Registers `dialog` under its own id.
    ///
    /// # Errors
    ///
    /// Same as [`DialogSet::register`].
    pub fn add<D: Dialog + 'static>(&mut self, dialog: D) -> Result<(), DialogError> {
        let id = dialog.id().to_owned();
        self.register(id, Arc::new(dialog))
    }

    /// Looks up a dialog by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<Arc<dyn Dialog>> {
        self.dialogs.get(id).cloned()
    }

    /// Returns `true` if `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.dialogs.contains_key(id)
    }

    /// Number of registered dialogs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dialogs.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dialogs.is_empty()
    }
}
