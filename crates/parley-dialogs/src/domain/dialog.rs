//! The dialog capability contract.

use std::sync::Arc;

use async_trait::async_trait;
use parley_core::error::DialogError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::context::DialogContext;
use crate::domain::events::DialogEvent;
use crate::domain::registry::DialogSet;

/// Outcome of running a dialog operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DialogTurnStatus {
    /// There was no active dialog to run.
    Empty,
    /// The active dialog is waiting for the next turn.
    Waiting,
    /// The last dialog on the stack ended.
    Completed,
    /// Dialogs were cancelled.
    Cancelled,
}

/// Status plus optional result of a dialog operation.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogTurnResult {
    /// What happened.
    pub status: DialogTurnStatus,
    /// Result passed to `end_dialog`, when the stack completed.
    pub result: Option<Value>,
}

impl DialogTurnResult {
    /// Nothing was running.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            status: DialogTurnStatus::Empty,
            result: None,
        }
    }

    /// The active dialog awaits the next turn.
    #[must_use]
    pub fn waiting() -> Self {
        Self {
            status: DialogTurnStatus::Waiting,
            result: None,
        }
    }

    /// The stack completed with `result`.
    #[must_use]
    pub fn completed(result: Option<Value>) -> Self {
        Self {
            status: DialogTurnStatus::Completed,
            result,
        }
    }

    /// Dialogs were cancelled.
    #[must_use]
    pub fn cancelled() -> Self {
        Self {
            status: DialogTurnStatus::Cancelled,
            result: None,
        }
    }
}

/// Why a dialog is being resumed or ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogReason {
    /// The dialog was just begun.
    BeginCalled,
    /// A new turn continued the dialog.
    ContinueCalled,
    /// A child ended, or the dialog itself ended.
    EndCalled,
    /// The dialog was replaced.
    ReplaceCalled,
    /// The dialog was cancelled.
    CancelCalled,
    /// A waterfall step advanced to the next one.
    NextCalled,
}

/// Variant tag of a dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogKind {
    /// A single interaction, such as a prompt.
    #[default]
    Leaf,
    /// A linear sequence of steps.
    Waterfall,
    /// Hosts a nested stack of child dialogs.
    Container,
    /// A lightweight frame that shares an ancestor's memory.
    Command,
}

/// Copies a value from the current scopes into a newly begun dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBinding {
    /// Dialog property to fill, written as `dialog.<key>` or `$<key>`.
    pub target: String,
    /// Path to read before the new frame is pushed.
    pub source: String,
}

impl InputBinding {
    /// Creates a binding from `source` into `target`.
    #[must_use]
    pub fn new(target: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source: source.into(),
        }
    }
}

/// Behavior of a registered dialog.
///
/// Every hook receives the context whose active frame belongs to this
/// dialog. Defaults give the behavior of a dialog that ends as soon as it is
/// continued and hands child results straight back to its own parent.
#[async_trait]
pub trait Dialog: Send + Sync + std::fmt::Debug {
    /// Registry key.
    fn id(&self) -> &str;

    /// Variant tag. `DialogKind::Command` frames share memory instead of
    /// owning it.
    fn kind(&self) -> DialogKind {
        DialogKind::Leaf
    }

    /// Tags reported by `DialogContext::active_tags` while this dialog is on
    /// a stack.
    fn tags(&self) -> &[String] {
        &[]
    }

    /// Values copied into the new frame before `begin_dialog` runs.
    fn input_bindings(&self) -> &[InputBinding] {
        &[]
    }

    /// Path in the resumed parent's scope that receives this dialog's result.
    fn output_binding(&self) -> Option<&str> {
        None
    }

    /// The dialog set a child context of this dialog resolves against.
    /// Only container dialogs return one.
    fn child_dialogs(&self) -> Option<Arc<DialogSet>> {
        None
    }

    /// Starts the dialog on a freshly pushed frame.
    async fn begin_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError>;

    /// Handles a new turn while this dialog is active.
    async fn continue_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, DialogError> {
        dc.end_dialog(None).await
    }

    /// Regains control after a child ended with `result`.
    async fn resume_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        _reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        dc.end_dialog(result).await
    }

    /// Re-asks whatever the dialog is waiting on.
    async fn reprompt_dialog(&self, _dc: &mut DialogContext<'_>) -> Result<(), DialogError> {
        Ok(())
    }

    /// Called while this dialog's frame is still active, just before it is
    /// popped.
    async fn end_dialog(
        &self,
        _dc: &mut DialogContext<'_>,
        _reason: DialogReason,
    ) -> Result<(), DialogError> {
        Ok(())
    }

    /// Offers an event to this dialog. Returns `true` if it was handled.
    ///
    /// The default runs `on_pre_bubble_event`, then re-emits a bubbling
    /// event to the parent context, then runs `on_post_bubble_event`,
    /// stopping as soon as one of them handles it.
    async fn on_dialog_event(
        &self,
        dc: &mut DialogContext<'_>,
        event: &DialogEvent,
    ) -> Result<bool, DialogError> {
        let mut handled = self.on_pre_bubble_event(dc, event).await?;

        if !handled && event.bubble {
            if let Some(mut parent) = dc.parent() {
                handled = parent
                    .emit_event(&event.name, event.value.clone(), true, false)
                    .await?;
            }
        }

        if !handled {
            handled = self.on_post_bubble_event(dc, event).await?;
        }

        Ok(handled)
    }

    /// Sees an event before any ancestor does.
    async fn on_pre_bubble_event(
        &self,
        _dc: &mut DialogContext<'_>,
        _event: &DialogEvent,
    ) -> Result<bool, DialogError> {
        Ok(false)
    }

    /// Sees an event after every ancestor declined it.
    async fn on_post_bubble_event(
        &self,
        _dc: &mut DialogContext<'_>,
        _event: &DialogEvent,
    ) -> Result<bool, DialogError> {
        Ok(false)
    }
}
