//! Container dialog hosting its own child stack.

use std::sync::Arc;

use async_trait::async_trait;
use parley_core::error::DialogError;
use serde_json::Value;
use tracing::debug;

use crate::domain::context::DialogContext;
use crate::domain::dialog::{Dialog, DialogKind, DialogReason, DialogTurnResult, DialogTurnStatus};
use crate::domain::registry::DialogSet;

/// Runs a nested dialog set as a single dialog.
///
/// The component's frame hosts a child stack. Beginning the component begins
/// `initial_dialog_id` on that stack; the component ends as soon as its child
/// stack stops waiting, returning the child's result to its own parent.
#[derive(Debug, Clone)]
pub struct ComponentDialog {
    id: String,
    dialogs: Arc<DialogSet>,
    initial_dialog_id: String,
    tags: Vec<String>,
}

impl ComponentDialog {
    /// Creates a component that starts `initial_dialog_id` from `dialogs`.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        initial_dialog_id: impl Into<String>,
        dialogs: DialogSet,
    ) -> Self {
        Self {
            id: id.into(),
            dialogs: Arc::new(dialogs),
            initial_dialog_id: initial_dialog_id.into(),
            tags: Vec::new(),
        }
    }

    /// Adds a tag reported while the component is running.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Id of the dialog begun on the child stack.
    #[must_use]
    pub fn initial_dialog_id(&self) -> &str {
        &self.initial_dialog_id
    }

    async fn end_component(
        &self,
        dc: &mut DialogContext<'_>,
        child_result: DialogTurnResult,
    ) -> Result<DialogTurnResult, DialogError> {
        match child_result.status {
            DialogTurnStatus::Waiting | DialogTurnStatus::Cancelled => Ok(child_result),
            DialogTurnStatus::Empty | DialogTurnStatus::Completed => {
                debug!(component = %self.id, "child stack finished");
                dc.end_dialog(child_result.result).await
            }
        }
    }
}

#[async_trait]
impl Dialog for ComponentDialog {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> DialogKind {
        DialogKind::Container
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn child_dialogs(&self) -> Option<Arc<DialogSet>> {
        Some(Arc::clone(&self.dialogs))
    }

    async fn begin_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        let child_result = dc
            .child()
            .ok_or(DialogError::DetachedContext)?
            .begin_dialog(&self.initial_dialog_id, options)
            .await?;
        self.end_component(dc, child_result).await
    }

    async fn continue_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, DialogError> {
        let child_result = dc
            .child()
            .ok_or(DialogError::DetachedContext)?
            .continue_dialog()
            .await?;
        self.end_component(dc, child_result).await
    }

    async fn resume_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        _reason: DialogReason,
        _result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        self.reprompt_dialog(dc).await?;
        Ok(DialogTurnResult::waiting())
    }

    async fn reprompt_dialog(&self, dc: &mut DialogContext<'_>) -> Result<(), DialogError> {
        if let Some(mut child) = dc.child() {
            child.reprompt_dialog().await?;
        }
        Ok(())
    }

    async fn end_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        reason: DialogReason,
    ) -> Result<(), DialogError> {
        if reason == DialogReason::CancelCalled {
            if let Some(mut child) = dc.child() {
                child.end_local_dialogs(reason).await?;
            }
        }
        Ok(())
    }
}
