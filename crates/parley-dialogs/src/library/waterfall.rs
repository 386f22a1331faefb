//! Waterfall dialogs: a fixed sequence of steps.
//!
//! Each step runs once. A step either begins a child dialog (whose result is
//! handed to the next step when it ends), ends the waterfall, waits for the
//! next message, or skips ahead with [`WaterfallStepContext::next`].

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use async_trait::async_trait;
use parley_core::error::DialogError;
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::context::DialogContext;
use crate::domain::dialog::{Dialog, DialogKind, DialogReason, DialogTurnResult, InputBinding};
use crate::domain::scope::DIALOG_OPTIONS;

/// Index of the step currently running.
pub const STEP_INDEX: &str = "dialog.stepIndex";
/// Waterfall-local values collected by the steps.
pub const VALUES: &str = "dialog.values";

/// One step of a waterfall.
#[async_trait]
pub trait WaterfallStep: Send + Sync {
    /// Runs the step.
    async fn run(
        &self,
        step: &mut WaterfallStepContext<'_, '_>,
    ) -> Result<DialogTurnResult, DialogError>;
}

/// The context a step runs in. Dereferences to the waterfall's
/// [`DialogContext`].
pub struct WaterfallStepContext<'s, 'a> {
    dc: &'s mut DialogContext<'a>,
    waterfall: &'s Waterfall,
    index: usize,
    options: Option<Value>,
    result: Option<Value>,
    reason: DialogReason,
    next_called: bool,
}

impl<'a> WaterfallStepContext<'_, 'a> {
    /// Zero-based index of this step.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Options the waterfall was begun with.
    #[must_use]
    pub fn options(&self) -> Option<&Value> {
        self.options.as_ref()
    }

    /// Result of the previous step or of the child dialog it began.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Why this step is running.
    #[must_use]
    pub fn reason(&self) -> DialogReason {
        self.reason
    }

    /// Values saved by earlier steps.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::Serialization` if the stored values are not an
    /// object.
    pub fn values(&self) -> Result<Map<String, Value>, DialogError> {
        Ok(self.dc.get(VALUES)?.unwrap_or_default())
    }

    /// Saves `value` under `key` for later steps.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::InvalidPath` if `key` is not a valid path
    /// segment.
    pub fn save_value(&mut self, key: &str, value: Value) -> Result<(), DialogError> {
        self.dc.set_value(&format!("{VALUES}.{key}"), value)
    }

    /// Skips to the next step, handing it `result`.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::InvalidArgument` if called twice from the same
    /// step, plus whatever the next step returns.
    pub async fn next(&mut self, result: Option<Value>) -> Result<DialogTurnResult, DialogError> {
        if self.next_called {
            return Err(DialogError::InvalidArgument(format!(
                "step {} of '{}' called next twice",
                self.index, self.waterfall.id
            )));
        }
        self.next_called = true;
        self.waterfall
            .resume_dialog(&mut *self.dc, DialogReason::NextCalled, result)
            .await
    }

    /// The underlying dialog context.
    pub fn context(&mut self) -> &mut DialogContext<'a> {
        &mut *self.dc
    }
}

impl<'a> Deref for WaterfallStepContext<'_, 'a> {
    type Target = DialogContext<'a>;

    fn deref(&self) -> &Self::Target {
        &*self.dc
    }
}

impl DerefMut for WaterfallStepContext<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.dc
    }
}

/// A dialog that runs its steps in order.
#[derive(Clone)]
pub struct Waterfall {
    id: String,
    steps: Vec<Arc<dyn WaterfallStep>>,
    tags: Vec<String>,
    input_bindings: Vec<InputBinding>,
    output_binding: Option<String>,
}

impl std::fmt::Debug for Waterfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waterfall")
            .field("id", &self.id)
            .field("steps", &self.steps.len())
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl Waterfall {
    /// Creates a waterfall with no steps.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            steps: Vec::new(),
            tags: Vec::new(),
            input_bindings: Vec::new(),
            output_binding: None,
        }
    }

    /// Appends a step.
    #[must_use]
    pub fn step(mut self, step: impl WaterfallStep + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Adds a tag reported while the waterfall is running.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Copies `source` into `target` when the waterfall begins.
    #[must_use]
    pub fn with_input_binding(mut self, binding: InputBinding) -> Self {
        self.input_bindings.push(binding);
        self
    }

    /// Writes the waterfall's result to `path` in the resumed parent.
    #[must_use]
    pub fn with_output_binding(mut self, path: impl Into<String>) -> Self {
        self.output_binding = Some(path.into());
        self
    }

    async fn run_step(
        &self,
        dc: &mut DialogContext<'_>,
        index: usize,
        reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        let Some(step) = self.steps.get(index) else {
            debug!(waterfall = %self.id, "waterfall finished");
            return dc.end_dialog(result).await;
        };

        dc.set_value(STEP_INDEX, Value::from(index))?;
        let options = dc.get_value(DIALOG_OPTIONS)?;
        debug!(waterfall = %self.id, index, ?reason, "running waterfall step");

        let mut step_context = WaterfallStepContext {
            dc,
            waterfall: self,
            index,
            options,
            result,
            reason,
            next_called: false,
        };
        step.run(&mut step_context).await
    }
}

#[async_trait]
impl Dialog for Waterfall {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> DialogKind {
        DialogKind::Waterfall
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn input_bindings(&self) -> &[InputBinding] {
        &self.input_bindings
    }

    fn output_binding(&self) -> Option<&str> {
        self.output_binding.as_deref()
    }

    async fn begin_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        _options: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        dc.set_value(VALUES, Value::Object(Map::new()))?;
        self.run_step(dc, 0, DialogReason::BeginCalled, None).await
    }

    async fn continue_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, DialogError> {
        if !dc.activity().is_message() {
            return Ok(DialogTurnResult::waiting());
        }
        let text = dc.activity().text.clone().map(Value::from);
        self.resume_dialog(dc, DialogReason::ContinueCalled, text)
            .await
    }

    async fn resume_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        let index = dc.get::<usize>(STEP_INDEX)?.unwrap_or(0);
        self.run_step(dc, index + 1, reason, result).await
    }
}
