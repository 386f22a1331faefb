//! Scripted dialogs shared by the engine integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parley_core::activity::Activity;
use parley_core::error::DialogError;
use parley_core::repository::StoredState;
use parley_dialogs::domain::context::DialogContext;
use parley_dialogs::domain::dialog::{
    Dialog, DialogKind, DialogReason, DialogTurnResult, InputBinding,
};
use parley_dialogs::domain::events::DialogEvent;
use parley_dialogs::domain::registry::DialogSet;
use parley_dialogs::domain::turn::{DIALOG_STACK_KEY, TurnState};
use parley_dialogs::library::component::ComponentDialog;
use serde_json::{Map, Value, json};

/// Where scripted dialogs record their end notifications.
pub const ENDED: &str = "conversation.ended";
/// Where intercepting dialogs record that they handled an event.
pub const INTERCEPTED_BY: &str = "turn.interceptedBy";
/// Where `WaitingDialog` records the result it was resumed with.
pub const LAST_RESULT: &str = "dialog.lastResult";

/// A turn for the message "hi" with no stored state.
pub fn turn_state() -> TurnState {
    TurnState::new(
        Activity::message("test", "hi"),
        StoredState::default(),
        Arc::default(),
    )
    .unwrap()
}

/// A turn whose root stack is deserialized from `stack`.
pub fn turn_with_stack(stack: Value) -> TurnState {
    let mut conversation = Map::new();
    conversation.insert(DIALOG_STACK_KEY.to_owned(), stack);
    TurnState::new(
        Activity::message("test", "hi"),
        StoredState {
            user: Map::new(),
            conversation,
        },
        Arc::default(),
    )
    .unwrap()
}

/// A turn with read-only settings.
pub fn turn_with_settings(settings: Map<String, Value>) -> TurnState {
    TurnState::new(
        Activity::message("test", "hi"),
        StoredState::default(),
        Arc::new(settings),
    )
    .unwrap()
}

/// End notifications recorded so far, oldest first.
pub fn ended(dc: &DialogContext<'_>) -> Vec<String> {
    dc.get(ENDED).unwrap().unwrap_or_default()
}

fn record_end(dc: &mut DialogContext<'_>, id: &str, reason: DialogReason) -> Result<(), DialogError> {
    let mut ended: Vec<String> = dc.get(ENDED)?.unwrap_or_default();
    ended.push(format!("{id}:{reason:?}"));
    dc.set_value(ENDED, json!(ended))
}

/// Waits on every turn and remembers what it was resumed with.
#[derive(Debug)]
pub struct WaitingDialog {
    id: String,
    tags: Vec<String>,
}

impl WaitingDialog {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|tag| (*tag).to_owned()).collect();
        self
    }
}

#[async_trait]
impl Dialog for WaitingDialog {
    fn id(&self) -> &str {
        &self.id
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    async fn begin_dialog(
        &self,
        _dc: &mut DialogContext<'_>,
        _options: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        Ok(DialogTurnResult::waiting())
    }

    async fn continue_dialog(
        &self,
        _dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, DialogError> {
        Ok(DialogTurnResult::waiting())
    }

    async fn resume_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        _reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        dc.set_value(LAST_RESULT, result.unwrap_or(Value::Null))?;
        Ok(DialogTurnResult::waiting())
    }

    async fn reprompt_dialog(&self, dc: &mut DialogContext<'_>) -> Result<(), DialogError> {
        dc.send_text(format!("{}: again", self.id));
        Ok(())
    }

    async fn end_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        reason: DialogReason,
    ) -> Result<(), DialogError> {
        record_end(dc, &self.id, reason)
    }
}

/// Ends as soon as it begins.
#[derive(Debug)]
pub struct EndingDialog {
    id: String,
    result: EndingResult,
    input_bindings: Vec<InputBinding>,
    output_binding: Option<String>,
}

#[derive(Debug)]
enum EndingResult {
    Fixed(Value),
    ReadFrom(String),
}

impl EndingDialog {
    /// Ends with `result`.
    pub fn with_result(id: &str, result: Value) -> Self {
        Self {
            id: id.to_owned(),
            result: EndingResult::Fixed(result),
            input_bindings: Vec::new(),
            output_binding: None,
        }
    }

    /// Ends with whatever is stored at `path` once the frame is pushed.
    pub fn echoing(id: &str, path: &str) -> Self {
        Self {
            id: id.to_owned(),
            result: EndingResult::ReadFrom(path.to_owned()),
            input_bindings: Vec::new(),
            output_binding: None,
        }
    }

    pub fn with_input(mut self, target: &str, source: &str) -> Self {
        self.input_bindings.push(InputBinding::new(target, source));
        self
    }

    pub fn with_output(mut self, path: &str) -> Self {
        self.output_binding = Some(path.to_owned());
        self
    }
}

#[async_trait]
impl Dialog for EndingDialog {
    fn id(&self) -> &str {
        &self.id
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
        let result = match &self.result {
            EndingResult::Fixed(value) => Some(value.clone()),
            EndingResult::ReadFrom(path) => dc.get_value(path)?,
        };
        dc.end_dialog(result).await
    }
}

/// Ends with "X" as soon as it begins.
#[derive(Debug)]
pub struct Inner;

#[async_trait]
impl Dialog for Inner {
    fn id(&self) -> &str {
        "Inner"
    }

    async fn begin_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        _options: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        dc.end_dialog(Some(json!("X"))).await
    }
}

/// Waits on begin, begins `Inner` on continue and ends with
/// `"done:" + result` once it completes.
#[derive(Debug)]
pub struct Outer;

#[async_trait]
impl Dialog for Outer {
    fn id(&self) -> &str {
        "Outer"
    }

    async fn begin_dialog(
        &self,
        _dc: &mut DialogContext<'_>,
        _options: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        Ok(DialogTurnResult::waiting())
    }

    async fn continue_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, DialogError> {
        dc.begin_dialog("Inner", None).await
    }

    async fn resume_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        _reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        let inner = result.as_ref().and_then(Value::as_str).unwrap_or_default();
        dc.end_dialog(Some(json!(format!("done:{inner}")))).await
    }
}

/// A command frame that waits.
#[derive(Debug)]
pub struct CommandDialog {
    id: String,
}

impl CommandDialog {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_owned() }
    }
}

#[async_trait]
impl Dialog for CommandDialog {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> DialogKind {
        DialogKind::Command
    }

    async fn begin_dialog(
        &self,
        _dc: &mut DialogContext<'_>,
        _options: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        Ok(DialogTurnResult::waiting())
    }

    async fn end_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        reason: DialogReason,
    ) -> Result<(), DialogError> {
        record_end(dc, &self.id, reason)
    }
}

/// A waiting leaf that handles one event name before it can bubble.
#[derive(Debug)]
pub struct InterceptingDialog {
    id: String,
    event: String,
}

impl InterceptingDialog {
    pub fn new(id: &str, event: &str) -> Self {
        Self {
            id: id.to_owned(),
            event: event.to_owned(),
        }
    }
}

#[async_trait]
impl Dialog for InterceptingDialog {
    fn id(&self) -> &str {
        &self.id
    }

    async fn begin_dialog(
        &self,
        _dc: &mut DialogContext<'_>,
        _options: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        Ok(DialogTurnResult::waiting())
    }

    async fn on_pre_bubble_event(
        &self,
        dc: &mut DialogContext<'_>,
        event: &DialogEvent,
    ) -> Result<bool, DialogError> {
        if event.name != self.event {
            return Ok(false);
        }
        dc.set_value(INTERCEPTED_BY, json!(self.id))?;
        Ok(true)
    }

    async fn end_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        reason: DialogReason,
    ) -> Result<(), DialogError> {
        record_end(dc, &self.id, reason)
    }
}

/// A component that also handles one event name.
#[derive(Debug)]
pub struct InterceptingContainer {
    component: ComponentDialog,
    event: String,
}

impl InterceptingContainer {
    pub fn new(id: &str, initial_dialog_id: &str, dialogs: DialogSet, event: &str) -> Self {
        Self {
            component: ComponentDialog::new(id, initial_dialog_id, dialogs),
            event: event.to_owned(),
        }
    }
}

#[async_trait]
impl Dialog for InterceptingContainer {
    fn id(&self) -> &str {
        self.component.id()
    }

    fn kind(&self) -> DialogKind {
        self.component.kind()
    }

    fn child_dialogs(&self) -> Option<Arc<DialogSet>> {
        self.component.child_dialogs()
    }

    async fn begin_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        self.component.begin_dialog(dc, options).await
    }

    async fn continue_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, DialogError> {
        self.component.continue_dialog(dc).await
    }

    async fn end_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        reason: DialogReason,
    ) -> Result<(), DialogError> {
        self.component.end_dialog(dc, reason).await
    }

    async fn on_pre_bubble_event(
        &self,
        dc: &mut DialogContext<'_>,
        event: &DialogEvent,
    ) -> Result<bool, DialogError> {
        if event.name != self.event {
            return Ok(false);
        }
        dc.set_value(INTERCEPTED_BY, json!(self.component.id()))?;
        Ok(true)
    }
}

/// A set of waiting dialogs with the given ids.
pub fn waiting_set(ids: &[&str]) -> DialogSet {
    let mut set = DialogSet::new();
    for id in ids {
        set.add(WaitingDialog::new(id)).unwrap();
    }
    set
}
