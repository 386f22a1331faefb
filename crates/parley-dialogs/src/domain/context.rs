//! The dialog context: stack discipline, scoped state and event dispatch.
//!
//! A `DialogContext` is a view onto one level of a tree of stacks. The root
//! context addresses `TurnState::stack`; the child context of a container
//! addresses the `children` stack of the container's frame, and so on. A
//! context holds the dialog sets of every level from the root down to its
//! own, which is how lookups delegate outward and how ancestor stacks are
//! reached for cancellation and inherited state. Child and parent contexts
//! are transient views recreated on demand, never stored.

use std::sync::Arc;

use parley_core::activity::Activity;
use parley_core::error::DialogError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::dialog::{Dialog, DialogKind, DialogReason, DialogTurnResult};
use crate::domain::events::{DialogEvent, REPROMPT_DIALOG};
use crate::domain::frame::{DialogFrame, DialogStack, StateLocation, locate_state};
use crate::domain::registry::DialogSet;
use crate::domain::scope::{
    DIALOG_OPTIONS, STEP_OPTIONS, Scope, StatePath, TURN_REPEAT_DIALOG_ID,
};
use crate::domain::turn::TurnState;

/// A begin request that passed every check possible before a push.
struct PreparedBegin {
    dialog: Arc<dyn Dialog>,
    bindings: Vec<(String, Value)>,
}

/// Runs dialogs against one level of the stack tree.
#[derive(Debug)]
pub struct DialogContext<'a> {
    /// Dialog sets from the root (index 0) down to this context.
    dialogs: Vec<Arc<DialogSet>>,
    turn: &'a mut TurnState,
}

impl<'a> DialogContext<'a> {
    /// Creates the root context of a turn.
    #[must_use]
    pub fn new(dialogs: Arc<DialogSet>, turn: &'a mut TurnState) -> Self {
        Self {
            dialogs: vec![dialogs],
            turn,
        }
    }

    /// Nesting level; 0 for the root context.
    #[must_use]
    pub fn level(&self) -> usize {
        self.dialogs.len() - 1
    }

    /// Returns `true` for child contexts.
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.level() > 0
    }

    /// The dialog set registered at this level.
    #[must_use]
    pub fn dialogs(&self) -> &Arc<DialogSet> {
        &self.dialogs[self.level()]
    }

    /// The turn this context runs in.
    #[must_use]
    pub fn turn(&self) -> &TurnState {
        self.turn
    }

    /// Mutable access to the turn.
    pub fn turn_mut(&mut self) -> &mut TurnState {
        self.turn
    }

    /// The inbound activity.
    #[must_use]
    pub fn activity(&self) -> &Activity {
        self.turn.activity()
    }

    /// Queues an outbound reply.
    pub fn send_activity(&mut self, activity: Activity) {
        self.turn.send_activity(activity);
    }

    /// Queues a text reply in the current conversation.
    pub fn send_text(&mut self, text: impl Into<String>) {
        let reply = self.turn.activity().reply(text);
        self.turn.send_activity(reply);
    }

    // ---------------------------------------------------------------------
    // Stack access
    // ---------------------------------------------------------------------

    /// This context's stack, or `None` if the container frame hosting it
    /// has been removed.
    #[must_use]
    pub fn stack(&self) -> Option<&DialogStack> {
        stack_at(&self.turn.stack, self.level())
    }

    /// Number of frames on this context's stack.
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.stack().map_or(0, DialogStack::len)
    }

    /// The active frame as stored. Its `state` is `None` for command frames;
    /// use [`DialogContext::dialog_state`] for the effective memory.
    #[must_use]
    pub fn active_dialog(&self) -> Option<&DialogFrame> {
        self.stack().and_then(DialogStack::active)
    }

    fn active_dialog_id(&self) -> Option<String> {
        self.active_dialog().map(|frame| frame.id.clone())
    }

    fn stack_mut(&mut self) -> Result<&mut DialogStack, DialogError> {
        let level = self.level();
        stack_at_mut(&mut self.turn.stack, level).ok_or(DialogError::DetachedContext)
    }

    /// Stacks from the root down to this level, stopping early if a level
    /// no longer exists.
    fn chain(&self) -> Vec<&DialogStack> {
        let mut chain = Vec::with_capacity(self.dialogs.len());
        let mut stack = &self.turn.stack;
        chain.push(stack);
        for _ in 0..self.level() {
            match stack.active() {
                Some(frame) => {
                    stack = &frame.children;
                    chain.push(stack);
                }
                None => break,
            }
        }
        chain
    }

    // ---------------------------------------------------------------------
    // Context linkage
    // ---------------------------------------------------------------------

    fn view(&mut self, dialogs: Vec<Arc<DialogSet>>) -> DialogContext<'_> {
        DialogContext {
            dialogs,
            turn: &mut *self.turn,
        }
    }

    fn at_level(&mut self, level: usize) -> DialogContext<'_> {
        let dialogs = self.dialogs[..=level].to_vec();
        self.view(dialogs)
    }

    /// The enclosing context, if this is a child context.
    pub fn parent(&mut self) -> Option<DialogContext<'_>> {
        let level = self.level().checked_sub(1)?;
        Some(self.at_level(level))
    }

    /// The child context hosted by the active dialog, if it is a container.
    pub fn child(&mut self) -> Option<DialogContext<'_>> {
        let frame = self.active_dialog()?;
        let child_set = self.find_dialog(&frame.id)?.child_dialogs()?;
        let mut dialogs = self.dialogs.clone();
        dialogs.push(child_set);
        Some(self.view(dialogs))
    }

    /// Dialog sets of the deepest context reachable through active
    /// containers whose child stacks are running.
    fn leaf_dialogs(&self) -> Vec<Arc<DialogSet>> {
        let mut dialogs = self.dialogs.clone();
        loop {
            let level = dialogs.len() - 1;
            let Some(frame) = stack_at(&self.turn.stack, level).and_then(DialogStack::active)
            else {
                break;
            };
            if frame.children.is_empty() {
                break;
            }
            let Some(child_set) = find_in(&dialogs, &frame.id).and_then(|d| d.child_dialogs())
            else {
                break;
            };
            dialogs.push(child_set);
        }
        dialogs
    }

    /// Looks a dialog up in this context's set, then in each ancestor's.
    #[must_use]
    pub fn find_dialog(&self, id: &str) -> Option<Arc<dyn Dialog>> {
        find_in(&self.dialogs, id)
    }

    /// Tags of every dialog on this context's stack and its ancestors'.
    ///
    /// Ancestor tags come first (the turn's global tags at the root), then
    /// the local frames' tags most-recent-first. Duplicates are dropped.
    #[must_use]
    pub fn active_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        let mut add = |tag: &String| {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        };
        self.turn.global_tags().iter().for_each(&mut add);
        for (level, stack) in self.chain().into_iter().enumerate() {
            let dialogs = &self.dialogs[..=level];
            for frame in stack.iter() {
                if let Some(dialog) = find_in(dialogs, &frame.id) {
                    dialog.tags().iter().for_each(&mut add);
                }
            }
        }
        tags
    }

    // ---------------------------------------------------------------------
    // Scoped state
    // ---------------------------------------------------------------------

    /// Effective memory of the active frame: its own map, or the map it
    /// inherits. `None` if there is no active frame or no map yet.
    #[must_use]
    pub fn dialog_state(&self) -> Option<&Map<String, Value>> {
        let frame = self.active_dialog()?;
        if let Some(state) = &frame.state {
            return Some(state);
        }
        let chain = self.chain();
        let address = locate_state(&chain, self.level(), frame.inherits?)?;
        let stack: &DialogStack = chain.get(address.level).copied()?;
        stack.get(address.position)?.state.as_ref()
    }

    /// Mutable effective memory of the active frame, allocating the map on
    /// the resolved frame if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::InvalidArgument` if there is no active frame and
    /// `DialogError::DetachedContext` if this context's stack is gone.
    pub fn dialog_state_mut(&mut self) -> Result<&mut Map<String, Value>, DialogError> {
        let level = self.level();
        let frame = self.active_dialog().ok_or_else(|| {
            DialogError::InvalidArgument("no active dialog to hold dialog state".to_owned())
        })?;
        let shared = match (&frame.state, frame.inherits) {
            (None, Some(location)) => {
                let found = locate_state(&self.chain(), level, location);
                if found.is_none() {
                    warn!(
                        dialog_id = %frame.id,
                        ?location,
                        "inherited state location no longer resolves; frame will own its state"
                    );
                }
                found
            }
            _ => None,
        };

        let slot = match shared {
            Some(address) => {
                &mut stack_at_mut(&mut self.turn.stack, address.level)
                    .and_then(|stack| stack.get_mut(address.position))
                    .ok_or(DialogError::DetachedContext)?
                    .state
            }
            None => {
                &mut self
                    .stack_mut()?
                    .active_mut()
                    .ok_or(DialogError::DetachedContext)?
                    .state
            }
        };
        Ok(slot.get_or_insert_with(Map::new))
    }

    /// Reads the value at `path`.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::InvalidPath` for malformed paths.
    pub fn get_value(&self, path: &str) -> Result<Option<Value>, DialogError> {
        let path = StatePath::parse(path)?;
        let map = match path.scope {
            Scope::Settings => Some(self.turn.settings()),
            Scope::User => Some(&self.turn.user),
            Scope::Conversation => Some(&self.turn.conversation),
            Scope::Turn => Some(&self.turn.turn),
            Scope::Dialog => self.dialog_state(),
        };
        Ok(map.and_then(|map| path.read(map)))
    }

    /// Reads and deserializes the value at `path`.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::InvalidPath` for malformed paths and
    /// `DialogError::Serialization` if the value has the wrong shape.
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, DialogError> {
        self.get_value(path)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(DialogError::from)
    }

    /// Writes `value` at `path`.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::ReadOnlyScope` for settings paths,
    /// `DialogError::InvalidPath` for malformed paths, and the errors of
    /// [`DialogContext::dialog_state_mut`] for dialog paths.
    pub fn set_value(&mut self, path: &str, value: Value) -> Result<(), DialogError> {
        let path = StatePath::parse(path)?;
        let map = match path.scope {
            Scope::Settings => return Err(DialogError::ReadOnlyScope(path.scope.to_string())),
            Scope::User => &mut self.turn.user,
            Scope::Conversation => &mut self.turn.conversation,
            Scope::Turn => &mut self.turn.turn,
            Scope::Dialog => self.dialog_state_mut()?,
        };
        path.write(map, value)
    }

    /// Removes and returns the value at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`DialogContext::set_value`].
    pub fn delete_value(&mut self, path: &str) -> Result<Option<Value>, DialogError> {
        let path = StatePath::parse(path)?;
        let map = match path.scope {
            Scope::Settings => return Err(DialogError::ReadOnlyScope(path.scope.to_string())),
            Scope::User => &mut self.turn.user,
            Scope::Conversation => &mut self.turn.conversation,
            Scope::Turn => &mut self.turn.turn,
            Scope::Dialog => {
                if self.active_dialog().is_none() {
                    return Ok(None);
                }
                self.dialog_state_mut()?
            }
        };
        path.remove(map)
    }

    // ---------------------------------------------------------------------
    // Stack operations
    // ---------------------------------------------------------------------

    /// Pushes `dialog_id` onto this context's stack and begins it.
    ///
    /// The id and the input bindings are checked before the frame is
    /// pushed. If seeding the new frame or the dialog's own begin hook fails,
    /// the stack is truncated back to its previous depth before the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::EmptyDialogId`, `DialogError::DialogNotFound`
    /// if no set in the chain has the id, `DialogError::InvalidArgument` if
    /// an input binding does not target a dialog property, and whatever the
    /// dialog's `begin_dialog` returns.
    pub async fn begin_dialog(
        &mut self,
        dialog_id: &str,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        let prepared = self.prepare_begin(dialog_id)?;
        self.push_and_begin(dialog_id, prepared, options).await
    }

    /// Resolves `dialog_id` and reads its input bindings without touching
    /// the stack.
    fn prepare_begin(&self, dialog_id: &str) -> Result<PreparedBegin, DialogError> {
        if dialog_id.is_empty() {
            return Err(DialogError::EmptyDialogId);
        }
        let dialog = self
            .find_dialog(dialog_id)
            .ok_or_else(|| DialogError::DialogNotFound {
                id: dialog_id.to_owned(),
            })?;

        let mut bindings = Vec::with_capacity(dialog.input_bindings().len());
        for binding in dialog.input_bindings() {
            if !StatePath::parse(&binding.target)?.is_explicit_dialog_property() {
                return Err(DialogError::InvalidArgument(format!(
                    "input binding target '{}' is not a dialog property",
                    binding.target
                )));
            }
            if let Some(value) = self.get_value(&binding.source)? {
                bindings.push((binding.target.clone(), value));
            }
        }
        Ok(PreparedBegin { dialog, bindings })
    }

    async fn push_and_begin(
        &mut self,
        dialog_id: &str,
        prepared: PreparedBegin,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        let PreparedBegin { dialog, bindings } = prepared;
        let is_command = dialog.kind() == DialogKind::Command;
        let frame = match is_command.then(|| self.inherited_location()).flatten() {
            Some(location) => DialogFrame::inheriting(dialog_id, location),
            None => DialogFrame::owning(dialog_id),
        };
        let level = self.level();
        let depth = {
            let stack = self.stack_mut()?;
            let depth = stack.len();
            stack.push(frame);
            depth
        };
        debug!(dialog_id, depth = depth + 1, level, "pushed dialog frame");

        if let Err(err) = self.seed_frame(bindings, options.as_ref(), is_command) {
            self.truncate_stack(depth);
            return Err(err);
        }
        let result = dialog.begin_dialog(self, options).await;
        if result.is_err() {
            self.truncate_stack(depth);
        }
        result
    }

    /// Writes input bindings and options into the frame just pushed.
    fn seed_frame(
        &mut self,
        bindings: Vec<(String, Value)>,
        options: Option<&Value>,
        is_command: bool,
    ) -> Result<(), DialogError> {
        for (target, value) in bindings {
            self.set_value(&target, value)?;
        }
        if let Some(options) = options {
            let path = if is_command { STEP_OPTIONS } else { DIALOG_OPTIONS };
            self.set_value(path, options.clone())?;
        }
        Ok(())
    }

    /// Drops frames above `depth` left behind by a failed begin.
    fn truncate_stack(&mut self, depth: usize) {
        let Ok(stack) = self.stack_mut() else {
            return;
        };
        if stack.len() > depth {
            let removed = stack.len() - depth;
            stack.truncate(depth);
            warn!(depth, removed, "rolled back dialog frames after a failed begin");
        }
    }

    /// Where a command frame pushed now would find shared memory: the frame
    /// just below it, or the hosting container when this stack is empty.
    fn inherited_location(&self) -> Option<StateLocation> {
        let depth = self.stack_depth();
        if depth > 0 {
            return Some(StateLocation::Local(depth - 1));
        }
        let parent_level = self.level().checked_sub(1)?;
        let parent_depth = stack_at(&self.turn.stack, parent_level).map_or(0, DialogStack::len);
        parent_depth.checked_sub(1).map(StateLocation::Parent)
    }

    /// Continues the active dialog with the current turn.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::UnregisteredDialog` if the active frame's
    /// dialog is not registered, and whatever the dialog returns.
    pub async fn continue_dialog(&mut self) -> Result<DialogTurnResult, DialogError> {
        let Some(id) = self.active_dialog_id() else {
            return Ok(DialogTurnResult::empty());
        };
        let dialog = self
            .find_dialog(&id)
            .ok_or(DialogError::UnregisteredDialog {
                id,
                operation: "continue",
            })?;
        dialog.continue_dialog(self).await
    }

    /// Ends the active dialog with `result` and resumes the one below it.
    ///
    /// Returns `Completed` carrying `result` when this context's stack is
    /// left empty, and `Empty` if nothing was running.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::UnregisteredDialog` if the dialog to resume is
    /// not registered, and whatever the resumed dialog returns.
    pub async fn end_dialog(
        &mut self,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        if self.stack_depth() == 0 {
            return Ok(DialogTurnResult::empty());
        }

        self.end_active_dialog(DialogReason::EndCalled, result.clone())
            .await?;

        let Some(id) = self.active_dialog_id() else {
            debug!(level = self.level(), "dialog stack completed");
            return Ok(DialogTurnResult::completed(result));
        };
        let dialog = self
            .find_dialog(&id)
            .ok_or_else(|| DialogError::UnregisteredDialog {
                id: id.clone(),
                operation: "resume",
            })?;
        debug!(dialog_id = %id, "resuming dialog");
        dialog
            .resume_dialog(self, DialogReason::EndCalled, result)
            .await
    }

    /// Pops the active dialog without notifying it and begins `dialog_id`
    /// in its place, leaving the stack depth unchanged.
    ///
    /// The replacement is validated before anything is popped. If beginning
    /// it fails, the popped frame is put back.
    ///
    /// # Errors
    ///
    /// Same as [`DialogContext::begin_dialog`].
    pub async fn replace_dialog(
        &mut self,
        dialog_id: &str,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        let prepared = self.prepare_begin(dialog_id)?;
        self.set_value(TURN_REPEAT_DIALOG_ID, Value::from(dialog_id))?;

        let replaced = self.stack_mut()?.pop();
        let remaining = self.stack_depth();
        if let Some(frame) = &replaced {
            debug!(replaced = %frame.id, replacement = dialog_id, "replacing dialog");
        }

        let result = self.push_and_begin(dialog_id, prepared, options).await;
        if let (Err(_), Some(frame)) = (&result, replaced) {
            self.truncate_stack(remaining);
            if let Ok(stack) = self.stack_mut()
                && stack.len() == remaining
            {
                stack.push(frame);
            }
        }
        result
    }

    /// Cancels dialogs from this context outward.
    ///
    /// The innermost frame is always popped. Before every later pop, in
    /// this context or any ancestor, `event_name` is offered to the frame
    /// about to go as a non-bubbling event; if it is handled, cancellation
    /// stops there. Returns `Empty` when no stack in the chain had frames.
    ///
    /// # Errors
    ///
    /// Propagates failures from event handlers and end notifications.
    pub async fn cancel_all_dialogs(
        &mut self,
        event_name: &str,
        event_value: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        if self.chain().iter().all(|stack| stack.is_empty()) {
            return Ok(DialogTurnResult::empty());
        }

        let mut level = Some(self.level());
        let mut notify = false;
        while let Some(current) = level {
            if stack_at(&self.turn.stack, current).is_some_and(|stack| !stack.is_empty()) {
                let mut view = self.at_level(current);
                if notify
                    && view
                        .emit_event(event_name, event_value.clone(), false, false)
                        .await?
                {
                    debug!(
                        level = current,
                        event = event_name,
                        "cancellation intercepted"
                    );
                    break;
                }
                view.end_active_dialog(DialogReason::CancelCalled, None)
                    .await?;
            } else {
                level = current.checked_sub(1);
            }
            notify = true;
        }

        Ok(DialogTurnResult::cancelled())
    }

    /// Ends every frame on this context's stack, innermost first, without
    /// touching ancestors.
    ///
    /// # Errors
    ///
    /// Propagates failures from end notifications.
    pub async fn end_local_dialogs(&mut self, reason: DialogReason) -> Result<(), DialogError> {
        while self.stack_depth() > 0 {
            self.end_active_dialog(reason, None).await?;
        }
        Ok(())
    }

    /// Asks the active dialog to re-prompt.
    ///
    /// A non-bubbling `repromptDialog` event is offered first; only if no
    /// dialog handles it is the active dialog's `reprompt_dialog` called.
    /// Returns `Empty` if nothing was running, `Waiting` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::UnregisteredDialog` if the active dialog is not
    /// registered, and whatever the dialog returns.
    pub async fn reprompt_dialog(&mut self) -> Result<DialogTurnResult, DialogError> {
        if self.emit_event(REPROMPT_DIALOG, None, false, false).await? {
            return Ok(DialogTurnResult::waiting());
        }
        let Some(id) = self.active_dialog_id() else {
            return Ok(DialogTurnResult::empty());
        };
        let dialog = self
            .find_dialog(&id)
            .ok_or(DialogError::UnregisteredDialog {
                id,
                operation: "reprompt",
            })?;
        dialog.reprompt_dialog(self).await?;
        Ok(DialogTurnResult::waiting())
    }

    /// Offers an event to the active dialog and returns whether it was
    /// handled.
    ///
    /// With `from_leaf`, the event starts at the innermost running child
    /// context. `bubble` is carried on the event; re-emitting it outward is
    /// left to the receiving dialog.
    ///
    /// # Errors
    ///
    /// Propagates failures from event handlers.
    pub async fn emit_event(
        &mut self,
        name: &str,
        value: Option<Value>,
        bubble: bool,
        from_leaf: bool,
    ) -> Result<bool, DialogError> {
        let event = DialogEvent {
            name: name.to_owned(),
            value,
            bubble,
        };

        if from_leaf {
            let dialogs = self.leaf_dialogs();
            if dialogs.len() > self.dialogs.len() {
                return self.view(dialogs).dispatch_event(&event).await;
            }
        }
        self.dispatch_event(&event).await
    }

    async fn dispatch_event(&mut self, event: &DialogEvent) -> Result<bool, DialogError> {
        let Some(id) = self.active_dialog_id() else {
            return Ok(false);
        };
        let Some(dialog) = self.find_dialog(&id) else {
            warn!(dialog_id = %id, event = %event.name, "active dialog is not registered");
            return Ok(false);
        };
        debug!(dialog_id = %id, event = %event.name, level = self.level(), "dispatching event");
        dialog.on_dialog_event(self, event).await
    }

    /// Notifies the active dialog, pops it, and applies its output binding.
    async fn end_active_dialog(
        &mut self,
        reason: DialogReason,
        result: Option<Value>,
    ) -> Result<(), DialogError> {
        let Some(id) = self.active_dialog_id() else {
            return Ok(());
        };
        let dialog = self.find_dialog(&id);
        match &dialog {
            Some(dialog) => dialog.end_dialog(self, reason).await?,
            None => warn!(dialog_id = %id, "ending a dialog that is not registered"),
        }

        self.stack_mut()?.pop();
        debug!(dialog_id = %id, ?reason, depth = self.stack_depth(), "popped dialog frame");

        let binding = dialog.as_ref().and_then(|d| d.output_binding());
        if let (Some(binding), Some(result)) = (binding, result) {
            let path = StatePath::parse(binding)?;
            if path.scope != Scope::Dialog || self.active_dialog().is_some() {
                self.set_value(binding, result)?;
            }
        }
        Ok(())
    }
}

fn find_in(dialogs: &[Arc<DialogSet>], id: &str) -> Option<Arc<dyn Dialog>> {
    dialogs.iter().rev().find_map(|set| set.find(id))
}

fn stack_at(root: &DialogStack, level: usize) -> Option<&DialogStack> {
    let mut stack = root;
    for _ in 0..level {
        stack = &stack.active()?.children;
    }
    Some(stack)
}

fn stack_at_mut(root: &mut DialogStack, level: usize) -> Option<&mut DialogStack> {
    let mut stack = root;
    for _ in 0..level {
        stack = &mut stack.active_mut()?.children;
    }
    Some(stack)
}
