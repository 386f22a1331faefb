//! Turn handler.
//!
//! Orchestrates one turn: load the conversation's snapshots, run the dialog
//! stack, stamp the replies, and persist the snapshots again.

use std::sync::Arc;

use parley_core::activity::Activity;
use parley_core::clock::Clock;
use parley_core::error::DialogError;
use parley_core::repository::StateStore;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::context::DialogContext;
use crate::domain::dialog::{DialogTurnResult, DialogTurnStatus};
use crate::domain::events::ACTIVITY_RECEIVED;
use crate::domain::registry::DialogSet;
use crate::domain::turn::TurnState;

/// What one turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Status of the root stack after the turn.
    pub status: DialogTurnStatus,
    /// Result of the root dialog, when it completed.
    pub result: Option<Value>,
    /// Replies to deliver, in the order they were sent.
    pub replies: Vec<Activity>,
}

/// Offers the activity to the running dialogs, then continues the stack or
/// begins the root dialog when nothing is running.
///
/// A dialog that handles `activityReceived` consumes the turn: the stack is
/// not continued and the root dialog is not restarted even if the handler
/// emptied the stack.
async fn run_stack(
    dc: &mut DialogContext<'_>,
    root_dialog_id: &str,
    activity_value: Value,
) -> Result<DialogTurnResult, DialogError> {
    if dc.stack_depth() > 0
        && dc
            .emit_event(ACTIVITY_RECEIVED, Some(activity_value), true, true)
            .await?
    {
        debug!("activity consumed by an event handler");
        return Ok(if dc.stack_depth() > 0 {
            DialogTurnResult::waiting()
        } else {
            DialogTurnResult::cancelled()
        });
    }

    let result = dc.continue_dialog().await?;
    if result.status != DialogTurnStatus::Empty {
        return Ok(result);
    }
    info!(root_dialog_id, "starting root dialog");
    dc.begin_dialog(root_dialog_id, None).await
}

/// Runs one turn for `activity`.
///
/// The activity is offered to the running dialogs as `activityReceived`,
/// then the active dialog is continued; if nothing was running,
/// `root_dialog_id` is begun instead. State is saved only after the dialogs
/// ran without error, so a failed turn leaves the stored snapshots untouched.
///
/// # Errors
///
/// Returns `DialogError::Infrastructure` if the store fails, and any error
/// raised while running the dialogs.
#[instrument(
    skip_all,
    fields(
        conversation_id = %activity.conversation_id,
        correlation_id = %Uuid::new_v4()
    )
)]
pub async fn handle_turn(
    activity: Activity,
    dialogs: &Arc<DialogSet>,
    root_dialog_id: &str,
    store: &dyn StateStore,
    settings: &Arc<Map<String, Value>>,
    clock: &dyn Clock,
) -> Result<TurnOutcome, DialogError> {
    let conversation_id = activity.conversation_id.clone();
    let stored = store.load(&conversation_id).await?.unwrap_or_default();
    let activity_value = serde_json::to_value(&activity)?;
    let mut turn = TurnState::new(activity, stored, Arc::clone(settings))?;

    let result = {
        let mut dc = DialogContext::new(Arc::clone(dialogs), &mut turn);
        run_stack(&mut dc, root_dialog_id, activity_value).await?
    };

    let now = clock.now();
    let replies: Vec<Activity> = turn
        .take_replies()
        .into_iter()
        .map(|mut reply| {
            reply.timestamp = Some(now);
            reply
        })
        .collect();

    let snapshot = turn.into_stored_state()?;
    store.save(&conversation_id, &snapshot).await?;

    info!(status = ?result.status, replies = replies.len(), "turn handled");

    Ok(TurnOutcome {
        status: result.status,
        result: result.result,
        replies,
    })
}
