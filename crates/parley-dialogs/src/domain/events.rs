//! Dialog events.
//!
//! The engine itself offers `repromptDialog` before re-prompting and the
//! caller-chosen cancellation event while cancelling; turn handling offers
//! `activityReceived` for every inbound activity. Dialogs may emit events
//! under any other name.

use serde_json::Value;

/// Offered to the stack before the active dialog re-prompts.
pub const REPROMPT_DIALOG: &str = "repromptDialog";
/// Default event offered to each frame above the innermost while
/// cancelling.
pub const CANCEL_DIALOG: &str = "cancelDialog";
/// Offered from the leaf for each inbound activity before the stack is
/// continued.
pub const ACTIVITY_RECEIVED: &str = "activityReceived";

/// A named occurrence offered to the active dialogs.
///
/// Constructed per emission and never persisted. `bubble` only travels with
/// the event: re-emitting it to the parent context on a miss is up to the
/// receiving dialog's handler.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogEvent {
    /// Event name.
    pub name: String,
    /// Opaque payload.
    pub value: Option<Value>,
    /// Whether an unhandled event may propagate outward.
    pub bubble: bool,
}
