//! Activity builders bound to a fixed test conversation.

use parley_core::activity::Activity;
use serde_json::Value;

/// Conversation id used by the builders below.
pub const TEST_CONVERSATION_ID: &str = "test-conversation";

/// A message activity in the test conversation.
#[must_use]
pub fn message(text: &str) -> Activity {
    Activity::message(TEST_CONVERSATION_ID, text)
}

/// An event activity in the test conversation.
#[must_use]
pub fn event(name: &str, value: Option<Value>) -> Activity {
    Activity::event(TEST_CONVERSATION_ID, name, value)
}
