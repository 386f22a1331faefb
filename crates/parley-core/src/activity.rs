//! Turn transport values.
//!
//! An `Activity` is the channel-neutral shape of one inbound or outbound
//! exchange. Channel adapters translate their wire payloads into this type
//! before a turn runs; the engine never sees channel formats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of exchange an activity represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    /// A user or bot utterance.
    Message,
    /// A named, programmatic event.
    Event,
    /// Members joined or left the conversation.
    ConversationUpdate,
}

/// One inbound or outbound exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// The kind of exchange.
    pub kind: ActivityKind,
    /// Conversation this activity belongs to.
    pub conversation_id: String,
    /// Message text, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Event name, for `ActivityKind::Event`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// When the activity was produced. Outbound replies are stamped by the
    /// turn handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Activity {
    /// Creates a message activity for a conversation.
    #[must_use]
    pub fn message(conversation_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: ActivityKind::Message,
            conversation_id: conversation_id.into(),
            text: Some(text.into()),
            name: None,
            value: None,
            timestamp: None,
        }
    }

    /// Creates a named event activity for a conversation.
    #[must_use]
    pub fn event(
        conversation_id: impl Into<String>,
        name: impl Into<String>,
        value: Option<serde_json::Value>,
    ) -> Self {
        Self {
            kind: ActivityKind::Event,
            conversation_id: conversation_id.into(),
            text: None,
            name: Some(name.into()),
            value,
            timestamp: None,
        }
    }

    /// Creates an outbound reply in the same conversation as `self`.
    #[must_use]
    pub fn reply(&self, text: impl Into<String>) -> Self {
        Self::message(self.conversation_id.clone(), text)
    }

    /// Returns `true` for message activities.
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.kind == ActivityKind::Message
    }

    /// Message text, or an empty string when there is none.
    #[must_use]
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_keeps_conversation_id() {
        let inbound = Activity::message("conv-1", "hello");

        let reply = inbound.reply("hi there");

        assert_eq!(reply.conversation_id, "conv-1");
        assert_eq!(reply.text.as_deref(), Some("hi there"));
        assert!(reply.is_message());
    }

    #[test]
    fn test_serializes_with_camel_case_and_skips_empty_fields() {
        let activity = Activity::event("conv-1", "ping", None);

        let json = serde_json::to_value(&activity).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "kind": "event",
                "conversationId": "conv-1",
                "name": "ping"
            })
        );
    }
}
