//! Realtime channel event payloads.
//!
//! Events travel inside socket.io `5:::` frames as `{"name": ..., "args": [payload]}`.
//! Outbound events are built here; inbound events are parsed from the frame's
//! first argument.

use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

/// Events the client emits on the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    /// Typing-state transition for the active chat.
    Typing { chat_id: i64, is_typing: bool },
    /// A chat message send, carrying the correlation id for reconciliation.
    SendMessage {
        chat_id: i64,
        content: String,
        client_id: Uuid,
    },
}

impl OutboundEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::Typing { .. } => "typing",
            OutboundEvent::SendMessage { .. } => "send_message",
        }
    }

    /// JSON payload placed in `args[0]`.
    pub fn payload(&self) -> Value {
        match self {
            OutboundEvent::Typing { chat_id, is_typing } => json!({
                "chat_id": chat_id,
                "is_typing": is_typing,
            }),
            OutboundEvent::SendMessage {
                chat_id,
                content,
                client_id,
            } => json!({
                "chat_id": chat_id,
                "content": content,
                "type": "text",
                "client_id": client_id.to_string(),
            }),
        }
    }
}

/// Payload of an inbound `new_message` event.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
    pub id: i64,
    #[serde(default)]
    pub chat_id: Option<i64>,
    pub sender_id: i64,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Correlation id echoed back for our own sends, absent for peers'.
    #[serde(default)]
    pub client_id: Option<String>,
}

impl NewMessage {
    /// Parsed correlation id, if the server echoed one back.
    pub fn correlation(&self) -> Option<Uuid> {
        self.client_id.as_deref().and_then(|s| Uuid::parse_str(s).ok())
    }
}

/// Payload of an inbound `typing_status` event.
#[derive(Debug, Clone, Deserialize)]
pub struct TypingStatus {
    #[serde(default)]
    pub chat_id: Option<i64>,
    pub user_id: i64,
    pub is_typing: bool,
}

/// Payload of an inbound `user_status` event.
#[derive(Debug, Clone, Deserialize)]
pub struct UserStatus {
    pub user_id: i64,
    pub online: bool,
}

/// Events the server pushes to the client.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    NewMessage(NewMessage),
    TypingStatus(TypingStatus),
    UserStatus(UserStatus),
}

impl InboundEvent {
    /// Parse an inbound event from its wire name and first argument.
    ///
    /// Returns `None` for unknown event names or malformed payloads; the
    /// realtime loop logs and drops those.
    pub fn parse(name: &str, payload: &Value) -> Option<Self> {
        match name {
            "new_message" => serde_json::from_value(payload.clone())
                .ok()
                .map(InboundEvent::NewMessage),
            "typing_status" => serde_json::from_value(payload.clone())
                .ok()
                .map(InboundEvent::TypingStatus),
            "user_status" => serde_json::from_value(payload.clone())
                .ok()
                .map(InboundEvent::UserStatus),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_message_payload_carries_correlation_id() {
        let client_id = Uuid::new_v4();
        let event = OutboundEvent::SendMessage {
            chat_id: 7,
            content: "hello".to_string(),
            client_id,
        };

        assert_eq!(event.name(), "send_message");
        let payload = event.payload();
        assert_eq!(payload["chat_id"], 7);
        assert_eq!(payload["content"], "hello");
        assert_eq!(payload["type"], "text");
        assert_eq!(payload["client_id"], client_id.to_string());
    }

    #[test]
    fn typing_payload_shape() {
        let event = OutboundEvent::Typing {
            chat_id: 3,
            is_typing: true,
        };
        assert_eq!(event.name(), "typing");
        assert_eq!(event.payload(), json!({"chat_id": 3, "is_typing": true}));
    }

    #[test]
    fn parse_new_message_with_correlation() {
        let client_id = Uuid::new_v4();
        let payload = json!({
            "id": 42,
            "chat_id": 7,
            "sender_id": 1,
            "content": "hi",
            "client_id": client_id.to_string(),
        });

        let event = InboundEvent::parse("new_message", &payload).unwrap();
        match event {
            InboundEvent::NewMessage(msg) => {
                assert_eq!(msg.id, 42);
                assert_eq!(msg.correlation(), Some(client_id));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn parse_unknown_event_is_none() {
        assert!(InboundEvent::parse("message_read", &json!({})).is_none());
    }
}
