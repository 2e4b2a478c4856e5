//! Realtime chat session state
//!
//! `SessionClient` is the session context for one connected user: the active
//! chat, the typing debounce, the optimistically rendered message list, and
//! the peer/contact state fed by inbound events. It owns no I/O — outbound
//! events go into an injected channel sender (the realtime task's queue in
//! the TUI, a plain channel in tests), and time is passed in explicitly so
//! the debounce can be driven from any event loop.
//!
//! Everything here runs on one task; state transitions are sequential.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::{
    ChatMessage, ContactStatus, Delivery, InboundEvent, MessageId, NewMessage, OutboundEvent,
    TypingStatus, User, UserStatus,
};

/// Quiet interval after the last keystroke before typing-stop is emitted.
pub const TYPING_DEBOUNCE: Duration = Duration::from_millis(1000);

pub struct SessionClient {
    user: User,
    active_chat: Option<i64>,
    /// Whether we have emitted typing-start for the current burst.
    typing: bool,
    /// Deadline for the pending typing-stop, armed by every keystroke.
    typing_deadline: Option<Instant>,
    messages: Vec<ChatMessage>,
    peer_typing: bool,
    contacts: HashMap<i64, ContactStatus>,
    outbound: mpsc::UnboundedSender<OutboundEvent>,
}

impl SessionClient {
    pub fn new(user: User, outbound: mpsc::UnboundedSender<OutboundEvent>) -> Self {
        Self {
            user,
            active_chat: None,
            typing: false,
            typing_deadline: None,
            messages: Vec::new(),
            peer_typing: false,
            contacts: HashMap::new(),
            outbound,
        }
    }

    pub fn current_user(&self) -> &User {
        &self.user
    }

    pub fn active_chat(&self) -> Option<i64> {
        self.active_chat
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn peer_typing(&self) -> bool {
        self.peer_typing
    }

    pub fn contact_status(&self, user_id: i64) -> Option<ContactStatus> {
        self.contacts.get(&user_id).copied()
    }

    fn emit(&self, event: OutboundEvent) {
        // Send failure means the realtime task is gone; the message list
        // already shows the optimistic state, matching the no-retry contract.
        if self.outbound.send(event).is_err() {
            tracing::warn!("Realtime channel closed -- event dropped");
        }
    }

    /// Switch the active chat.
    ///
    /// Resets typing to not-typing and cancels the pending debounce so no
    /// stale stop event can fire against the previous chat. The message list
    /// is replaced by the new chat's (initially empty) view.
    pub fn set_active_chat(&mut self, chat_id: Option<i64>) {
        if self.active_chat == chat_id {
            return;
        }
        self.active_chat = chat_id;
        self.typing = false;
        self.typing_deadline = None;
        self.peer_typing = false;
        self.messages.clear();
    }

    /// Load history into the message list (e.g. after opening a chat).
    pub fn load_history(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
    }

    /// Record a keystroke in the compose box.
    ///
    /// The first keystroke of a burst emits typing-start; every keystroke
    /// re-arms the stop deadline. Without an active chat this is a no-op.
    pub fn input_changed(&mut self, now: Instant) {
        let Some(chat_id) = self.active_chat else {
            return;
        };

        if !self.typing {
            self.typing = true;
            self.emit(OutboundEvent::Typing {
                chat_id,
                is_typing: true,
            });
        }

        self.typing_deadline = Some(now + TYPING_DEBOUNCE);
    }

    /// Drive the debounce timer; call once per event-loop tick.
    ///
    /// Emits typing-stop when the quiet interval has elapsed since the last
    /// keystroke. At most one stop fires per burst.
    pub fn poll(&mut self, now: Instant) {
        let Some(deadline) = self.typing_deadline else {
            return;
        };
        if now < deadline {
            return;
        }

        self.typing_deadline = None;
        if self.typing {
            self.typing = false;
            if let Some(chat_id) = self.active_chat {
                self.emit(OutboundEvent::Typing {
                    chat_id,
                    is_typing: false,
                });
            }
        }
    }

    /// Send a chat message with an optimistic local echo.
    ///
    /// Empty (after trimming) content or no active chat: nothing is rendered
    /// and nothing is emitted. Otherwise exactly one echo is appended
    /// synchronously and one `send_message` event is emitted, tagged with a
    /// fresh correlation id for reconciliation. Returns the echoed message.
    pub fn send_message(&mut self, content: &str, now: DateTime<Utc>) -> Option<ChatMessage> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        let chat_id = self.active_chat?;

        let client_id = Uuid::new_v4();
        let echo = ChatMessage {
            id: MessageId::Local(client_id),
            sender_id: self.user.id,
            content: content.to_string(),
            timestamp: now,
            delivery: Delivery::Pending,
            attachment: None,
        };
        self.messages.push(echo.clone());

        self.emit(OutboundEvent::SendMessage {
            chat_id,
            content: content.to_string(),
            client_id,
        });

        Some(echo)
    }

    /// Apply an inbound realtime event to the session.
    pub fn handle_event(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::NewMessage(msg) => self.handle_new_message(msg),
            InboundEvent::TypingStatus(status) => self.handle_typing_status(status),
            InboundEvent::UserStatus(status) => self.handle_user_status(status),
        }
    }

    /// Render an inbound message.
    ///
    /// A confirmation carrying the correlation id of a pending echo upgrades
    /// that echo in place -- the one reconciliation rule that prevents our own
    /// sends from rendering twice. Everything else appends in arrival order,
    /// with no reordering and no dedup by server id.
    fn handle_new_message(&mut self, msg: NewMessage) {
        if let Some(chat_id) = msg.chat_id {
            if self.active_chat != Some(chat_id) {
                tracing::debug!("Dropping message for inactive chat {}", chat_id);
                return;
            }
        }

        if let Some(correlation) = msg.correlation() {
            if let Some(echo) = self
                .messages
                .iter_mut()
                .find(|m| m.matches_correlation(correlation))
            {
                echo.id = MessageId::Server(msg.id);
                echo.delivery = Delivery::Confirmed;
                if let Some(ts) = parse_timestamp(msg.timestamp.as_deref()) {
                    echo.timestamp = ts;
                }
                return;
            }
        }

        let delivery = if msg.sender_id == self.user.id {
            // Our own send from another device, or a replay we can't match.
            Delivery::Confirmed
        } else {
            Delivery::Received
        };

        self.messages.push(ChatMessage {
            id: MessageId::Server(msg.id),
            sender_id: msg.sender_id,
            content: msg.content,
            timestamp: parse_timestamp(msg.timestamp.as_deref()).unwrap_or_else(Utc::now),
            delivery,
            attachment: None,
        });
    }

    fn handle_typing_status(&mut self, status: TypingStatus) {
        if status.user_id == self.user.id {
            return;
        }
        match (status.chat_id, self.active_chat) {
            // Chat-scoped status for another chat: ignore.
            (Some(chat), Some(active)) if chat != active => {}
            (_, Some(_)) => self.peer_typing = status.is_typing,
            (_, None) => {}
        }
    }

    fn handle_user_status(&mut self, status: UserStatus) {
        let state = if status.online {
            ContactStatus::Online
        } else {
            ContactStatus::Offline
        };
        self.contacts.insert(status.user_id, state);
    }

    /// Drop all session state (logout path). Cancels any pending debounce.
    pub fn clear(&mut self) {
        self.active_chat = None;
        self.typing = false;
        self.typing_deadline = None;
        self.peer_typing = false;
        self.messages.clear();
        self.contacts.clear();
    }
}

fn parse_timestamp(ts: Option<&str>) -> Option<DateTime<Utc>> {
    ts.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_user() -> User {
        User {
            id: 1,
            username: "ada".to_string(),
            email: "ada@example.org".to_string(),
        }
    }

    fn session() -> (SessionClient, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SessionClient::new(test_user(), tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<OutboundEvent>) -> Vec<OutboundEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn new_message(id: i64, sender_id: i64, content: &str) -> InboundEvent {
        InboundEvent::parse(
            "new_message",
            &json!({"id": id, "sender_id": sender_id, "content": content}),
        )
        .unwrap()
    }

    #[test]
    fn burst_emits_single_typing_start() {
        let (mut session, mut rx) = session();
        session.set_active_chat(Some(7));

        let t0 = Instant::now();
        session.input_changed(t0);
        session.input_changed(t0 + Duration::from_millis(100));
        session.input_changed(t0 + Duration::from_millis(200));

        assert_eq!(
            drain(&mut rx),
            vec![OutboundEvent::Typing {
                chat_id: 7,
                is_typing: true
            }]
        );
    }

    #[test]
    fn typing_stop_fires_after_quiet_interval() {
        let (mut session, mut rx) = session();
        session.set_active_chat(Some(7));

        let t0 = Instant::now();
        session.input_changed(t0);
        drain(&mut rx);

        // Not yet quiet for 1000ms.
        session.poll(t0 + Duration::from_millis(999));
        assert!(drain(&mut rx).is_empty());

        session.poll(t0 + Duration::from_millis(1000));
        assert_eq!(
            drain(&mut rx),
            vec![OutboundEvent::Typing {
                chat_id: 7,
                is_typing: false
            }]
        );

        // Exactly one stop per burst.
        session.poll(t0 + Duration::from_millis(2000));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn keystrokes_extend_the_stop_deadline() {
        let (mut session, mut rx) = session();
        session.set_active_chat(Some(7));

        let t0 = Instant::now();
        session.input_changed(t0);
        session.input_changed(t0 + Duration::from_millis(800));
        drain(&mut rx);

        // 1000ms after the first keystroke, but only 200ms after the last.
        session.poll(t0 + Duration::from_millis(1000));
        assert!(drain(&mut rx).is_empty());

        session.poll(t0 + Duration::from_millis(1800));
        assert_eq!(
            drain(&mut rx),
            vec![OutboundEvent::Typing {
                chat_id: 7,
                is_typing: false
            }]
        );
    }

    #[test]
    fn new_burst_after_stop_emits_start_again() {
        let (mut session, mut rx) = session();
        session.set_active_chat(Some(7));

        let t0 = Instant::now();
        session.input_changed(t0);
        session.poll(t0 + Duration::from_millis(1000));
        drain(&mut rx);

        session.input_changed(t0 + Duration::from_millis(5000));
        assert_eq!(
            drain(&mut rx),
            vec![OutboundEvent::Typing {
                chat_id: 7,
                is_typing: true
            }]
        );
    }

    #[test]
    fn input_without_active_chat_emits_nothing() {
        let (mut session, mut rx) = session();

        session.input_changed(Instant::now());

        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn switching_chat_cancels_pending_debounce() {
        let (mut session, mut rx) = session();
        session.set_active_chat(Some(7));

        let t0 = Instant::now();
        session.input_changed(t0);
        drain(&mut rx);

        session.set_active_chat(Some(8));

        // The old chat's stop must not fire after the switch.
        session.poll(t0 + Duration::from_millis(5000));
        assert!(drain(&mut rx).is_empty());

        // A keystroke in the new chat starts a fresh burst there.
        session.input_changed(t0 + Duration::from_millis(6000));
        assert_eq!(
            drain(&mut rx),
            vec![OutboundEvent::Typing {
                chat_id: 8,
                is_typing: true
            }]
        );
    }

    #[test]
    fn send_empty_message_is_a_noop() {
        let (mut session, mut rx) = session();
        session.set_active_chat(Some(7));

        assert!(session.send_message("", Utc::now()).is_none());
        assert!(session.send_message("   \n", Utc::now()).is_none());
        assert!(session.messages().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn send_without_active_chat_is_a_noop() {
        let (mut session, mut rx) = session();

        assert!(session.send_message("hello", Utc::now()).is_none());
        assert!(session.messages().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn send_renders_one_echo_and_emits_one_event() {
        let (mut session, mut rx) = session();
        session.set_active_chat(Some(7));

        let echo = session.send_message("hello", Utc::now()).unwrap();

        assert_eq!(session.messages().len(), 1);
        assert_eq!(echo.sender_id, 1);
        assert_eq!(echo.content, "hello");
        assert_eq!(echo.delivery, Delivery::Pending);

        let MessageId::Local(client_id) = echo.id else {
            panic!("echo should carry a provisional id");
        };
        assert_eq!(
            drain(&mut rx),
            vec![OutboundEvent::SendMessage {
                chat_id: 7,
                content: "hello".to_string(),
                client_id,
            }]
        );
    }

    #[test]
    fn confirmation_upgrades_echo_without_duplicate() {
        let (mut session, _rx) = session();
        session.set_active_chat(Some(7));

        let echo = session.send_message("hello", Utc::now()).unwrap();
        let MessageId::Local(client_id) = echo.id else {
            panic!("echo should carry a provisional id");
        };

        let confirmation = InboundEvent::parse(
            "new_message",
            &json!({
                "id": 42,
                "chat_id": 7,
                "sender_id": 1,
                "content": "hello",
                "client_id": client_id.to_string(),
            }),
        )
        .unwrap();
        session.handle_event(confirmation);

        assert_eq!(session.messages().len(), 1);
        let msg = &session.messages()[0];
        assert_eq!(msg.id, MessageId::Server(42));
        assert_eq!(msg.delivery, Delivery::Confirmed);
    }

    #[test]
    fn inbound_messages_append_in_arrival_order() {
        let (mut session, _rx) = session();
        session.set_active_chat(Some(7));

        session.handle_event(new_message(10, 2, "first"));
        session.handle_event(new_message(9, 2, "second"));

        let contents: Vec<&str> = session
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert!(session
            .messages()
            .iter()
            .all(|m| m.delivery == Delivery::Received));
    }

    #[test]
    fn unmatched_correlation_appends_as_confirmed_own_message() {
        let (mut session, _rx) = session();
        session.set_active_chat(Some(7));

        // Our own message arriving without a matching echo (other device).
        session.handle_event(new_message(11, 1, "from elsewhere"));

        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].delivery, Delivery::Confirmed);
    }

    #[test]
    fn messages_for_other_chats_are_dropped() {
        let (mut session, _rx) = session();
        session.set_active_chat(Some(7));

        let foreign = InboundEvent::parse(
            "new_message",
            &json!({"id": 5, "chat_id": 8, "sender_id": 2, "content": "elsewhere"}),
        )
        .unwrap();
        session.handle_event(foreign);

        assert!(session.messages().is_empty());
    }

    #[test]
    fn peer_typing_follows_typing_status() {
        let (mut session, _rx) = session();
        session.set_active_chat(Some(7));

        let start = InboundEvent::parse(
            "typing_status",
            &json!({"user_id": 2, "is_typing": true}),
        )
        .unwrap();
        session.handle_event(start);
        assert!(session.peer_typing());

        let stop = InboundEvent::parse(
            "typing_status",
            &json!({"user_id": 2, "is_typing": false}),
        )
        .unwrap();
        session.handle_event(stop);
        assert!(!session.peer_typing());
    }

    #[test]
    fn typing_status_for_other_chat_is_ignored() {
        let (mut session, _rx) = session();
        session.set_active_chat(Some(7));

        let other = InboundEvent::parse(
            "typing_status",
            &json!({"chat_id": 8, "user_id": 2, "is_typing": true}),
        )
        .unwrap();
        session.handle_event(other);

        assert!(!session.peer_typing());
    }

    #[test]
    fn user_status_is_tracked() {
        let (mut session, _rx) = session();

        let online = InboundEvent::parse("user_status", &json!({"user_id": 2, "online": true}))
            .unwrap();
        session.handle_event(online);
        assert_eq!(session.contact_status(2), Some(ContactStatus::Online));

        let offline = InboundEvent::parse("user_status", &json!({"user_id": 2, "online": false}))
            .unwrap();
        session.handle_event(offline);
        assert_eq!(session.contact_status(2), Some(ContactStatus::Offline));
    }

    #[test]
    fn clear_leaves_no_residual_state() {
        let (mut session, mut rx) = session();
        session.set_active_chat(Some(7));

        let t0 = Instant::now();
        session.input_changed(t0);
        session.send_message("hello", Utc::now());
        drain(&mut rx);

        session.clear();

        assert!(session.active_chat().is_none());
        assert!(session.messages().is_empty());
        assert!(!session.peer_typing());

        // A pending debounce must not fire after clearing.
        session.poll(t0 + Duration::from_millis(5000));
        assert!(drain(&mut rx).is_empty());
    }
}
