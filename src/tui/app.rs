//! TUI application state and main event loop

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time;

use crate::api;
use crate::config::Config;
use crate::models::{Attachment, ChatMessage, Delivery, InboundEvent, MessageId, User};
use crate::realtime::{self, RealtimeUpdate};
use crate::session::SessionClient;

use super::backend::{Backend, BackendCommand, BackendResponse};
use super::compose::ComposeState;
use super::messages::MessagesState;
use super::notify::NotifyState;
use super::sidebar::SidebarState;
use super::ui;

/// Target frame rate for UI updates (~30 fps)
const FRAME_DURATION_MS: u64 = 33;

/// Active pane in the TUI
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    #[default]
    Sidebar,
    Messages,
    Compose,
}

impl Pane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pane::Sidebar => "contacts",
            Pane::Messages => "messages",
            Pane::Compose => "compose",
        }
    }

    fn next(&self) -> Self {
        match self {
            Pane::Sidebar => Pane::Messages,
            Pane::Messages => Pane::Compose,
            Pane::Compose => Pane::Sidebar,
        }
    }
}

/// Application state
pub struct App {
    pub should_exit: bool,
    /// Unrecoverable failure to report after terminal restore.
    pub fatal: Option<String>,
    /// Realtime connection state (for the status bar).
    pub connected: bool,
    pub theme: String,
    pub active_pane: Pane,
    pub session: SessionClient,
    pub sidebar: SidebarState,
    pub messages: MessagesState,
    pub compose: ComposeState,
    pub notify: NotifyState,
    backend_tx: mpsc::UnboundedSender<BackendCommand>,
}

impl App {
    fn new(
        session: SessionClient,
        theme: String,
        backend_tx: mpsc::UnboundedSender<BackendCommand>,
    ) -> Self {
        Self {
            should_exit: false,
            fatal: None,
            connected: false,
            theme,
            active_pane: Pane::default(),
            session,
            sidebar: SidebarState::default(),
            messages: MessagesState::default(),
            compose: ComposeState::default(),
            notify: NotifyState::default(),
            backend_tx,
        }
    }

    fn send_command(&self, cmd: BackendCommand) {
        if self.backend_tx.send(cmd).is_err() {
            tracing::error!("Backend channel closed -- command dropped");
        }
    }

    /// Display name for the active chat's peer.
    pub fn peer_name(&self) -> String {
        let Some(chat_id) = self.session.active_chat() else {
            return "(no chat)".to_string();
        };
        self.sidebar
            .contacts
            .iter()
            .find(|c| c.user_id == chat_id)
            .map(|c| c.username.clone())
            .unwrap_or_else(|| format!("user {}", chat_id))
    }

    pub fn render(&self, frame: &mut ratatui::Frame) {
        ui::render(frame, self);
    }

    /// Per-frame housekeeping: debounce timer and notification expiry.
    fn tick(&mut self) {
        let now = Instant::now();
        self.session.poll(now);
        self.notify.expire(now);
    }

    // -----------------------------------------------------------------------
    // Realtime updates
    // -----------------------------------------------------------------------

    fn handle_realtime(&mut self, update: RealtimeUpdate) {
        let now = Instant::now();
        match update {
            RealtimeUpdate::Connected => {
                self.connected = true;
                self.notify.success("Connected", now);
            }
            RealtimeUpdate::Disconnected => {
                self.connected = false;
                self.notify.error("Connection lost, reconnecting...", now);
            }
            RealtimeUpdate::AuthError(msg) => {
                self.fatal = Some(msg);
                self.should_exit = true;
            }
            RealtimeUpdate::Event(event) => self.handle_inbound(event),
        }
    }

    fn handle_inbound(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::NewMessage(msg) => {
                // DM chats are keyed by the peer's user id.
                let chat = msg.chat_id.unwrap_or(msg.sender_id);
                if self.session.active_chat() == Some(chat) {
                    self.session.handle_event(InboundEvent::NewMessage(msg));
                    self.messages.reset();
                } else if msg.sender_id != self.session.current_user().id {
                    self.sidebar.mark_unread(msg.sender_id);
                }
            }
            InboundEvent::UserStatus(status) => {
                let state = if status.online {
                    crate::models::ContactStatus::Online
                } else {
                    crate::models::ContactStatus::Offline
                };
                self.sidebar.set_presence(status.user_id, state);
                self.session.handle_event(InboundEvent::UserStatus(status));
            }
            event @ InboundEvent::TypingStatus(_) => self.session.handle_event(event),
        }
    }

    // -----------------------------------------------------------------------
    // Backend responses
    // -----------------------------------------------------------------------

    fn handle_backend(&mut self, resp: BackendResponse) {
        let now = Instant::now();
        match resp {
            BackendResponse::SearchResults { query, result } => {
                // A slow response for an earlier query must not clobber the
                // results of the one the user is looking at now.
                let current = self.sidebar.search.as_ref().map(|s| s.query.as_str());
                if current != Some(query.as_str()) {
                    tracing::debug!(%query, "Dropping stale search results");
                } else {
                    match result {
                        Ok(results) => self.sidebar.set_results(results),
                        Err(e) => self.notify.error(format!("Search failed: {:#}", e), now),
                    }
                }
            }
            BackendResponse::ContactAdded { user_id, result } => match result {
                Ok(()) => {
                    if let Some(user) = self
                        .sidebar
                        .search
                        .as_mut()
                        .and_then(|s| s.results.iter_mut().find(|u| u.id == user_id))
                    {
                        user.is_contact = true;
                        let (name, online) = (user.username.clone(), user.is_online);
                        self.sidebar.upsert_contact(user_id, &name, online);
                    }
                    self.notify.success("Contact added", now);
                }
                Err(e) => self.notify.error(format!("{:#}", e), now),
            },
            BackendResponse::History { chat_id, result } => match result {
                Ok(history) => {
                    if self.session.active_chat() == Some(chat_id) {
                        let messages = history.into_iter().map(history_to_message).collect();
                        self.session.load_history(messages);
                        self.messages.reset();
                    }
                }
                Err(e) => {
                    self.notify
                        .error(format!("Could not load messages: {:#}", e), now);
                }
            },
            BackendResponse::ThemeSet { theme, result } => match result {
                Ok(()) => self.notify.info(format!("Theme synced: {}", theme), now),
                Err(e) => {
                    // The local preference sticks; only the sync failed.
                    self.notify.error(format!("Theme sync failed: {:#}", e), now);
                }
            },
            BackendResponse::ClientError(msg) => {
                self.fatal = Some(msg);
                self.should_exit = true;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Terminal input
    // -----------------------------------------------------------------------

    fn handle_terminal_event(&mut self, event: Event) {
        let Event::Key(key) = event else { return };
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_exit = true;
            return;
        }

        if self.sidebar.in_search() && self.active_pane == Pane::Sidebar {
            self.handle_search_key(key);
            return;
        }

        if key.code == KeyCode::Tab {
            self.active_pane = self.active_pane.next();
            return;
        }

        match self.active_pane {
            Pane::Sidebar => self.handle_sidebar_key(key),
            Pane::Messages => self.handle_messages_key(key),
            Pane::Compose => self.handle_compose_key(key),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.sidebar.close_search(),
            KeyCode::Up => self.sidebar.move_up(),
            KeyCode::Down => self.sidebar.move_down(),
            KeyCode::Enter => {
                if let Some(user) = self.sidebar.selected_result().cloned() {
                    if user.is_contact {
                        self.sidebar
                            .upsert_contact(user.id, &user.username, user.is_online);
                        self.sidebar.close_search();
                        self.open_chat(user.id);
                    } else {
                        self.send_command(BackendCommand::AddContact { user_id: user.id });
                    }
                }
            }
            KeyCode::Backspace => {
                if let Some(search) = self.sidebar.search.as_mut() {
                    search.query.pop();
                    self.refresh_search();
                }
            }
            KeyCode::Char(c) => {
                if let Some(search) = self.sidebar.search.as_mut() {
                    search.query.push(c);
                    self.refresh_search();
                }
            }
            _ => {}
        }
    }

    /// Re-run the search for the current query. The server wants at least two
    /// characters; shorter queries just clear the results.
    fn refresh_search(&mut self) {
        if let Some(search) = self.sidebar.search.as_mut() {
            if search.query.chars().count() >= 2 {
                search.pending = true;
                let query = search.query.clone();
                self.send_command(BackendCommand::SearchUsers { query });
            } else {
                search.results.clear();
                search.selected = 0;
                search.pending = false;
            }
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Char('/') => self.sidebar.open_search(),
            KeyCode::Char('t') => self.toggle_theme(),
            KeyCode::Up | KeyCode::Char('k') => self.sidebar.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.sidebar.move_down(),
            KeyCode::Enter => {
                if let Some(contact) = self.sidebar.selected_contact() {
                    let user_id = contact.user_id;
                    self.open_chat(user_id);
                }
            }
            _ => {}
        }
    }

    /// Switch the session to a chat and fetch its history.
    fn open_chat(&mut self, user_id: i64) {
        self.session.set_active_chat(Some(user_id));
        self.sidebar.mark_read(user_id);
        self.messages.reset();
        self.send_command(BackendCommand::LoadHistory { chat_id: user_id });
        self.active_pane = Pane::Compose;
    }

    fn toggle_theme(&mut self) {
        self.theme = if self.theme == "dark" {
            "light".to_string()
        } else {
            "dark".to_string()
        };

        // Persist locally first; the server sync is best-effort.
        match Config::load() {
            Ok(mut config) => {
                config.set_theme(self.theme.clone());
                if let Err(e) = config.save() {
                    self.notify
                        .error(format!("Could not save theme: {:#}", e), Instant::now());
                }
            }
            Err(e) => {
                self.notify
                    .error(format!("Could not save theme: {:#}", e), Instant::now());
            }
        }

        self.send_command(BackendCommand::SetTheme {
            theme: self.theme.clone(),
        });
    }

    fn handle_messages_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Char('t') => self.toggle_theme(),
            KeyCode::Up | KeyCode::Char('k') => self.messages.scroll_up(),
            KeyCode::Down | KeyCode::Char('j') => self.messages.scroll_down(),
            KeyCode::PageUp => {
                for _ in 0..10 {
                    self.messages.scroll_up();
                }
            }
            KeyCode::PageDown => {
                for _ in 0..10 {
                    self.messages.scroll_down();
                }
            }
            KeyCode::End => self.messages.reset(),
            _ => {}
        }
    }

    fn handle_compose_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.active_pane = Pane::Sidebar,
            KeyCode::Enter => {
                if let Some(text) = self.compose.take() {
                    self.session.send_message(&text, Utc::now());
                    self.messages.reset();
                }
            }
            // Deletions are input too: they keep the typing burst alive,
            // like the web client's input-event binding.
            KeyCode::Backspace => {
                self.compose.backspace();
                self.session.input_changed(Instant::now());
            }
            KeyCode::Delete => {
                self.compose.delete();
                self.session.input_changed(Instant::now());
            }
            KeyCode::Left => self.compose.move_left(),
            KeyCode::Right => self.compose.move_right(),
            KeyCode::Home => self.compose.move_home(),
            KeyCode::End => self.compose.move_end(),
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.compose.clear();
                self.session.input_changed(Instant::now());
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.compose.insert_char(c);
                self.session.input_changed(Instant::now());
            }
            _ => {}
        }
    }
}

/// Convert a history row into a rendered message.
fn history_to_message(msg: api::HistoryMessage) -> ChatMessage {
    let attachment = match msg.message_type.as_deref() {
        Some("file") | Some("image") | Some("voice") => msg.file_name.map(|name| Attachment {
            name,
            size: msg.file_size.unwrap_or(0),
        }),
        _ => None,
    };

    ChatMessage {
        id: MessageId::Server(msg.id),
        sender_id: msg.sender_id,
        content: msg.content,
        // History timestamps are short-form server-local times; render "now"
        // rather than guessing a date.
        timestamp: Utc::now(),
        delivery: Delivery::Received,
        attachment,
    }
}

/// Run the TUI application with terminal restore on exit.
pub async fn run() -> Result<()> {
    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal).await;
    ratatui::restore();
    result
}

async fn run_app(terminal: &mut DefaultTerminal) -> Result<()> {
    let config = Config::load()?;
    let user: User = config
        .get_user()
        .context("Not logged in. Run 'mispa-cli login' first.")?;
    let theme = config.get_theme().unwrap_or_else(|| "light".to_string());

    let mut realtime = realtime::spawn();
    let mut backend = Backend::start();

    let session = SessionClient::new(user, realtime.outbound.clone());
    let mut app = App::new(session, theme, backend.sender());

    let mut events = EventStream::new();
    let mut tick = time::interval(Duration::from_millis(FRAME_DURATION_MS));

    while !app.should_exit {
        terminal.draw(|frame| app.render(frame))?;

        tokio::select! {
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(event)) => app.handle_terminal_event(event),
                    Some(Err(e)) => return Err(e).context("Terminal event stream failed"),
                    None => break,
                }
            }
            update = realtime.updates.recv() => {
                match update {
                    Some(update) => app.handle_realtime(update),
                    None => break,
                }
            }
            resp = backend.recv() => {
                if let Some(resp) = resp {
                    app.handle_backend(resp);
                }
            }
            _ = tick.tick() => app.tick(),
        }
    }

    // Logout-grade teardown: no dangling timers or session state.
    app.session.clear();

    if let Some(msg) = app.fatal {
        anyhow::bail!("{}", msg);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutboundEvent, UserSearchResult};
    use crate::session::TYPING_DEBOUNCE;
    use crate::tui::notify::NotifyKind;

    fn test_app() -> (App, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (cmd_tx, _cmd_rx) = mpsc::unbounded_channel();
        let user = User {
            id: 1,
            username: "ada".to_string(),
            email: "ada@example.org".to_string(),
        };
        let app = App::new(SessionClient::new(user, out_tx), "light".to_string(), cmd_tx);
        (app, out_rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<OutboundEvent>) -> Vec<OutboundEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn history_row(id: i64, sender_id: i64, content: &str) -> api::HistoryMessage {
        api::HistoryMessage {
            id,
            sender_id,
            content: content.to_string(),
            timestamp: None,
            message_type: None,
            file_name: None,
            file_size: None,
        }
    }

    fn search_hit(id: i64, username: &str) -> UserSearchResult {
        UserSearchResult {
            id,
            username: username.to_string(),
            email: format!("{}@example.org", username),
            is_contact: false,
            is_online: true,
        }
    }

    #[test]
    fn deleting_keeps_the_typing_burst_alive() {
        let (mut app, mut rx) = test_app();
        app.session.set_active_chat(Some(7));

        let t0 = Instant::now();
        app.session.input_changed(t0);
        app.handle_compose_key(KeyEvent::from(KeyCode::Backspace));

        // The deletion re-armed the debounce, so the original deadline passes
        // with only the burst's start event emitted, no stop.
        app.session.poll(t0 + TYPING_DEBOUNCE);
        assert_eq!(
            drain(&mut rx),
            vec![OutboundEvent::Typing {
                chat_id: 7,
                is_typing: true,
            }]
        );

        // The burst still ends once input goes quiet for real.
        app.session.poll(Instant::now() + TYPING_DEBOUNCE * 2);
        assert_eq!(
            drain(&mut rx),
            vec![OutboundEvent::Typing {
                chat_id: 7,
                is_typing: false,
            }]
        );
    }

    #[test]
    fn stale_search_results_do_not_clobber_the_current_query() {
        let (mut app, _rx) = test_app();
        app.sidebar.open_search();
        app.sidebar.search.as_mut().unwrap().query = "bob".to_string();

        // A late response for a shorter, earlier query is dropped.
        app.handle_backend(BackendResponse::SearchResults {
            query: "bo".to_string(),
            result: Ok(vec![search_hit(2, "boris")]),
        });
        assert!(app.sidebar.search.as_ref().unwrap().results.is_empty());

        app.handle_backend(BackendResponse::SearchResults {
            query: "bob".to_string(),
            result: Ok(vec![search_hit(3, "bob")]),
        });
        let results = &app.sidebar.search.as_ref().unwrap().results;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].username, "bob");
    }

    #[test]
    fn failed_add_contact_surfaces_server_error_text() {
        let (mut app, _rx) = test_app();

        app.handle_backend(BackendResponse::ContactAdded {
            user_id: 9,
            result: Err(anyhow::anyhow!("Contact already added")),
        });

        assert!(app
            .notify
            .items()
            .iter()
            .any(|n| n.kind == NotifyKind::Error && n.text.contains("Contact already added")));
    }

    #[test]
    fn disconnect_surfaces_connection_error() {
        let (mut app, _rx) = test_app();
        app.connected = true;

        app.handle_realtime(RealtimeUpdate::Disconnected);

        assert!(!app.connected);
        assert!(app
            .notify
            .items()
            .iter()
            .any(|n| n.kind == NotifyKind::Error && n.text.contains("Connection lost")));
    }

    #[test]
    fn history_applies_only_to_the_active_chat() {
        let (mut app, _rx) = test_app();
        app.session.set_active_chat(Some(7));

        app.handle_backend(BackendResponse::History {
            chat_id: 8,
            result: Ok(vec![history_row(1, 8, "stale")]),
        });
        assert!(app.session.messages().is_empty());

        app.handle_backend(BackendResponse::History {
            chat_id: 7,
            result: Ok(vec![history_row(2, 7, "hello")]),
        });
        assert_eq!(app.session.messages().len(), 1);
    }

    #[test]
    fn background_chat_message_bumps_unread_badge() {
        let (mut app, _rx) = test_app();
        app.sidebar.upsert_contact(2, "bob", true);
        app.session.set_active_chat(Some(3));

        let msg = InboundEvent::parse(
            "new_message",
            &serde_json::json!({"id": 5, "sender_id": 2, "content": "psst"}),
        )
        .unwrap();
        app.handle_inbound(msg);

        assert!(app.session.messages().is_empty());
        assert_eq!(app.sidebar.contacts[0].unread, 1);
    }

    #[test]
    fn file_history_rows_become_attachments() {
        let mut row = history_row(1, 2, "");
        row.message_type = Some("file".to_string());
        row.file_name = Some("notes.pdf".to_string());
        row.file_size = Some(2048);

        let msg = history_to_message(row);
        let attachment = msg.attachment.expect("file row should carry attachment");
        assert_eq!(attachment.name, "notes.pdf");
        assert_eq!(attachment.size, 2048);
    }
}
