//! Async backend: bridges the TUI event loop with the REST API.
//!
//! Uses an mpsc channel pair. The TUI sends `BackendCommand` values, and a
//! background tokio task executes them and sends `BackendResponse` values back.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::api;
use crate::api::client::MispaClient;
use crate::models::UserSearchResult;

/// Commands sent from the TUI event loop to the async backend.
pub enum BackendCommand {
    SearchUsers { query: String },
    AddContact { user_id: i64 },
    LoadHistory { chat_id: i64 },
    SetTheme { theme: String },
}

/// Responses from the async backend to the TUI.
pub enum BackendResponse {
    /// Carries the query it answers, so the UI can drop results that arrive
    /// after the query has changed.
    SearchResults {
        query: String,
        result: Result<Vec<UserSearchResult>>,
    },
    ContactAdded {
        user_id: i64,
        result: Result<()>,
    },
    History {
        chat_id: i64,
        result: Result<Vec<api::HistoryMessage>>,
    },
    ThemeSet {
        theme: String,
        result: Result<()>,
    },
    /// Initial client creation failed (auth issue).
    ClientError(String),
}

/// Handle for interacting with the backend from the TUI side.
pub struct Backend {
    cmd_tx: mpsc::UnboundedSender<BackendCommand>,
    resp_rx: mpsc::UnboundedReceiver<BackendResponse>,
}

impl Backend {
    /// Start the backend. Spawns a tokio task that processes commands.
    pub fn start() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();

        tokio::spawn(backend_loop(cmd_rx, resp_tx));

        Self { cmd_tx, resp_rx }
    }

    /// A cloneable command sender, so app state can issue commands while the
    /// receive side sits in the event loop's `select!`.
    pub fn sender(&self) -> mpsc::UnboundedSender<BackendCommand> {
        self.cmd_tx.clone()
    }

    /// Receive a response from the backend.
    ///
    /// Suspends until a response is available. Returns `None` only when the
    /// backend channel is permanently closed. Designed for `tokio::select!`.
    pub async fn recv(&mut self) -> Option<BackendResponse> {
        self.resp_rx.recv().await
    }
}

/// Background loop that processes commands.
///
/// Creates a MispaClient once and reuses it across all API calls. If client
/// creation fails, sends a ClientError response and exits.
async fn backend_loop(
    mut cmd_rx: mpsc::UnboundedReceiver<BackendCommand>,
    resp_tx: mpsc::UnboundedSender<BackendResponse>,
) {
    let client = match MispaClient::new() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            let _ = resp_tx.send(BackendResponse::ClientError(format!("{:#}", e)));
            return;
        }
    };

    while let Some(cmd) = cmd_rx.recv().await {
        let client = Arc::clone(&client);
        let resp_tx = resp_tx.clone();

        // Spawn each command as a separate task so we don't block the loop.
        tokio::spawn(async move {
            match cmd {
                BackendCommand::SearchUsers { query } => {
                    let result = api::search_users_data(&client, &query).await;
                    let _ = resp_tx.send(BackendResponse::SearchResults { query, result });
                }
                BackendCommand::AddContact { user_id } => {
                    let result = add_contact(&client, user_id).await;
                    let _ = resp_tx.send(BackendResponse::ContactAdded { user_id, result });
                }
                BackendCommand::LoadHistory { chat_id } => {
                    let result = api::get_messages_data(&client, chat_id).await;
                    let _ = resp_tx.send(BackendResponse::History { chat_id, result });
                }
                BackendCommand::SetTheme { theme } => {
                    let result = api::update_theme_data(&client, &theme).await;
                    let _ = resp_tx.send(BackendResponse::ThemeSet { theme, result });
                }
            }
        });
    }
}

/// Add a contact, turning a `{success: false, error}` body into an Err so the
/// UI surfaces the server's own message.
async fn add_contact(client: &MispaClient, user_id: i64) -> Result<()> {
    let result = api::add_contact_data(client, user_id).await?;
    if result.success {
        Ok(())
    } else {
        anyhow::bail!(
            "{}",
            result
                .error
                .unwrap_or_else(|| "Could not add contact".to_string())
        )
    }
}
