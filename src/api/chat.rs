//! Message history and one-shot REST sends
//!
//! Realtime sends go through the socket channel (see `realtime`/`session`);
//! these endpoints back the non-interactive `history` and `send` subcommands.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

use super::client::MispaClient;

/// A message row from `GET /get_messages/{chat_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryMessage {
    pub id: i64,
    pub sender_id: i64,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<HistoryMessage>,
}

/// Fetch message history for a chat.
pub async fn get_messages_data(client: &MispaClient, chat_id: i64) -> Result<Vec<HistoryMessage>> {
    let path = format!("/get_messages/{}", chat_id);

    let resp = client.get(&path).await?;
    let body: MessagesResponse = resp
        .json()
        .await
        .context("Failed to parse get_messages response")?;

    Ok(body.messages)
}

/// Read message history (prints to stdout).
pub async fn read_messages(chat_id: i64) -> Result<()> {
    let client = MispaClient::new()?;
    let msgs = get_messages_data(&client, chat_id).await?;

    if msgs.is_empty() {
        println!("(no messages)");
        return Ok(());
    }

    for msg in &msgs {
        let time = msg.timestamp.as_deref().unwrap_or("");
        println!("[{}] {}: {}", time, msg.sender_id, msg.content);
    }

    Ok(())
}

/// Send a text message over REST (one-shot, no realtime connection needed).
pub async fn send_message_data(client: &MispaClient, chat_id: i64, content: &str) -> Result<()> {
    let body = json!({
        "chat_id": chat_id,
        "content": content,
        "type": "text",
    });

    client.post_json("/send_message", &body).await?;
    Ok(())
}

/// Send a message (prints to stdout).
pub async fn send_message(chat_id: i64, content: &str) -> Result<()> {
    let client = MispaClient::new()?;
    send_message_data(&client, chat_id, content).await?;
    println!("Message sent.");
    Ok(())
}
