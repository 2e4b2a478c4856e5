//! API client module for the MISPA server

mod chat;
pub mod client;
mod files;
mod me;
mod theme;
mod translate;
mod users;

pub use chat::{get_messages_data, send_message_data, HistoryMessage};
pub use files::{
    format_file_size, send_voice_message_data, upload_files_data,
};
pub use me::{validate_token, whoami_data, TokenValidation};
pub use theme::update_theme_data;
pub use users::{add_contact_data, search_users_data, AddContactResult};

use anyhow::Result;

/// Read message history from a chat
pub async fn read_messages(chat_id: i64) -> Result<()> {
    chat::read_messages(chat_id).await
}

/// Send a message over REST
pub async fn send_message(chat_id: i64, content: &str) -> Result<()> {
    chat::send_message(chat_id, content).await
}

/// Search users by name or email
pub async fn search_users(query: &str) -> Result<()> {
    users::search_users(query).await
}

/// Add a user to the contact list
pub async fn add_contact(user_id: i64) -> Result<()> {
    users::add_contact(user_id).await
}

/// Upload files to a chat
pub async fn upload_files(chat_id: i64, paths: Vec<std::path::PathBuf>) -> Result<()> {
    files::upload_files(chat_id, paths).await
}

/// Send a voice message from a recorded audio file
pub async fn send_voice_message(chat_id: i64, audio_path: std::path::PathBuf) -> Result<()> {
    files::send_voice_message(chat_id, audio_path).await
}

/// Set and sync the theme preference
pub async fn set_theme(theme: String) -> Result<()> {
    theme::set_theme(theme).await
}

/// Show the current theme preference
pub async fn show_theme() -> Result<()> {
    theme::show_theme().await
}

/// Translate text to a target language
pub async fn translate(text: &str, target_language: &str) -> Result<()> {
    translate::translate(text, target_language).await
}

/// List supported translation languages
pub async fn list_languages() -> Result<()> {
    translate::list_languages().await
}

/// Show current user info
pub async fn whoami() -> Result<()> {
    me::whoami().await
}
