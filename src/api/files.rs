//! File and voice-message uploads

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use super::client::MispaClient;
use crate::models::UploadedFile;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    success: bool,
    #[serde(default)]
    files: Vec<UploadedFile>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoiceResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Build a multipart file part from a path, preserving the file name.
async fn file_part(path: &Path) -> Result<reqwest::multipart::Part> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("Invalid file name")?
        .to_string();

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    Ok(reqwest::multipart::Part::bytes(bytes).file_name(name))
}

/// Upload one or more files to a chat.
pub async fn upload_files_data(
    client: &MispaClient,
    chat_id: i64,
    paths: &[std::path::PathBuf],
) -> Result<Vec<UploadedFile>> {
    let mut form = reqwest::multipart::Form::new().text("chat_id", chat_id.to_string());
    for path in paths {
        form = form.part("files[]", file_part(path).await?);
    }

    let resp = client.post_multipart("/api/upload_files", form).await?;
    let body: UploadResponse = resp
        .json()
        .await
        .context("Failed to parse upload_files response")?;

    if !body.success {
        anyhow::bail!(
            "Upload rejected: {}",
            body.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(body.files)
}

/// Upload files (prints to stdout).
pub async fn upload_files(chat_id: i64, paths: Vec<std::path::PathBuf>) -> Result<()> {
    let client = MispaClient::new()?;
    let files = upload_files_data(&client, chat_id, &paths).await?;

    for file in &files {
        println!(
            "{} ({}, {}) -> {}",
            file.name,
            file.file_type,
            format_file_size(file.size),
            file.url
        );
    }

    Ok(())
}

/// Send a recorded audio file as a voice message.
pub async fn send_voice_message_data(
    client: &MispaClient,
    chat_id: i64,
    audio_path: &Path,
) -> Result<()> {
    let form = reqwest::multipart::Form::new()
        .text("chat_id", chat_id.to_string())
        .part("audio", file_part(audio_path).await?);

    let resp = client.post_multipart("/api/send_voice_message", form).await?;
    let body: VoiceResponse = resp
        .json()
        .await
        .context("Failed to parse send_voice_message response")?;

    if !body.success {
        anyhow::bail!(
            "Voice message rejected: {}",
            body.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}

/// Send a voice message (prints to stdout).
pub async fn send_voice_message(chat_id: i64, audio_path: std::path::PathBuf) -> Result<()> {
    let client = MispaClient::new()?;
    send_voice_message_data(&client, chat_id, &audio_path).await?;
    println!("Voice message sent.");
    Ok(())
}

/// Human-readable file size, matching the web client's formatting
/// (two decimals, trailing zeros trimmed).
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let exp = (((bytes as f64).ln() / 1024_f64.ln()).floor() as usize).min(UNITS.len() - 1);
    let value = bytes as f64 / 1024_f64.powi(exp as i32);

    let mut formatted = format!("{:.2}", (value * 100.0).round() / 100.0);
    while formatted.ends_with('0') {
        formatted.pop();
    }
    if formatted.ends_with('.') {
        formatted.pop();
    }

    format!("{} {}", formatted, UNITS[exp])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bytes() {
        assert_eq!(format_file_size(0), "0 Bytes");
    }

    #[test]
    fn exact_kilobyte() {
        assert_eq!(format_file_size(1024), "1 KB");
    }

    #[test]
    fn fractional_kilobytes() {
        assert_eq!(format_file_size(1536), "1.5 KB");
    }

    #[test]
    fn small_sizes_stay_in_bytes() {
        assert_eq!(format_file_size(512), "512 Bytes");
    }

    #[test]
    fn megabytes_round_to_two_decimals() {
        // 2.25 MB
        assert_eq!(format_file_size(2 * 1024 * 1024 + 256 * 1024), "2.25 MB");
    }

    #[test]
    fn caps_at_gigabytes() {
        assert_eq!(format_file_size(1024_u64.pow(3) * 2048), "2048 GB");
    }
}
