//! Theme preference sync

use anyhow::Result;
use serde_json::json;

use super::client::MispaClient;
use crate::config::Config;

/// Push the theme preference to the server. The response body carries no
/// contract; only the status code matters.
pub async fn update_theme_data(client: &MispaClient, theme: &str) -> Result<()> {
    client
        .post_json("/api/update_theme", &json!({ "theme": theme }))
        .await?;
    Ok(())
}

/// Set the theme: persist locally, then sync to the server best-effort.
///
/// The local preference always wins; a failed sync is logged, not fatal
/// (same as the web client's fire-and-forget update).
pub async fn set_theme(theme: String) -> Result<()> {
    let mut config = Config::load()?;
    config.set_theme(theme.clone());
    config.save()?;

    match MispaClient::from_config(&config) {
        Ok(client) => {
            if let Err(e) = update_theme_data(&client, &theme).await {
                tracing::warn!("Theme sync failed: {:#}", e);
            }
        }
        Err(e) => {
            tracing::debug!("Theme not synced (not logged in): {:#}", e);
        }
    }

    println!("Theme set to '{}'.", theme);
    Ok(())
}

/// Show the current theme preference.
pub async fn show_theme() -> Result<()> {
    let config = Config::load()?;
    match config.get_theme() {
        Some(theme) => println!("{}", theme),
        None => println!("default"),
    }
    Ok(())
}
