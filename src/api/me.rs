//! Token validation and current-user info

use anyhow::{Context, Result};
use serde::Deserialize;

use super::client::MispaClient;
use crate::models::User;

/// Response of `POST /api/validate_token`.
#[derive(Debug, Deserialize)]
pub struct TokenValidation {
    pub valid: bool,
    pub user: Option<User>,
}

/// Validate a raw token against the server (used by `login`, before any
/// token is stored).
pub async fn validate_token(server_url: &str, token: &str) -> Result<TokenValidation> {
    let url = format!("{}/api/validate_token", server_url);
    tracing::debug!("POST {}", url);

    let resp = reqwest::Client::new()
        .post(&url)
        .bearer_auth(token)
        .send()
        .await
        .with_context(|| format!("POST {} failed", url))?;

    resp.json()
        .await
        .context("Failed to parse validate_token response")
}

/// Re-validate the stored token and return the identity it maps to.
pub async fn whoami_data(client: &MispaClient) -> Result<User> {
    let validation = validate_token(client.base_url(), client.token()).await?;
    match validation.user {
        Some(user) if validation.valid => Ok(user),
        _ => anyhow::bail!("Stored token is no longer valid. Run 'mispa-cli login'."),
    }
}

/// Show current user info (prints to stdout).
pub async fn whoami() -> Result<()> {
    let client = MispaClient::new()?;
    let user = whoami_data(&client).await?;

    println!("User:  {}", user.username);
    println!("Email: {}", user.email);
    println!("ID:    {}", user.id);

    Ok(())
}
