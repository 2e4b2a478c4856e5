//! Authentication for the MISPA server
//!
//! The server issues bearer tokens at registration/login time in the web UI;
//! the CLI only consumes one. `login` validates a pasted token against
//! `POST /api/validate_token` and stores it alongside the returned identity.

pub mod tokens;

pub use tokens::{StoredToken, TokenStore};

use anyhow::{bail, Context, Result};

use crate::api;
use crate::config::Config;

/// Validate and store a bearer token.
pub async fn login(token: String, server_url: Option<String>) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = server_url {
        config.server_url = Some(url);
    }

    let validation = api::validate_token(&config.server_url(), &token)
        .await
        .context("Token validation request failed")?;

    match validation.user {
        Some(user) if validation.valid => {
            config.set_token(token, None);
            config.set_user(user.clone());
            config.save()?;
            println!("Logged in as {} <{}>.", user.username, user.email);
            Ok(())
        }
        _ => bail!("Token rejected by server. Obtain a fresh token and retry."),
    }
}

/// Clear the stored token and all cached session state.
pub async fn logout() -> Result<()> {
    let mut config = Config::load()?;
    config.clear_session();
    config.save()?;
    println!("Logged out.");
    Ok(())
}

/// Display current authentication status.
pub async fn status() -> Result<()> {
    let config = Config::load()?;

    println!("Server:      {}", config.server_url());

    match config.get_token() {
        Some(token) if !token.is_expired() => println!("Token:       present"),
        Some(_) => println!("Token:       expired"),
        None => println!("Token:       none"),
    }

    match config.get_user() {
        Some(user) => println!("User:        {} <{}>", user.username, user.email),
        None => println!("User:        unknown"),
    }

    match config.get_theme() {
        Some(theme) => println!("Theme:       {}", theme),
        None => println!("Theme:       default"),
    }

    Ok(())
}
