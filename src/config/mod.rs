//! Configuration and credential storage

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::auth::{StoredToken, TokenStore};
use crate::models::User;

/// Default server URL when none is configured.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Application configuration
///
/// The `token` and `theme` keys mirror what the web client keeps in browser
/// storage; the CLI holds them in one TOML file instead.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the MISPA server
    pub server_url: Option<String>,
    /// Stored bearer token (from `mispa-cli login`)
    pub token: Option<StoredToken>,
    /// Theme preference ("dark", "light", ...)
    pub theme: Option<String>,
    /// Identity cached from the last successful token validation
    pub user: Option<User>,
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "mispa-cli", "mispa-cli")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir).context("Failed to create config directory")?;

        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains the token)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    /// Server base URL, without trailing slash.
    pub fn server_url(&self) -> String {
        self.server_url
            .as_deref()
            .unwrap_or(DEFAULT_SERVER_URL)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn get_theme(&self) -> Option<String> {
        self.theme.clone()
    }

    pub fn set_theme(&mut self, theme: String) {
        self.theme = Some(theme);
    }

    pub fn get_user(&self) -> Option<User> {
        self.user.clone()
    }

    pub fn set_user(&mut self, user: User) {
        self.user = Some(user);
    }

    /// Clear everything tied to the authenticated session.
    pub fn clear_session(&mut self) {
        self.token = None;
        self.user = None;
        self.theme = None;
    }
}

impl TokenStore for Config {
    fn get_token(&self) -> Option<StoredToken> {
        self.token.clone()
    }

    fn set_token(&mut self, token: String, expires_in: Option<u64>) {
        self.token = Some(StoredToken::new(token, expires_in));
    }

    fn clear_token(&mut self) {
        self.token = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_url_strips_trailing_slash() {
        let config = Config {
            server_url: Some("http://chat.example.org/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.server_url(), "http://chat.example.org");
    }

    #[test]
    fn clear_session_leaves_no_residual_state() {
        let mut config = Config::default();
        config.set_token("tok".to_string(), None);
        config.set_user(User {
            id: 1,
            username: "ada".to_string(),
            email: "ada@example.org".to_string(),
        });
        config.set_theme("dark".to_string());

        config.clear_session();

        assert!(config.get_token().is_none());
        assert!(config.get_user().is_none());
        assert!(config.get_theme().is_none());
    }
}
