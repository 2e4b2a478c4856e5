//! Authenticated HTTP client for the MISPA REST API
//!
//! Wraps reqwest::Client with bearer token injection and status checking.

use anyhow::{bail, Context, Result};

use crate::auth::TokenStore;
use crate::config::Config;

/// Authenticated client bound to the configured server.
pub struct MispaClient {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl MispaClient {
    /// Load config and build the client. Fails when no usable token is stored.
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config
            .get_token()
            .context("No token stored. Run 'mispa-cli login' first.")?;
        if token.is_expired() {
            bail!("Stored token expired. Run 'mispa-cli login'.");
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base: config.server_url(),
            token: token.token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// GET request with bearer auth.
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        check_response(resp, &url).await
    }

    /// POST request with a JSON body and bearer auth.
    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        check_response(resp, &url).await
    }

    /// POST request with an empty body and bearer auth.
    pub async fn post_empty(&self, path: &str) -> Result<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        check_response(resp, &url).await
    }

    /// POST request with a multipart form (uploads) and bearer auth.
    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!("POST (multipart) {}", url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        check_response(resp, &url).await
    }

    /// Bearer token currently in use (needed for the realtime handshake).
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Server base URL, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base
    }
}

/// Check HTTP response status code and return a clear error on failure.
///
/// 401 is the server telling us the token died; the web client force-logs-out
/// here, the CLI points at `login` instead.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        bail!(
            "401 Unauthorized for {}. Token is invalid or expired -- run 'mispa-cli login'.",
            url
        );
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("HTTP {} for {}: {}", status.as_u16(), url, body);
    }
    Ok(resp)
}
