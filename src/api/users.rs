//! User search and contact management

use anyhow::{Context, Result};
use serde::Deserialize;

use super::client::MispaClient;
use crate::models::UserSearchResult;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    users: Vec<UserSearchResult>,
}

/// Response of `POST /api/add_contact/{id}`.
#[derive(Debug, Deserialize)]
pub struct AddContactResult {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Search users by name or email fragment.
pub async fn search_users_data(client: &MispaClient, query: &str) -> Result<Vec<UserSearchResult>> {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    let path = format!("/api/search_users?q={}", encoded);

    let resp = client.get(&path).await?;
    let body: SearchResponse = resp
        .json()
        .await
        .context("Failed to parse search_users response")?;

    Ok(body.users)
}

/// Search users (prints to stdout).
pub async fn search_users(query: &str) -> Result<()> {
    let client = MispaClient::new()?;
    let users = search_users_data(&client, query).await?;

    if users.is_empty() {
        println!("No users found for '{}'.", query);
        return Ok(());
    }

    for user in &users {
        let marker = if user.is_contact { " [contact]" } else { "" };
        println!("{:>6}  {} <{}>{}", user.id, user.username, user.email, marker);
    }

    Ok(())
}

/// Add a user to the contact list.
pub async fn add_contact_data(client: &MispaClient, user_id: i64) -> Result<AddContactResult> {
    let path = format!("/api/add_contact/{}", user_id);

    let resp = client.post_empty(&path).await?;
    resp.json()
        .await
        .context("Failed to parse add_contact response")
}

/// Add a contact (prints to stdout).
pub async fn add_contact(user_id: i64) -> Result<()> {
    let client = MispaClient::new()?;
    let result = add_contact_data(&client, user_id).await?;

    if result.success {
        println!("Contact added.");
    } else {
        anyhow::bail!(
            "Could not add contact: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}
