//! User-related models

use serde::{Deserialize, Serialize};

/// Authenticated user identity, as returned by token validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// A row from `GET /api/search_users`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserSearchResult {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub is_contact: bool,
    #[serde(default)]
    pub is_online: bool,
}

/// Online/offline status of a contact, tracked from `user_status` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactStatus {
    Online,
    Offline,
}
