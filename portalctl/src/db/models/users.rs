//! Database models for users.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_anonymous: bool,
}

impl UserCreateDBRequest {
    /// A registered (non-anonymous) user
    pub fn registered(email: String, username: Option<String>, display_name: Option<String>) -> Self {
        Self {
            email: Some(email),
            username,
            display_name,
            avatar_url: None,
            is_anonymous: false,
        }
    }

    /// A guest user with no email or username
    pub fn anonymous(display_name: String) -> Self {
        Self {
            email: None,
            username: None,
            display_name: Some(display_name),
            avatar_url: None,
            is_anonymous: true,
        }
    }
}

/// Database response for a user
#[derive(Debug, Clone, FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}
