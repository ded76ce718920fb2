//! Database models for sessions.

use crate::db::models::users::UserDBResponse;
use crate::types::{SessionId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a session
#[derive(Debug, Clone)]
pub struct SessionCreateDBRequest {
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Database response for a session
#[derive(Debug, Clone, FromRow)]
pub struct SessionDBResponse {
    pub id: SessionId,
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// A live session joined with its owning user
#[derive(Debug, Clone)]
pub struct SessionWithUser {
    pub session: SessionDBResponse,
    pub user: UserDBResponse,
}
