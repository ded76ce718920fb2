//! Database models for account links.

use crate::types::{AccountLinkId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for linking two user records
#[derive(Debug, Clone)]
pub struct AccountLinkCreateDBRequest {
    pub primary_user_id: UserId,
    pub linked_user_id: UserId,
    pub link_type: String,
}

/// Database response for an account link
#[derive(Debug, Clone, FromRow)]
pub struct AccountLinkDBResponse {
    pub id: AccountLinkId,
    pub primary_user_id: UserId,
    pub linked_user_id: UserId,
    pub link_type: String,
    pub created_at: DateTime<Utc>,
}
