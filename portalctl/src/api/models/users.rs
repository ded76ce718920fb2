use crate::db::models::{
    account_links::AccountLinkDBResponse, auth_methods::BoundAuthMethod, sessions::SessionDBResponse, users::UserDBResponse,
};
use crate::types::{AccountLinkId, SessionId, UserAuthMethodId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Public view of a user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
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

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            username: db.username,
            display_name: db.display_name,
            avatar_url: db.avatar_url,
            is_verified: db.is_verified,
            is_anonymous: db.is_anonymous,
            created_at: db.created_at,
            updated_at: db.updated_at,
            last_login_at: db.last_login_at,
        }
    }
}

/// An auth method bound to the user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthMethodResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserAuthMethodId,
    /// Method name, e.g. `password` or `anonymous`
    pub name: String,
    pub display_name: String,
    pub is_primary: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<BoundAuthMethod> for AuthMethodResponse {
    fn from(db: BoundAuthMethod) -> Self {
        Self {
            id: db.id,
            name: db.name,
            display_name: db.display_name,
            is_primary: db.is_primary,
            last_used_at: db.last_used_at,
            created_at: db.created_at,
        }
    }
}

/// Metadata of the current session. The token itself is never echoed back here.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SessionId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl From<SessionDBResponse> for SessionResponse {
    fn from(db: SessionDBResponse) -> Self {
        Self {
            id: db.id,
            expires_at: db.expires_at,
            created_at: db.created_at,
            ip_address: db.ip_address,
            user_agent: db.user_agent,
        }
    }
}

/// A user record linked to the current user's account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkedAccountResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AccountLinkId,
    #[schema(value_type = String, format = "uuid")]
    pub linked_user_id: UserId,
    pub link_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<AccountLinkDBResponse> for LinkedAccountResponse {
    fn from(db: AccountLinkDBResponse) -> Self {
        Self {
            id: db.id,
            linked_user_id: db.linked_user_id,
            link_type: db.link_type,
            created_at: db.created_at,
        }
    }
}
