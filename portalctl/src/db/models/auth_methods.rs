//! Database models for auth methods and the bindings between users and auth methods.

use crate::types::{AuthMethodId, UserAuthMethodId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Seeded name of the email/password method
pub const PASSWORD_METHOD: &str = "password";
/// Seeded name of the guest method
pub const ANONYMOUS_METHOD: &str = "anonymous";

/// A row of the seeded `auth_methods` table
#[derive(Debug, Clone, FromRow)]
pub struct AuthMethodDBResponse {
    pub id: AuthMethodId,
    pub name: String,
    pub display_name: String,
    pub is_active: bool,
    pub priority: i32,
}

/// Database request for binding a user to an auth method
#[derive(Debug, Clone)]
pub struct UserAuthMethodCreateDBRequest {
    pub user_id: UserId,
    pub auth_method_id: AuthMethodId,
    /// Identity assigned by the provider; unique per auth method
    pub provider_id: String,
    pub provider_data: serde_json::Value,
    pub is_primary: bool,
}

/// Database response for a user's auth method binding
#[derive(Debug, Clone, FromRow)]
pub struct UserAuthMethodDBResponse {
    pub id: UserAuthMethodId,
    pub user_id: UserId,
    pub auth_method_id: AuthMethodId,
    pub provider_id: String,
    pub provider_data: serde_json::Value,
    pub is_primary: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserAuthMethodDBResponse {
    /// The stored password hash, when this is a password binding
    pub fn password_hash(&self) -> Option<String> {
        serde_json::from_value::<PasswordProviderData>(self.provider_data.clone())
            .ok()
            .map(|data| data.password_hash)
    }
}

/// A binding joined with the descriptor of its auth method
#[derive(Debug, Clone, FromRow)]
pub struct BoundAuthMethod {
    pub id: UserAuthMethodId,
    pub name: String,
    pub display_name: String,
    pub is_primary: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// `provider_data` payload of a password binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordProviderData {
    pub password_hash: String,
}

impl PasswordProviderData {
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({ "password_hash": self.password_hash })
    }
}
