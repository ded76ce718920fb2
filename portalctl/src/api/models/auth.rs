use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::models::users::{AuthMethodResponse, LinkedAccountResponse, SessionResponse, UserResponse};

/// Request to register a new user.
///
/// Every field is optional at the wire level so that a missing email or password is reported as
/// a validation error rather than a body parsing error.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Email address (required, must be unique)
    pub email: Option<String>,
    /// Password (required)
    pub password: Option<String>,
    /// Username (must be unique)
    pub username: Option<String>,
    pub display_name: Option<String>,
}

/// Request to log in
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginRequest {
    /// Email address or username
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Bare success acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Body returned whenever a session is issued
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionIssuedResponse {
    pub success: bool,
    pub user: UserResponse,
    /// Bearer token, also set as the session cookie
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Identity of the caller's session
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub authenticated: bool,
    pub user: UserResponse,
    pub auth_methods: Vec<AuthMethodResponse>,
    pub session: SessionResponse,
    pub linked_accounts: Vec<LinkedAccountResponse>,
}

/// Structured response for a successful login
pub struct LoginResponse {
    pub auth_response: SessionIssuedResponse,
    pub cookie: String,
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(header::SET_COOKIE, self.cookie)], Json(self.auth_response)).into_response()
    }
}

/// Structured response for a successful anonymous sign-in
pub struct AnonymousSignInResponse {
    pub auth_response: SessionIssuedResponse,
    pub cookie: String,
}

impl IntoResponse for AnonymousSignInResponse {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, [(header::SET_COOKIE, self.cookie)], Json(self.auth_response)).into_response()
    }
}

/// Structured response for logout
pub struct LogoutResponse {
    pub cookie: String,
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(header::SET_COOKIE, self.cookie)], Json(SuccessResponse::ok())).into_response()
    }
}
