//! OpenAPI document for the portal's HTTP API, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::api::{
    handlers::{auth, health},
    models::{
        auth::{LoginRequest, MeResponse, RegisterRequest, SessionIssuedResponse, SuccessResponse},
        users::{AuthMethodResponse, LinkedAccountResponse, SessionResponse, UserResponse},
    },
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Portal authentication API",
        description = "Session-based authentication for the SDK testing portal. Sessions are carried in the `auth_token` HTTP-only cookie."
    ),
    paths(
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        auth::anonymous_sign_in,
        health::healthz,
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        SuccessResponse,
        SessionIssuedResponse,
        MeResponse,
        UserResponse,
        AuthMethodResponse,
        SessionResponse,
        LinkedAccountResponse,
    )),
    tags(
        (name = "auth", description = "Registration, login and session identity"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_auth_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/register",
            "/api/auth/login",
            "/api/auth/logout",
            "/api/auth/me",
            "/api/auth/anonymous",
            "/healthz",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
