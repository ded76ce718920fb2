//! Route gate: the session check in front of every route.
//!
//! Each request path is classified as public, API or page. Public paths pass untouched. Every
//! other path needs a live session cookie; without one, API paths answer 401 JSON and page paths
//! are redirected to the login page. A cookie that no longer names a live session is deleted in
//! the same response.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, error, trace};

use crate::{
    AppState,
    auth::session::{AuthResult, clear_session_cookie, session_token_from_headers, validate_session},
    config::RouteGateConfig,
    errors::Error,
};

/// How the gate treats a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Reachable without a session
    Public,
    /// JSON endpoint; rejected with 401
    Api,
    /// Browser page; rejected with a redirect to the login page
    Page,
}

/// Classify a request path against the gate configuration.
pub fn classify_path(path: &str, gate: &RouteGateConfig) -> PathClass {
    if gate.public_paths.iter().any(|public| public == path)
        || gate.public_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
        || has_asset_extension(path, &gate.asset_extensions)
    {
        return PathClass::Public;
    }

    if path.starts_with(gate.api_prefix.as_str()) || path == gate.api_prefix.trim_end_matches('/') {
        PathClass::Api
    } else {
        PathClass::Page
    }
}

fn has_asset_extension(path: &str, extensions: &[String]) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => extensions.iter().any(|ext| ext.eq_ignore_ascii_case(extension)),
        _ => false,
    }
}

fn reject(class: PathClass, state: &AppState, clear_cookie: bool) -> Response {
    let mut response = match class {
        PathClass::Api => Error::Unauthenticated {
            message: Some("Authentication required".to_string()),
        }
        .into_response(),
        _ => Redirect::temporary(&state.config.auth.gate.login_path).into_response(),
    };

    if clear_cookie {
        match HeaderValue::from_str(&clear_session_cookie(&state.config)) {
            Ok(cookie) => {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            Err(e) => error!("Failed to build session clearing cookie: {}", e),
        }
    }

    response
}

/// Middleware gating every request on a live session, unless its path is public.
///
/// Valid requests are passed on unchanged; the caller's identity is not injected.
pub async fn route_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let class = classify_path(&path, &state.config.auth.gate);

    // CORS preflights never carry cookies
    if class == PathClass::Public || request.method() == Method::OPTIONS {
        trace!("Ungated request {} {}", request.method(), path);
        return next.run(request).await;
    }

    let session_config = &state.config.auth.session;
    let Some(token) = session_token_from_headers(request.headers(), &session_config.cookie_name) else {
        debug!("No session cookie for gated path {}", path);
        return reject(class, &state, false);
    };

    let outcome = match state.db.acquire().await {
        Ok(mut conn) => validate_session(&mut conn, &token, session_config).await,
        Err(e) => Err(Error::Database(e.into())),
    };

    match outcome {
        Ok(AuthResult::Valid(_)) => next.run(request).await,
        Ok(AuthResult::Invalid) => {
            debug!("Invalid session cookie for gated path {}", path);
            reject(class, &state, true)
        }
        // Pages fail closed to the login page; APIs report the failure
        Err(e) => match class {
            PathClass::Api => e.into_response(),
            _ => {
                error!("Session validation failed for {}: {:#}", path, e);
                Redirect::temporary(&state.config.auth.gate.login_path).into_response()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::session::{ClientMetadata, end_session, issue_session},
        test_utils::{create_test_app_state, create_test_user},
    };
    use axum::{Router, http::StatusCode, middleware::from_fn_with_state, routing::get};
    use axum_test::TestServer;
    use sqlx::PgPool;

    fn gate() -> RouteGateConfig {
        RouteGateConfig::default()
    }

    fn gated_server(state: AppState) -> TestServer {
        let app = Router::new()
            .route("/", get(|| async { "home" }))
            .route("/dashboard", get(|| async { "dashboard" }))
            .route("/api/protected", get(|| async { "secret" }))
            .route("/static/app.css", get(|| async { "body{}" }))
            .layer(from_fn_with_state(state.clone(), route_gate))
            .with_state(state);
        TestServer::new(app).unwrap()
    }

    #[test]
    fn test_public_paths() {
        let gate = gate();
        for path in ["/", "/login", "/register", "/healthz", "/api/auth/login", "/api/auth/register", "/api/auth/logout"] {
            assert_eq!(classify_path(path, &gate), PathClass::Public, "{path}");
        }
        // Exact match only
        assert_eq!(classify_path("/login/extra", &gate), PathClass::Page);
        assert_eq!(classify_path("/api/auth/me", &gate), PathClass::Api);
    }

    #[test]
    fn test_public_prefixes_and_assets() {
        let gate = gate();
        assert_eq!(classify_path("/_next/static/chunks/main.js", &gate), PathClass::Public);
        assert_eq!(classify_path("/assets/logo", &gate), PathClass::Public);
        assert_eq!(classify_path("/favicon.ico", &gate), PathClass::Public);
        assert_eq!(classify_path("/images/hero.PNG", &gate), PathClass::Public);
        assert_eq!(classify_path("/fonts/inter.woff2", &gate), PathClass::Public);
        // A dot in a directory name or a bare dotfile is not an asset
        assert_eq!(classify_path("/v1.2/overview", &gate), PathClass::Page);
        assert_eq!(classify_path("/.css", &gate), PathClass::Page);
        assert_eq!(classify_path("/report.pdf", &gate), PathClass::Page);
    }

    #[test]
    fn test_api_and_page_paths() {
        let gate = gate();
        assert_eq!(classify_path("/api/protected", &gate), PathClass::Api);
        assert_eq!(classify_path("/api", &gate), PathClass::Api);
        assert_eq!(classify_path("/apiary", &gate), PathClass::Page);
        assert_eq!(classify_path("/dashboard", &gate), PathClass::Page);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_page_without_cookie_redirects_to_login(pool: PgPool) {
        let server = gated_server(create_test_app_state(pool));

        let response = server.get("/dashboard").await;
        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.header("location"), "/login");
        assert!(response.headers().get("set-cookie").is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_api_without_cookie_is_unauthorized_json(pool: PgPool) {
        let server = gated_server(create_test_app_state(pool));

        let response = server.get("/api/protected").await;
        response.assert_status_unauthorized();
        let body: serde_json::Value = response.json();
        assert_eq!(body["authenticated"], false);
        assert!(body["error"].is_string());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_public_paths_pass_without_cookie(pool: PgPool) {
        let server = gated_server(create_test_app_state(pool));

        server.get("/").await.assert_text("home");
        server.get("/static/app.css").await.assert_text("body{}");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_preflight_is_not_gated(pool: PgPool) {
        let server = gated_server(create_test_app_state(pool));

        let response = server.method(axum::http::Method::OPTIONS, "/api/protected").await;
        assert_ne!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_invalid_cookie_is_rejected_and_cleared(pool: PgPool) {
        let server = gated_server(create_test_app_state(pool));

        let response = server.get("/api/protected").add_header("cookie", "auth_token=bogus").await;
        response.assert_status_unauthorized();
        let cleared = response.header("set-cookie");
        let cleared = cleared.to_str().unwrap();
        assert!(cleared.starts_with("auth_token=;"));
        assert!(cleared.contains("Max-Age=0"));

        let response = server.get("/dashboard").add_header("cookie", "auth_token=bogus").await;
        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        assert!(response.headers().get("set-cookie").is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_valid_cookie_passes_until_session_ends(pool: PgPool) {
        let state = create_test_app_state(pool.clone());
        let server = gated_server(state.clone());
        let user = create_test_user(&pool, "gate@example.com", "pw1").await;

        let mut conn = pool.acquire().await.unwrap();
        let issued = issue_session(&mut conn, user.id, &ClientMetadata::default(), &state.config.auth.session)
            .await
            .unwrap();
        let cookie = format!("auth_token={}", issued.token);

        server.get("/dashboard").add_header("cookie", cookie.clone()).await.assert_text("dashboard");
        server.get("/api/protected").add_header("cookie", cookie.clone()).await.assert_text("secret");

        end_session(&mut conn, &issued.token).await.unwrap();
        server
            .get("/api/protected")
            .add_header("cookie", cookie)
            .await
            .assert_status_unauthorized();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_store_failure_on_api_is_server_error(pool: PgPool) {
        let state = create_test_app_state(pool.clone());
        let server = gated_server(state);
        pool.close().await;

        let response = server.get("/api/protected").add_header("cookie", "auth_token=anything").await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        let response = server.get("/dashboard").add_header("cookie", "auth_token=anything").await;
        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.header("location"), "/login");
    }
}
