//! # portalctl: session authentication for the SDK testing portal
//!
//! This crate owns sign-in for the portal: password hashing, opaque database-backed sessions
//! carried in an HTTP-only cookie, and a route gate that keeps every non-public route behind a
//! live session.
//!
//! ## Architecture
//!
//! ```text
//! request ──► route gate ──► router ──► auth handlers ──► repositories ──► PostgreSQL
//!                 │                                              ▲
//!                 └───────── session validator ──────────────────┘
//! ```
//!
//! - [`auth::middleware::route_gate`] classifies every request path as public, API or page and
//!   checks the `auth_token` cookie for the latter two.
//! - [`auth::session`] issues and validates sessions, renewing the expiry on each validated use.
//! - [`api::handlers::auth`] implements `/api/auth/{register,login,logout,me,anonymous}`.
//! - [`db`] is the credential store: users, auth methods and their bindings, sessions and
//!   account links.
//!
//! ## Lifecycle
//!
//! [`Application::new`] opens the connection pool and runs the embedded migrations,
//! [`Application::serve`] serves until the shutdown future resolves and then closes the pool.
//! There is no process-wide database handle; everything reaches the pool through [`AppState`].

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    api::handlers::{auth as auth_handlers, health},
    auth::middleware::route_gate,
    config::CorsOrigin,
    openapi::ApiDoc,
};
use axum::http::HeaderValue;
use axum::{Json, Router, ServiceExt, http, middleware::from_fn_with_state, routing::{get, post}};
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;

pub use types::{SessionId, UserId};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder().db(pool).config(config).build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the portalctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Open the connection pool described by `database` and bring the schema up to date.
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let settings = &config.database.pool;
    let optional = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(optional(settings.idle_timeout_secs))
        .max_lifetime(optional(settings.max_lifetime_secs))
        .connect(&config.database.url)
        .await?;

    migrator().run(&pool).await?;
    info!("Database ready (max {} connections)", settings.max_connections);

    Ok(pool)
}

/// Log which sign-in methods the credential store currently offers.
async fn log_active_auth_methods(pool: &PgPool) -> anyhow::Result<()> {
    let mut conn = pool.acquire().await?;
    let methods = db::handlers::AuthMethods::new(&mut conn).list_active().await?;
    let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
    info!("Active auth methods: {}", names.join(", "));
    Ok(())
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([http::Method::GET, http::Method::POST])
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the router: auth endpoints, health probe, OpenAPI document, CORS and tracing.
///
/// The route gate is not part of the router; it wraps the finished service so it sees every
/// path, including ones no route matches.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let auth_routes = Router::new()
        .route("/register", post(auth_handlers::register))
        .route("/login", post(auth_handlers::login))
        .route("/logout", post(auth_handlers::logout))
        .route("/me", get(auth_handlers::me))
        .route("/anonymous", post(auth_handlers::anonymous_sign_in));

    let router = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/auth", auth_routes)
        .fallback(health::not_found)
        .with_state(state.clone())
        .layer(create_cors_layer(&state.config)?)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// The portal authentication service: pool, state and router, ready to serve.
pub struct Application {
    router: Router,
    app_state: AppState,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance, connecting to `database.url`
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Create a new application instance, reusing `pool` when given (migrations still run).
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        debug!("Starting portal with configuration: {:#?}", config);

        let pool = match pool {
            Some(pool) => {
                migrator().run(&pool).await?;
                pool
            }
            None => setup_database(&config).await?,
        };
        log_active_auth_methods(&pool).await?;

        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(&app_state)?;

        Ok(Self {
            router,
            app_state,
            config,
            pool,
        })
    }

    /// Convert application into a test server
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        let gate = from_fn_with_state(self.app_state, route_gate);
        let service = gate.layer(self.router).into_make_service();
        axum_test::TestServer::new(service).expect("Failed to create test server")
    }

    /// Serve until `shutdown` resolves, then close the pool and flush telemetry
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Portal listening on http://{}", bind_addr);

        // Gate every request before path matching
        let gate = from_fn_with_state(self.app_state, route_gate);
        let service = gate.layer(self.router);

        axum::serve(listener, service.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::test_utils::create_test_app;
    use axum::http::StatusCode;
    use serde_json::Value;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_healthz_is_public(pool: PgPool) {
        let server = create_test_app(pool).await;
        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_openapi_document_is_public(pool: PgPool) {
        let server = create_test_app(pool).await;
        let response = server.get("/api/openapi.json").await;
        response.assert_status_ok();
        let doc: Value = response.json();
        assert!(doc["paths"]["/api/auth/login"].is_object());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_gate_applies_to_unrouted_paths(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server.get("/dashboard").await;
        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.header("location"), "/login");

        let response = server.get("/api/protected").await;
        response.assert_status_unauthorized();
        let body: Value = response.json();
        assert_eq!(body["authenticated"], false);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_route_behind_valid_session_is_json_404(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server.post("/api/auth/anonymous").await;
        let body: Value = response.json();
        let cookie = format!("auth_token={}", body["token"].as_str().unwrap());

        let response = server.get("/api/nothing-here").add_header("cookie", cookie).await;
        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["error"], "Not found");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cors_preflight_allows_configured_origin(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server
            .method(axum::http::Method::OPTIONS, "/api/auth/login")
            .add_header("origin", "http://localhost:3000")
            .add_header("access-control-request-method", "POST")
            .await;
        assert_eq!(response.header("access-control-allow-origin"), "http://localhost:3000");
        assert_eq!(response.header("access-control-allow-credentials"), "true");
    }
}
