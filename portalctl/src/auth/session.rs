//! Session issue and validation.

use axum::http::{HeaderMap, header};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rand::prelude::RngExt;
use rand::rng;
use sqlx::PgConnection;
use tracing::{debug, instrument};

use crate::{
    config::{Config, SessionConfig},
    db::{
        handlers::{Repository, Sessions},
        models::{
            sessions::{SessionCreateDBRequest, SessionDBResponse, SessionWithUser},
            users::UserDBResponse,
        },
    },
    errors::Error,
    types::{UserId, abbrev_token, abbrev_uuid},
};

/// Generate a 256-bit session token, base64url encoded without padding (43 chars).
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Where a request came from, recorded on the session it creates
#[derive(Debug, Clone, Default)]
pub struct ClientMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientMetadata {
    /// Read the client IP from proxy headers (first `x-forwarded-for` hop, then `x-real-ip`)
    /// and the user agent.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let ip_address = header_str("x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
            .filter(|ip| !ip.is_empty())
            .or_else(|| header_str("x-real-ip"));

        Self {
            ip_address,
            user_agent: header_str(header::USER_AGENT.as_str()),
        }
    }
}

/// A freshly created session
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub session: SessionDBResponse,
}

/// A session that passed validation, together with its owner
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub user: UserDBResponse,
    pub session: SessionDBResponse,
}

/// Outcome of validating a presented token.
///
/// Unknown, expired and logged-out tokens are all [`AuthResult::Invalid`].
#[derive(Debug, Clone)]
pub enum AuthResult {
    Valid(Box<ValidatedSession>),
    Invalid,
}

fn session_lifetime(config: &SessionConfig) -> Result<chrono::Duration, Error> {
    chrono::Duration::from_std(config.timeout).map_err(|e| Error::Internal {
        operation: format!("convert session timeout: {e}"),
    })
}

/// Create a session for the user expiring `auth.session.timeout` from now.
///
/// A token collision surfaces as a unique violation on `sessions_token_unique`.
#[instrument(skip(db, client, config), fields(user_id = %abbrev_uuid(&user_id)), err)]
pub async fn issue_session(
    db: &mut PgConnection,
    user_id: UserId,
    client: &ClientMetadata,
    config: &SessionConfig,
) -> Result<IssuedSession, Error> {
    let token = generate_session_token();
    let expires_at = Utc::now() + session_lifetime(config)?;

    let session = Sessions::new(db)
        .create(&SessionCreateDBRequest {
            user_id,
            token: token.clone(),
            expires_at,
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        })
        .await?;

    debug!("Issued session {} for user {}", abbrev_token(&token), abbrev_uuid(&user_id));
    Ok(IssuedSession {
        token,
        expires_at,
        session,
    })
}

/// Check a presented token against the live sessions.
///
/// With sliding renewal enabled, a valid session's expiry is moved to now + timeout. Store
/// failures are returned as errors, never folded into [`AuthResult::Invalid`].
#[instrument(skip(db, token, config), fields(token = %abbrev_token(token)), err)]
pub async fn validate_session(db: &mut PgConnection, token: &str, config: &SessionConfig) -> Result<AuthResult, Error> {
    let now = Utc::now();
    let mut sessions = Sessions::new(db);

    let Some(SessionWithUser { user, mut session }) = sessions.find_live_by_token(token, now).await? else {
        debug!("Rejected session token {}", abbrev_token(token));
        return Ok(AuthResult::Invalid);
    };

    if config.sliding_renewal {
        let renewed = now + session_lifetime(config)?;
        sessions.set_expiry(session.id, renewed).await?;
        session.expires_at = renewed;
    }

    Ok(AuthResult::Valid(Box::new(ValidatedSession { user, session })))
}

/// End the session holding `token`. Returns whether a live session was ended.
#[instrument(skip(db, token), fields(token = %abbrev_token(token)), err)]
pub async fn end_session(db: &mut PgConnection, token: &str) -> Result<bool, Error> {
    Ok(Sessions::new(db).expire_by_token(token, Utc::now()).await?)
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str, config: &Config) -> String {
    let session_config = &config.auth.session;
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        session_config.cookie_name,
        token,
        session_config.cookie_same_site,
        session_config.timeout.as_secs()
    );
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that deletes the session cookie
pub fn clear_session_cookie(config: &Config) -> String {
    let session_config = &config.auth.session;
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite={}; Max-Age=0",
        session_config.cookie_name, session_config.cookie_same_site
    );
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Pull the session token out of the request's `Cookie` headers.
///
/// Empty values count as absent.
pub fn session_token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
