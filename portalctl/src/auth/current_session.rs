//! Extractor for the session presented with a request.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{instrument, trace};

use crate::{
    AppState,
    auth::session::{AuthResult, ValidatedSession, session_token_from_headers, validate_session},
    errors::{Error, Result},
};

/// The validated session of the caller, renewed as a side effect of extraction.
///
/// Rejects with [`Error::Unauthenticated`] when the request carries no session cookie or the
/// cookie does not name a live session.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: String,
    pub validated: ValidatedSession,
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let session_config = &state.config.auth.session;

        let Some(token) = session_token_from_headers(&parts.headers, &session_config.cookie_name) else {
            trace!("No session cookie on request");
            return Err(Error::Unauthenticated {
                message: Some("Not authenticated".to_string()),
            });
        };

        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        match validate_session(&mut conn, &token, session_config).await? {
            AuthResult::Valid(validated) => Ok(Self {
                token,
                validated: *validated,
            }),
            AuthResult::Invalid => Err(Error::Unauthenticated {
                message: Some("Invalid or expired session".to_string()),
            }),
        }
    }
}
