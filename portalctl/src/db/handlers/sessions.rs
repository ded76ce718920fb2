//! Database repository for sessions.
//!
//! Sessions are never deleted: logout and expiry both leave the row in place with an
//! `expires_at` in the past, and every lookup filters on `expires_at > now`.

use crate::types::{SessionId, abbrev_token, abbrev_uuid};
use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::{
        sessions::{SessionCreateDBRequest, SessionDBResponse, SessionWithUser},
        users::UserDBResponse,
    },
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

const SESSION_COLUMNS: &str = "id, user_id, token, expires_at, created_at, ip_address, user_agent";

// Flat row of a session joined with its user
#[derive(Debug, FromRow)]
struct SessionUserRow {
    session_id: SessionId,
    token: String,
    expires_at: DateTime<Utc>,
    session_created_at: DateTime<Utc>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    user_id: Uuid,
    email: Option<String>,
    username: Option<String>,
    display_name: Option<String>,
    avatar_url: Option<String>,
    is_verified: bool,
    is_anonymous: bool,
    user_created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl From<SessionUserRow> for SessionWithUser {
    fn from(row: SessionUserRow) -> Self {
        Self {
            session: SessionDBResponse {
                id: row.session_id,
                user_id: row.user_id,
                token: row.token,
                expires_at: row.expires_at,
                created_at: row.session_created_at,
                ip_address: row.ip_address,
                user_agent: row.user_agent,
            },
            user: UserDBResponse {
                id: row.user_id,
                email: row.email,
                username: row.username,
                display_name: row.display_name,
                avatar_url: row.avatar_url,
                is_verified: row.is_verified,
                is_anonymous: row.is_anonymous,
                created_at: row.user_created_at,
                updated_at: row.updated_at,
                last_login_at: row.last_login_at,
            },
        }
    }
}

pub struct Sessions<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Sessions<'c> {
    type CreateRequest = SessionCreateDBRequest;
    type Response = SessionDBResponse;
    type Id = SessionId;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), token = %abbrev_token(&request.token)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let session = sqlx::query_as::<_, SessionDBResponse>(&format!(
            r#"
            INSERT INTO sessions (id, user_id, token, expires_at, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.token)
        .bind(request.expires_at)
        .bind(&request.ip_address)
        .bind(&request.user_agent)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(session)
    }

    #[instrument(skip(self), fields(session_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let session = sqlx::query_as::<_, SessionDBResponse>(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(session)
    }
}

impl<'c> Sessions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Find the unexpired session holding this token, together with its user.
    ///
    /// Unknown and expired tokens are indistinguishable: both return `None`.
    #[instrument(skip(self, token), fields(token = %abbrev_token(token)), err)]
    pub async fn find_live_by_token(&mut self, token: &str, now: DateTime<Utc>) -> Result<Option<SessionWithUser>> {
        let row = sqlx::query_as::<_, SessionUserRow>(
            r#"
            SELECT
                s.id AS session_id, s.token, s.expires_at, s.created_at AS session_created_at,
                s.ip_address, s.user_agent,
                u.id AS user_id, u.email, u.username, u.display_name, u.avatar_url,
                u.is_verified, u.is_anonymous, u.created_at AS user_created_at, u.updated_at, u.last_login_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = $1 AND s.expires_at > $2
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(row.map(SessionWithUser::from))
    }

    /// Move a session's expiry to `expires_at`.
    #[instrument(skip(self), fields(session_id = %abbrev_uuid(&id)), err)]
    pub async fn set_expiry(&mut self, id: SessionId, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE sessions SET expires_at = $2 WHERE id = $1")
            .bind(id)
            .bind(expires_at)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    /// End the live session holding this token, if there is one.
    ///
    /// Returns whether a session was ended. Already-expired sessions keep their original expiry.
    #[instrument(skip(self, token), fields(token = %abbrev_token(token)), err)]
    pub async fn expire_by_token(&mut self, token: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query("UPDATE sessions SET expires_at = $2 WHERE token = $1 AND expires_at > $2")
            .bind(token)
            .bind(now)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
