//! Database repository for users.

use crate::types::{UserId, abbrev_uuid};
use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::users::{UserCreateDBRequest, UserDBResponse},
};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, email, username, display_name, avatar_url, is_verified, is_anonymous, created_at, updated_at, last_login_at";

/// Which identifying field of an existing user clashes with a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityClash {
    Email,
    Username,
}

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;

    #[instrument(skip(self, request), fields(is_anonymous = request.is_anonymous), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        // Always generate a new ID for users
        let user_id = Uuid::new_v4();

        let user = sqlx::query_as::<_, UserDBResponse>(&format!(
            r#"
            INSERT INTO users (id, email, username, display_name, avatar_url, is_anonymous)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&request.email)
        .bind(&request.username)
        .bind(&request.display_name)
        .bind(&request.avatar_url)
        .bind(request.is_anonymous)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Look up a user by a login identifier, which may be either an email or a username.
    /// An exact email match wins over a username match.
    #[instrument(skip(self, identifier), err)]
    pub async fn get_user_by_login(&mut self, identifier: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE email = $1 OR username = $1
            ORDER BY (email = $1) DESC NULLS LAST
            LIMIT 1
            "#
        ))
        .bind(identifier)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(user)
    }

    /// Report whether an email or username is already held by another user.
    #[instrument(skip(self, email, username), err)]
    pub async fn find_identity_clash(&mut self, email: &str, username: Option<&str>) -> Result<Option<IdentityClash>> {
        let clash: Option<(bool,)> = sqlx::query_as(
            r#"
            SELECT COALESCE(email = $1, FALSE) AS email_taken FROM users
            WHERE email = $1 OR ($2::TEXT IS NOT NULL AND username = $2)
            ORDER BY (email = $1) DESC NULLS LAST
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(username)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(clash.map(|(email_taken,)| {
            if email_taken {
                IdentityClash::Email
            } else {
                IdentityClash::Username
            }
        }))
    }

    /// Stamp a successful login, returning the updated user.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn record_login(&mut self, id: UserId) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!(
            "UPDATE users SET last_login_at = NOW(), updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::Repository;
    use super::*;
    use crate::db::errors::DbError;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let request = UserCreateDBRequest::registered(
            "test@example.com".to_string(),
            Some("testuser".to_string()),
            Some("Test User".to_string()),
        );

        let user = repo.create(&request).await.unwrap();
        assert_eq!(user.email.as_deref(), Some("test@example.com"));
        assert_eq!(user.username.as_deref(), Some("testuser"));
        assert_eq!(user.display_name.as_deref(), Some("Test User"));
        assert!(!user.is_anonymous);
        assert!(!user.is_verified);
        assert!(user.last_login_at.is_none());

        let fetched = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, user.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_email_is_unique_violation(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&UserCreateDBRequest::registered("dup@example.com".to_string(), None, None))
            .await
            .unwrap();
        let err = repo
            .create(&UserCreateDBRequest::registered("dup@example.com".to_string(), None, None))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(err.constraint(), Some("users_email_unique"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_registered_user_requires_email(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let mut request = UserCreateDBRequest::registered("x@example.com".to_string(), None, None);
        request.email = None;

        let err = repo.create(&request).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_anonymous_user_without_email(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&UserCreateDBRequest::anonymous("Guest".to_string())).await.unwrap();
        assert!(user.is_anonymous);
        assert!(user.email.is_none());

        // Several anonymous users can coexist with NULL emails
        repo.create(&UserCreateDBRequest::anonymous("Guest".to_string())).await.unwrap();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_user_by_login_matches_email_or_username(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo
            .create(&UserCreateDBRequest::registered(
                "login@example.com".to_string(),
                Some("loginuser".to_string()),
                None,
            ))
            .await
            .unwrap();

        let by_email = repo.get_user_by_login("login@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        let by_username = repo.get_user_by_login("loginuser").await.unwrap().unwrap();
        assert_eq!(by_username.id, created.id);

        assert!(repo.get_user_by_login("nobody").await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_find_identity_clash(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&UserCreateDBRequest::registered(
            "taken@example.com".to_string(),
            Some("taken".to_string()),
            None,
        ))
        .await
        .unwrap();

        assert_eq!(
            repo.find_identity_clash("taken@example.com", None).await.unwrap(),
            Some(IdentityClash::Email)
        );
        assert_eq!(
            repo.find_identity_clash("fresh@example.com", Some("taken")).await.unwrap(),
            Some(IdentityClash::Username)
        );
        assert_eq!(repo.find_identity_clash("fresh@example.com", Some("fresh")).await.unwrap(), None);
        assert_eq!(repo.find_identity_clash("fresh@example.com", None).await.unwrap(), None);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_record_login(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo
            .create(&UserCreateDBRequest::registered("stamp@example.com".to_string(), None, None))
            .await
            .unwrap();
        let stamped = repo.record_login(user.id).await.unwrap();
        assert!(stamped.last_login_at.is_some());

        let user = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(user.last_login_at, stamped.last_login_at);

        let err = repo.record_login(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }
}
