//! Database repository for bindings between users and auth methods.
//!
//! A password binding keeps the stored hash in `provider_data.password_hash` and the user's email
//! in `provider_id`; an anonymous binding uses the user id as its `provider_id`.

use crate::types::{UserAuthMethodId, UserId, abbrev_uuid};
use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::auth_methods::{BoundAuthMethod, UserAuthMethodCreateDBRequest, UserAuthMethodDBResponse},
};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

const BINDING_COLUMNS: &str = "id, user_id, auth_method_id, provider_id, provider_data, is_primary, last_used_at, created_at";

pub struct UserAuthMethods<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for UserAuthMethods<'c> {
    type CreateRequest = UserAuthMethodCreateDBRequest;
    type Response = UserAuthMethodDBResponse;
    type Id = UserAuthMethodId;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), auth_method_id = request.auth_method_id), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let binding = sqlx::query_as::<_, UserAuthMethodDBResponse>(&format!(
            r#"
            INSERT INTO user_auth_methods (id, user_id, auth_method_id, provider_id, provider_data, is_primary)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {BINDING_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(request.auth_method_id)
        .bind(&request.provider_id)
        .bind(&request.provider_data)
        .bind(request.is_primary)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(binding)
    }

    #[instrument(skip(self), fields(binding_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let binding = sqlx::query_as::<_, UserAuthMethodDBResponse>(&format!(
            "SELECT {BINDING_COLUMNS} FROM user_auth_methods WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(binding)
    }
}

impl<'c> UserAuthMethods<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// The user's binding to the named auth method, if any
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn find_for_user(&mut self, user_id: UserId, method_name: &str) -> Result<Option<UserAuthMethodDBResponse>> {
        let binding = sqlx::query_as::<_, UserAuthMethodDBResponse>(
            r#"
            SELECT uam.id, uam.user_id, uam.auth_method_id, uam.provider_id, uam.provider_data,
                   uam.is_primary, uam.last_used_at, uam.created_at
            FROM user_auth_methods uam
            JOIN auth_methods am ON am.id = uam.auth_method_id
            WHERE uam.user_id = $1 AND am.name = $2
            "#,
        )
        .bind(user_id)
        .bind(method_name)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(binding)
    }

    /// Every auth method bound to the user, primary first
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn list_for_user(&mut self, user_id: UserId) -> Result<Vec<BoundAuthMethod>> {
        let methods = sqlx::query_as::<_, BoundAuthMethod>(
            r#"
            SELECT uam.id, am.name, am.display_name, uam.is_primary, uam.last_used_at, uam.created_at
            FROM user_auth_methods uam
            JOIN auth_methods am ON am.id = uam.auth_method_id
            WHERE uam.user_id = $1
            ORDER BY uam.is_primary DESC, am.priority, uam.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(methods)
    }

    #[instrument(skip(self), fields(binding_id = %abbrev_uuid(&id)), err)]
    pub async fn touch_last_used(&mut self, id: UserAuthMethodId) -> Result<()> {
        sqlx::query("UPDATE user_auth_methods SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::Repository;
    use super::*;
    use crate::db::{
        errors::DbError,
        handlers::{AuthMethods, Users},
        models::{
            auth_methods::{PASSWORD_METHOD, PasswordProviderData},
            users::UserCreateDBRequest,
        },
    };
    use sqlx::PgPool;

    async fn password_binding(conn: &mut PgConnection, user_id: UserId, email: &str) -> UserAuthMethodCreateDBRequest {
        let method = AuthMethods::new(conn).get_active_by_name(PASSWORD_METHOD).await.unwrap().unwrap();
        UserAuthMethodCreateDBRequest {
            user_id,
            auth_method_id: method.id,
            provider_id: email.to_string(),
            provider_data: PasswordProviderData {
                password_hash: "stored-hash".to_string(),
            }
            .to_value(),
            is_primary: true,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_password_binding_round_trip(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn)
            .create(&UserCreateDBRequest::registered("bind@example.com".to_string(), None, None))
            .await
            .unwrap();

        let request = password_binding(&mut conn, user.id, "bind@example.com").await;
        let created = UserAuthMethods::new(&mut conn).create(&request).await.unwrap();
        assert_eq!(created.password_hash().as_deref(), Some("stored-hash"));

        let mut repo = UserAuthMethods::new(&mut conn);
        let found = repo.find_for_user(user.id, PASSWORD_METHOD).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(found.last_used_at.is_none());
        assert!(repo.find_for_user(user.id, "google").await.unwrap().is_none());

        repo.touch_last_used(created.id).await.unwrap();
        let touched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert!(touched.last_used_at.is_some());

        let listed = repo.list_for_user(user.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, PASSWORD_METHOD);
        assert!(listed[0].is_primary);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_one_binding_per_method_per_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn)
            .create(&UserCreateDBRequest::registered("twice@example.com".to_string(), None, None))
            .await
            .unwrap();

        let request = password_binding(&mut conn, user.id, "twice@example.com").await;
        UserAuthMethods::new(&mut conn).create(&request).await.unwrap();

        let mut again = request.clone();
        again.provider_id = "other@example.com".to_string();
        let err = UserAuthMethods::new(&mut conn).create(&again).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(err.constraint(), Some("user_auth_methods_user_method_unique"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_provider_identity_is_unique_per_method(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let first = Users::new(&mut conn)
            .create(&UserCreateDBRequest::registered("first@example.com".to_string(), None, None))
            .await
            .unwrap();
        let second = Users::new(&mut conn)
            .create(&UserCreateDBRequest::registered("second@example.com".to_string(), None, None))
            .await
            .unwrap();

        let request = password_binding(&mut conn, first.id, "shared@example.com").await;
        UserAuthMethods::new(&mut conn).create(&request).await.unwrap();

        let mut clash = request.clone();
        clash.user_id = second.id;
        let err = UserAuthMethods::new(&mut conn).create(&clash).await.unwrap_err();
        assert_eq!(err.constraint(), Some("user_auth_methods_provider_unique"));
    }
}
