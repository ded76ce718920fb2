//! Database repository for the seeded auth method descriptors.

use crate::db::{errors::Result, models::auth_methods::AuthMethodDBResponse};
use sqlx::PgConnection;
use tracing::instrument;

pub struct AuthMethods<'c> {
    db: &'c mut PgConnection,
}

impl<'c> AuthMethods<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Look up an active auth method by name
    #[instrument(skip(self), err)]
    pub async fn get_active_by_name(&mut self, name: &str) -> Result<Option<AuthMethodDBResponse>> {
        let method = sqlx::query_as::<_, AuthMethodDBResponse>(
            "SELECT id, name, display_name, is_active, priority FROM auth_methods WHERE name = $1 AND is_active",
        )
        .bind(name)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(method)
    }

    /// All active methods, lowest priority value first
    #[instrument(skip(self), err)]
    pub async fn list_active(&mut self) -> Result<Vec<AuthMethodDBResponse>> {
        let methods = sqlx::query_as::<_, AuthMethodDBResponse>(
            "SELECT id, name, display_name, is_active, priority FROM auth_methods WHERE is_active ORDER BY priority, id",
        )
        .fetch_all(&mut *self.db)
        .await?;

        Ok(methods)
    }
}
