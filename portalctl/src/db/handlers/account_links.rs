//! Database repository for account links.

use crate::types::{AccountLinkId, UserId, abbrev_uuid};
use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::account_links::{AccountLinkCreateDBRequest, AccountLinkDBResponse},
};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

const LINK_COLUMNS: &str = "id, primary_user_id, linked_user_id, link_type, created_at";

pub struct AccountLinks<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for AccountLinks<'c> {
    type CreateRequest = AccountLinkCreateDBRequest;
    type Response = AccountLinkDBResponse;
    type Id = AccountLinkId;

    #[instrument(skip(self, request), fields(primary_user_id = %abbrev_uuid(&request.primary_user_id), link_type = %request.link_type), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let link = sqlx::query_as::<_, AccountLinkDBResponse>(&format!(
            r#"
            INSERT INTO account_links (id, primary_user_id, linked_user_id, link_type)
            VALUES ($1, $2, $3, $4)
            RETURNING {LINK_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(request.primary_user_id)
        .bind(request.linked_user_id)
        .bind(&request.link_type)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(link)
    }

    #[instrument(skip(self), fields(link_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let link = sqlx::query_as::<_, AccountLinkDBResponse>(&format!("SELECT {LINK_COLUMNS} FROM account_links WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(link)
    }
}

impl<'c> AccountLinks<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Links where the user is the primary account, oldest first
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn list_for_primary(&mut self, user_id: UserId) -> Result<Vec<AccountLinkDBResponse>> {
        let links = sqlx::query_as::<_, AccountLinkDBResponse>(&format!(
            "SELECT {LINK_COLUMNS} FROM account_links WHERE primary_user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(links)
    }
}
