use perch_dependencies::chrono::NaiveDateTime;
use std::convert::TryInto;

use crate::{Client, PerchModelError};

/// Marketplace account as the chat subsystem sees it. The table is owned
/// by the auth subsystem; chat only ever reads id, display name and role.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn displayname(&self) -> &str {
        &self.name
    }

    pub async fn get_id(client: &mut Client, id: i64) -> Result<Option<User>, PerchModelError> {
        if let Some(user) = client.cached_user(id).await {
            return Ok(user);
        }
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(client.pool())
            .await?;
        client.cache_user(id, user.clone()).await;
        Ok(user)
    }

    pub async fn get_all(
        client: &mut Client,
        offset: Option<u64>,
        limit: Option<u64>,
    ) -> Result<Vec<User>, PerchModelError> {
        let offset: i64 = offset.unwrap_or(0).min((i64::MAX - 1).try_into()?) as i64;
        let limit: i64 = limit.unwrap_or(25).min(100) as i64;
        let users =
            sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id OFFSET $1 LIMIT $2")
                .bind(offset)
                .bind(limit)
                .fetch_all(client.pool())
                .await?;
        Ok(users)
    }
}

impl From<std::num::TryFromIntError> for PerchModelError {
    fn from(v: std::num::TryFromIntError) -> Self {
        Self::Other(v.to_string())
    }
}
