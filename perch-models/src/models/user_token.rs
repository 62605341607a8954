use perch_dependencies::chrono::NaiveDateTime;

use crate::{Client, PerchModelError};

/// Context value under which chat credentials are stored; the auth
/// subsystem keeps other token kinds (password reset etc.) in the same
/// table under their own contexts.
pub const CHAT_TOKEN_CONTEXT: &str = "chat";

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UserToken {
    pub id: i64,
    pub user_id: i64,
    pub token: Vec<u8>,
    pub context: String,
    pub created_at: NaiveDateTime,
    pub expires_at: Option<NaiveDateTime>,
}

impl UserToken {
    pub async fn get_token_for_chat(
        client: &mut Client,
        token: &[u8],
    ) -> Result<Option<UserToken>, PerchModelError> {
        trace!("loading chat credential {}", hex::encode(token));
        let user_token = sqlx::query_as::<_, UserToken>(
            "SELECT * FROM user_tokens WHERE token = $1 AND context = $2",
        )
        .bind(token)
        .bind(CHAT_TOKEN_CONTEXT)
        .fetch_optional(client.pool())
        .await?;
        if let Some(user_token) = &user_token {
            trace!("credential {} -> user {}", user_token.id, user_token.user_id);
        }
        Ok(user_token)
    }

    pub async fn create_chat_token(
        client: &mut Client,
        user_id: i64,
        token: &[u8],
        expires_at: Option<NaiveDateTime>,
    ) -> Result<UserToken, PerchModelError> {
        let user_token = sqlx::query_as::<_, UserToken>(
            "INSERT INTO user_tokens (user_id, token, context, expires_at)
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(user_id)
        .bind(token)
        .bind(CHAT_TOKEN_CONTEXT)
        .bind(expires_at)
        .fetch_one(client.pool())
        .await?;
        Ok(user_token)
    }

    pub fn expired_at(&self, now: NaiveDateTime) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }

    pub fn expired(&self) -> bool {
        self.expired_at(chrono::Utc::now().naive_utc())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{Duration, Utc};

    fn token_expiring(expires_at: Option<NaiveDateTime>) -> UserToken {
        let now = Utc::now().naive_utc();
        UserToken {
            id: 1,
            user_id: 10,
            token: vec![0u8; 32],
            context: CHAT_TOKEN_CONTEXT.to_string(),
            created_at: now,
            expires_at,
        }
    }

    #[test]
    fn unbounded_token_never_expires() {
        assert!(!token_expiring(None).expired());
    }

    #[test]
    fn future_expiry_is_valid() {
        let token = token_expiring(Some(Utc::now().naive_utc() + Duration::hours(1)));
        assert!(!token.expired());
    }

    #[test]
    fn past_expiry_is_rejected() {
        let token = token_expiring(Some(Utc::now().naive_utc() - Duration::seconds(1)));
        assert!(token.expired());
    }

    #[test]
    fn expiry_boundary_counts_as_expired() {
        let now = Utc::now().naive_utc();
        let token = token_expiring(Some(now));
        assert!(token.expired_at(now));
    }
}
