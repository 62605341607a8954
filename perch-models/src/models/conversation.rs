use perch_dependencies::chrono::NaiveDateTime;

use crate::{Client, PerchModelError};

/// Orders a participant pair so the smaller id always comes first.
/// Every row in the conversations table stores its pair in this order,
/// which is what makes the pair unique regardless of who made contact.
pub fn canonical_pair(a: i64, b: i64) -> (i64, i64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Conversation {
    pub id: i64,
    pub participant_a: i64,
    pub participant_b: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub last_message_at: NaiveDateTime,
}

/// Conversation row annotated with the other participant, as returned by
/// [`Conversation::for_user`].
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ConversationPartner {
    pub id: i64,
    pub participant_a: i64,
    pub participant_b: i64,
    pub last_message_at: NaiveDateTime,
    pub partner_id: i64,
    pub partner_name: String,
}

impl Conversation {
    pub async fn get_id(
        client: &mut Client,
        id: i64,
    ) -> Result<Option<Conversation>, PerchModelError> {
        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
                .bind(id)
                .fetch_optional(client.pool())
                .await?;
        Ok(conversation)
    }

    /// Returns the one conversation between the two users, creating it on
    /// first contact. Two users messaging each other for the first time at
    /// the same instant race on the insert; the unique constraint on the
    /// canonical pair makes one of them lose, and the loser re-reads the
    /// winner's row.
    pub async fn find_or_create(
        client: &mut Client,
        a: i64,
        b: i64,
    ) -> Result<Conversation, PerchModelError> {
        if a == b {
            return Err(PerchModelError::SelfConversation);
        }
        let (first, second) = canonical_pair(a, b);
        if let Some(existing) = Self::for_pair(client, first, second).await? {
            return Ok(existing);
        }
        let inserted = sqlx::query_as::<_, Conversation>(
            "INSERT INTO conversations (participant_a, participant_b)
             VALUES ($1, $2)
             ON CONFLICT (participant_a, participant_b) DO NOTHING
             RETURNING *",
        )
        .bind(first)
        .bind(second)
        .fetch_optional(client.pool())
        .await?;
        match inserted {
            Some(conversation) => Ok(conversation),
            // lost the race, the row exists now
            None => Self::for_pair(client, first, second)
                .await?
                .ok_or_else(|| {
                    PerchModelError::Other(format!(
                        "conversation ({}, {}) vanished after insert conflict",
                        first, second
                    ))
                }),
        }
    }

    async fn for_pair(
        client: &mut Client,
        first: i64,
        second: i64,
    ) -> Result<Option<Conversation>, PerchModelError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE participant_a = $1 AND participant_b = $2",
        )
        .bind(first)
        .bind(second)
        .fetch_optional(client.pool())
        .await?;
        Ok(conversation)
    }

    /// Advances last_message_at; called after every successful append.
    pub async fn touch(client: &mut Client, id: i64) -> Result<(), PerchModelError> {
        sqlx::query(
            "UPDATE conversations SET last_message_at = now(), updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(client.pool())
        .await?;
        Ok(())
    }

    /// All conversations the user takes part in, newest activity first,
    /// each annotated with the other participant's display name.
    pub async fn for_user(
        client: &mut Client,
        user_id: i64,
    ) -> Result<Vec<ConversationPartner>, PerchModelError> {
        let conversations = sqlx::query_as::<_, ConversationPartner>(
            "SELECT c.id, c.participant_a, c.participant_b, c.last_message_at,
                    u.id AS partner_id, u.name AS partner_name
             FROM conversations c
             JOIN users u
               ON u.id = CASE WHEN c.participant_a = $1 THEN c.participant_b
                              ELSE c.participant_a END
             WHERE c.participant_a = $1 OR c.participant_b = $1
             ORDER BY c.last_message_at DESC",
        )
        .bind(user_id)
        .fetch_all(client.pool())
        .await?;
        trace!("user {} has {} conversations", user_id, conversations.len());
        Ok(conversations)
    }

    pub fn involves(&self, user_id: i64) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }

    pub fn partner_of(&self, user_id: i64) -> i64 {
        if self.participant_a == user_id {
            self.participant_b
        } else {
            self.participant_a
        }
    }
}
