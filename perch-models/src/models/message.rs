use perch_dependencies::chrono::NaiveDateTime;

use crate::{Client, PerchModelError};

/// A message body must contain something other than whitespace to be
/// worth storing.
pub fn acceptable_content(content: &str) -> bool {
    !content.trim().is_empty()
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub created_at: NaiveDateTime,
}

impl Message {
    /// Appends a message to a conversation. The stored row is immutable
    /// from here on; the timestamp is assigned by the database so ordering
    /// within a conversation follows insertion order.
    pub async fn append(
        client: &mut Client,
        conversation_id: i64,
        sender_id: i64,
        content: &str,
    ) -> Result<Message, PerchModelError> {
        if !acceptable_content(content) {
            return Err(PerchModelError::EmptyMessage);
        }
        let message = sqlx::query_as::<_, Message>(
            "INSERT INTO messages (conversation_id, sender_id, content)
             VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(client.pool())
        .await?;
        Ok(message)
    }

    pub async fn for_conversation(
        client: &mut Client,
        conversation_id: i64,
    ) -> Result<Vec<Message>, PerchModelError> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation_id)
        .fetch_all(client.pool())
        .await?;
        Ok(messages)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn plain_text_is_acceptable() {
        assert!(acceptable_content("hello"));
        assert!(acceptable_content("  padded but real  "));
    }

    #[test]
    fn empty_and_whitespace_content_is_rejected() {
        assert!(!acceptable_content(""));
        assert!(!acceptable_content("   "));
        assert!(!acceptable_content("\n\t  \r\n"));
    }
}
