use perch_core::error::{PerchError, PerchResult};
use perch_models::{acceptable_content, Client, Conversation, Message, User};

/// The common send pipeline behind both the gateway and the REST
/// fallback: validate, resolve the conversation, append, bump recency.
/// Everything either succeeds as a whole or the send never happened;
/// callers only emit after this returns Ok.
pub async fn persist_message(
    client: &mut Client,
    sender_id: i64,
    recipient_id: i64,
    content: &str,
) -> PerchResult<Message> {
    if !acceptable_content(content) {
        return Err(PerchError::Validation(
            "message content must not be empty".to_string(),
        ));
    }
    if recipient_id == sender_id {
        return Err(PerchError::Validation(
            "cannot start a conversation with yourself".to_string(),
        ));
    }
    let recipient = User::get_id(client, recipient_id)
        .await?
        .ok_or_else(|| PerchError::NotFound("user".to_string()))?;

    let conversation = Conversation::find_or_create(client, sender_id, recipient.id()).await?;
    let message = Message::append(client, conversation.id, sender_id, content).await?;
    Conversation::touch(client, conversation.id).await?;
    trace!(
        "user {} -> user {}: message {} in conversation {}",
        sender_id,
        recipient_id,
        message.id,
        conversation.id
    );
    Ok(message)
}
