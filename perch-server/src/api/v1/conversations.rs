use axum::extract::State;
use axum::Json;
use axum_extra::routing::TypedPath;
use perch_core::auth::ActiveUser;
use perch_core::error::{PerchError, PerchResult};
use perch_core::protocol::{ConversationSummary, MessageBody};
use perch_core::state::PerchState;
use perch_models::{Conversation, Message};
use serde::Deserialize;

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/v1/conversations")]
pub struct PathConversations {}

/// GET and POST share this path; for GET `id` is a conversation id, for
/// POST it is the recipient's user id (the conversation may not exist
/// yet when the first message is posted).
#[derive(TypedPath, Deserialize)]
#[typed_path("/api/v1/conversations/:id/messages")]
pub struct PathConversationMessages {
    pub id: i64,
}

#[derive(Deserialize)]
pub struct NewMessage {
    pub content: String,
}

#[instrument(skip_all)]
pub async fn list_conversations(
    _: PathConversations,
    State(state): State<PerchState>,
    ActiveUser(me): ActiveUser,
) -> PerchResult<Json<Vec<ConversationSummary>>> {
    let mut client = state.get_db_client();
    let conversations = Conversation::for_user(&mut client, me.id).await?;
    Ok(Json(
        conversations.iter().map(ConversationSummary::from).collect(),
    ))
}

#[instrument(skip_all)]
pub async fn list_messages(
    PathConversationMessages { id }: PathConversationMessages,
    State(state): State<PerchState>,
    ActiveUser(me): ActiveUser,
) -> PerchResult<Json<Vec<MessageBody>>> {
    let mut client = state.get_db_client();
    let conversation = Conversation::get_id(&mut client, id)
        .await?
        .ok_or_else(|| PerchError::NotFound("conversation".to_string()))?;
    if !conversation.involves(me.id) {
        return Err(PerchError::Forbidden);
    }
    let messages = Message::for_conversation(&mut client, conversation.id).await?;
    Ok(Json(messages.iter().map(MessageBody::from).collect()))
}

/// Degraded-path send: same pipeline as the gateway but the stored
/// message comes back in the response instead of being pushed.
#[instrument(skip_all)]
pub async fn send_message(
    PathConversationMessages { id: recipient_id }: PathConversationMessages,
    State(state): State<PerchState>,
    ActiveUser(me): ActiveUser,
    Json(body): Json<NewMessage>,
) -> PerchResult<Json<MessageBody>> {
    let mut client = state.get_db_client();
    let message = crate::chat::persist_message(&mut client, me.id, recipient_id, &body.content).await?;
    Ok(Json(MessageBody::from(message)))
}
