use chrono::NaiveDateTime;
use perch_models::{ConversationPartner, Message};
use serde::{Deserialize, Serialize};

/// Events a connected client may send over the gateway socket.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    SendMessage {
        recipient_id: i64,
        content: String,
        /// Client-local correlation id, echoed back in the ack and in the
        /// sender's own new_message copies so optimistic UI entries can be
        /// reconciled deterministically.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ref: Option<String>,
    },
}

/// Events the gateway pushes to connected clients.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    NewMessage {
        message: MessageBody,
        /// Whether the viewing identity is the sender of the message.
        /// Computed per recipient group, never stored.
        own: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ref: Option<String>,
    },
    Ack {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ref: Option<String>,
        message_id: i64,
    },
    Error {
        code: ErrorCode,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ref: Option<String>,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Validation,
    Forbidden,
    NotFound,
    Internal,
}

/// The stored message as it travels over the wire, both in gateway
/// pushes and in REST responses.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessageBody {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub created_at: NaiveDateTime,
}

impl From<&Message> for MessageBody {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id,
            conversation_id: m.conversation_id,
            sender_id: m.sender_id,
            content: m.content.clone(),
            created_at: m.created_at,
        }
    }
}

impl From<Message> for MessageBody {
    fn from(m: Message) -> Self {
        Self::from(&m)
    }
}

/// One row of the caller's conversation list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConversationSummary {
    pub id: i64,
    pub partner_id: i64,
    pub partner_name: String,
    pub last_message_at: NaiveDateTime,
}

impl From<&ConversationPartner> for ConversationSummary {
    fn from(c: &ConversationPartner) -> Self {
        Self {
            id: c.id,
            partner_id: c.partner_id,
            partner_name: c.partner_name.clone(),
            last_message_at: c.last_message_at,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn send_message_wire_shape() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"send_message","recipient_id":2,"content":"hello","client_ref":"ref-1"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::SendMessage {
                recipient_id: 2,
                content: "hello".to_string(),
                client_ref: Some("ref-1".to_string()),
            }
        );
    }

    #[test]
    fn client_ref_is_optional_on_the_wire() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"send_message","recipient_id":2,"content":"hi"}"#)
                .unwrap();
        match event {
            ClientEvent::SendMessage { client_ref, .. } => assert_eq!(client_ref, None),
        }
    }

    #[test]
    fn new_message_round_trips() {
        let event = ServerEvent::NewMessage {
            message: MessageBody {
                id: 11,
                conversation_id: 3,
                sender_id: 1,
                content: "hello".to_string(),
                created_at: chrono::Utc::now().naive_utc(),
            },
            own: true,
            client_ref: Some("ref-1".to_string()),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"new_message""#));
        assert!(json.contains(r#""own":true"#));
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn error_codes_serialize_screaming() {
        let event = ServerEvent::Error {
            code: ErrorCode::NotFound,
            message: "recipient not found".to_string(),
            client_ref: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""code":"NOT_FOUND""#));
        assert!(!json.contains("client_ref"));
    }
}
