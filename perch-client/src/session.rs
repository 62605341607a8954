use perch_core::protocol::{ClientEvent, ConversationSummary, MessageBody, ServerEvent};

/// One row of the conversation list as the UI sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationEntry {
    pub summary: ConversationSummary,
    pub unread: bool,
}

/// The thread currently on screen, messages oldest-first.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveConversation {
    pub id: i64,
    pub messages: Vec<MessageBody>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PendingState {
    InFlight,
    Failed(String),
}

/// An optimistic send awaiting its authoritative echo.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMessage {
    pub client_ref: String,
    pub recipient_id: i64,
    pub content: String,
    pub state: PendingState,
}

/// What applying a pushed event means for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// A message landed in the active thread.
    ActiveMessage(MessageBody),
    /// Another known conversation got a message; the list was reordered
    /// and the unread flag set, no message bodies were fetched.
    BackgroundActivity { conversation_id: i64 },
    /// A message arrived for a conversation this session has never seen;
    /// the conversation list should be refetched.
    RefreshNeeded,
    SendAcked {
        client_ref: Option<String>,
        message_id: i64,
    },
    SendFailed {
        client_ref: Option<String>,
        message: String,
    },
}

/// Client-side chat state machine. Owns no sockets; feed it the events a
/// [`crate::ChatConnection`] yields and render what it holds.
#[derive(Debug, Clone)]
pub struct ChatSession {
    me: i64,
    conversations: Vec<ConversationEntry>,
    active: Option<ActiveConversation>,
    pending: Vec<PendingMessage>,
}

impl ChatSession {
    pub fn new(me: i64) -> Self {
        Self {
            me,
            conversations: Vec::new(),
            active: None,
            pending: Vec::new(),
        }
    }

    pub fn me(&self) -> i64 {
        self.me
    }

    pub fn conversations(&self) -> &[ConversationEntry] {
        &self.conversations
    }

    pub fn active(&self) -> Option<&ActiveConversation> {
        self.active.as_ref()
    }

    pub fn pending(&self) -> &[PendingMessage] {
        &self.pending
    }

    /// Replaces the conversation list (initial load or a refresh after
    /// [`SessionUpdate::RefreshNeeded`]), keeping unread flags of rows
    /// that survive the refresh.
    pub fn load_conversations(&mut self, list: Vec<ConversationSummary>) {
        let previous = std::mem::take(&mut self.conversations);
        self.conversations = list
            .into_iter()
            .map(|summary| {
                let unread = previous
                    .iter()
                    .find(|c| c.summary.id == summary.id)
                    .map(|c| c.unread)
                    .unwrap_or(false);
                ConversationEntry { summary, unread }
            })
            .collect();
        self.sort_conversations();
    }

    /// Makes a conversation the active thread and clears its unread flag.
    pub fn open_conversation(&mut self, id: i64, messages: Vec<MessageBody>) {
        if let Some(entry) = self.conversations.iter_mut().find(|c| c.summary.id == id) {
            entry.unread = false;
        }
        self.active = Some(ActiveConversation { id, messages });
    }

    pub fn close_conversation(&mut self) {
        self.active = None;
    }

    /// Stages an optimistic send and returns the event to put on the
    /// wire. The pending entry shows up in the UI immediately and is
    /// reconciled when the authoritative copy comes back.
    pub fn begin_send(&mut self, recipient_id: i64, content: &str) -> (String, ClientEvent) {
        let client_ref = uuid::Uuid::new_v4().to_string();
        self.pending.push(PendingMessage {
            client_ref: client_ref.clone(),
            recipient_id,
            content: content.to_string(),
            state: PendingState::InFlight,
        });
        let event = ClientEvent::SendMessage {
            recipient_id,
            content: content.to_string(),
            client_ref: Some(client_ref.clone()),
        };
        (client_ref, event)
    }

    /// Applies a pushed server event.
    pub fn apply(&mut self, event: ServerEvent) -> SessionUpdate {
        match event {
            ServerEvent::NewMessage {
                message,
                own,
                client_ref,
            } => self.apply_message(message, own, client_ref),
            ServerEvent::Ack {
                client_ref,
                message_id,
            } => {
                if let Some(client_ref) = &client_ref {
                    self.resolve_pending(client_ref);
                }
                SessionUpdate::SendAcked {
                    client_ref,
                    message_id,
                }
            }
            ServerEvent::Error {
                message,
                client_ref,
                ..
            } => {
                if let Some(client_ref) = &client_ref {
                    if let Some(pending) = self
                        .pending
                        .iter_mut()
                        .find(|p| &p.client_ref == client_ref)
                    {
                        pending.state = PendingState::Failed(message.clone());
                    }
                }
                SessionUpdate::SendFailed {
                    client_ref,
                    message,
                }
            }
        }
    }

    fn apply_message(
        &mut self,
        message: MessageBody,
        own: bool,
        client_ref: Option<String>,
    ) -> SessionUpdate {
        if own {
            match client_ref {
                Some(client_ref) => self.resolve_pending(&client_ref),
                // another tab of ours sent it, or the ref got lost;
                // fall back to matching on what we know we sent
                None => self.resolve_pending_by_content(&message.content),
            }
        }

        let known = self
            .conversations
            .iter_mut()
            .find(|c| c.summary.id == message.conversation_id);
        let known = match known {
            Some(entry) => {
                entry.summary.last_message_at = message.created_at;
                true
            }
            None => false,
        };

        let is_active = self
            .active
            .as_ref()
            .map(|a| a.id == message.conversation_id)
            .unwrap_or(false);

        if is_active {
            self.sort_conversations();
            if let Some(active) = self.active.as_mut() {
                // the same stored message can arrive more than once when
                // several of our connections race; the id is authoritative
                if !active.messages.iter().any(|m| m.id == message.id) {
                    active.messages.push(message.clone());
                }
            }
            return SessionUpdate::ActiveMessage(message);
        }

        if known {
            let conversation_id = message.conversation_id;
            if !own {
                if let Some(entry) = self
                    .conversations
                    .iter_mut()
                    .find(|c| c.summary.id == conversation_id)
                {
                    entry.unread = true;
                }
            }
            self.sort_conversations();
            return SessionUpdate::BackgroundActivity { conversation_id };
        }

        SessionUpdate::RefreshNeeded
    }

    fn resolve_pending(&mut self, client_ref: &str) {
        self.pending.retain(|p| p.client_ref != client_ref);
    }

    fn resolve_pending_by_content(&mut self, content: &str) {
        if let Some(position) = self
            .pending
            .iter()
            .position(|p| p.state == PendingState::InFlight && p.content == content)
        {
            self.pending.remove(position);
        }
    }

    fn sort_conversations(&mut self) {
        self.conversations
            .sort_by(|a, b| b.summary.last_message_at.cmp(&a.summary.last_message_at));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use perch_core::protocol::ErrorCode;
    use perch_dependencies::chrono::{Duration, NaiveDateTime, Utc};

    fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    fn summary(id: i64, partner_id: i64, last_message_at: NaiveDateTime) -> ConversationSummary {
        ConversationSummary {
            id,
            partner_id,
            partner_name: format!("user-{}", partner_id),
            last_message_at,
        }
    }

    fn pushed(
        conversation_id: i64,
        sender_id: i64,
        content: &str,
        own: bool,
        client_ref: Option<String>,
    ) -> ServerEvent {
        ServerEvent::NewMessage {
            message: MessageBody {
                id: 100 + conversation_id,
                conversation_id,
                sender_id,
                content: content.to_string(),
                created_at: now(),
            },
            own,
            client_ref,
        }
    }

    #[test]
    fn optimistic_send_reconciles_against_the_own_copy() {
        let mut session = ChatSession::new(1);
        session.load_conversations(vec![summary(10, 2, now())]);
        session.open_conversation(10, vec![]);

        let (client_ref, _event) = session.begin_send(2, "hello");
        assert_eq!(session.pending().len(), 1);

        let update = session.apply(pushed(10, 1, "hello", true, Some(client_ref)));
        assert!(matches!(update, SessionUpdate::ActiveMessage(_)));
        assert!(session.pending().is_empty());
        assert_eq!(session.active().unwrap().messages.len(), 1);
    }

    #[test]
    fn ack_resolves_a_pending_send_when_the_push_was_missed() {
        let mut session = ChatSession::new(1);
        let (client_ref, _event) = session.begin_send(2, "hello");

        let update = session.apply(ServerEvent::Ack {
            client_ref: Some(client_ref.clone()),
            message_id: 55,
        });
        assert_eq!(
            update,
            SessionUpdate::SendAcked {
                client_ref: Some(client_ref),
                message_id: 55,
            }
        );
        assert!(session.pending().is_empty());
    }

    #[test]
    fn own_copy_without_a_ref_falls_back_to_content_matching() {
        let mut session = ChatSession::new(1);
        session.load_conversations(vec![summary(10, 2, now())]);
        session.open_conversation(10, vec![]);
        session.begin_send(2, "hello");

        session.apply(pushed(10, 1, "hello", true, None));
        assert!(session.pending().is_empty());
    }

    #[test]
    fn background_message_sets_unread_and_reorders() {
        let mut session = ChatSession::new(1);
        let old = now() - Duration::hours(2);
        session.load_conversations(vec![summary(10, 2, now()), summary(11, 3, old)]);
        session.open_conversation(10, vec![]);
        assert_eq!(session.conversations()[0].summary.id, 10);

        let update = session.apply(pushed(11, 3, "psst", false, None));
        assert_eq!(
            update,
            SessionUpdate::BackgroundActivity { conversation_id: 11 }
        );
        assert_eq!(session.conversations()[0].summary.id, 11);
        assert!(session.conversations()[0].unread);
        // the active thread did not change
        assert!(session.active().unwrap().messages.is_empty());
    }

    #[test]
    fn unknown_conversation_requests_a_refresh() {
        let mut session = ChatSession::new(1);
        session.load_conversations(vec![summary(10, 2, now())]);

        let update = session.apply(pushed(99, 5, "hi there", false, None));
        assert_eq!(update, SessionUpdate::RefreshNeeded);
    }

    #[test]
    fn refresh_preserves_unread_flags() {
        let mut session = ChatSession::new(1);
        session.load_conversations(vec![summary(10, 2, now())]);
        session.apply(pushed(10, 2, "unseen", false, None));
        assert!(session.conversations()[0].unread);

        session.load_conversations(vec![summary(10, 2, now()), summary(11, 3, now())]);
        let entry = session
            .conversations()
            .iter()
            .find(|c| c.summary.id == 10)
            .unwrap();
        assert!(entry.unread);
    }

    #[test]
    fn opening_a_conversation_clears_its_unread_flag() {
        let mut session = ChatSession::new(1);
        session.load_conversations(vec![summary(10, 2, now())]);
        session.apply(pushed(10, 2, "unseen", false, None));
        assert!(session.conversations()[0].unread);

        session.open_conversation(10, vec![]);
        assert!(!session.conversations()[0].unread);
    }

    #[test]
    fn duplicate_pushes_of_one_message_append_once() {
        let mut session = ChatSession::new(1);
        session.load_conversations(vec![summary(10, 2, now())]);
        session.open_conversation(10, vec![]);

        let event = pushed(10, 2, "hello", false, None);
        session.apply(event.clone());
        session.apply(event);
        assert_eq!(session.active().unwrap().messages.len(), 1);
    }

    #[test]
    fn send_errors_mark_the_pending_entry_failed() {
        let mut session = ChatSession::new(1);
        let (client_ref, _event) = session.begin_send(2, "hello");

        let update = session.apply(ServerEvent::Error {
            code: ErrorCode::Validation,
            message: "message content must not be empty".to_string(),
            client_ref: Some(client_ref),
        });
        assert!(matches!(update, SessionUpdate::SendFailed { .. }));
        assert_eq!(session.pending().len(), 1);
        assert!(matches!(
            session.pending()[0].state,
            PendingState::Failed(_)
        ));
    }
}
