//! Consumer side of the Perch chat subsystem: a per-session gateway
//! connection, the REST fallback client, and the session state machine
//! that keeps a conversation list and an active thread in sync with
//! pushed events.

#[macro_use]
extern crate tracing;

mod connection;
mod error;
mod rest;
mod session;

pub use connection::ChatConnection;
pub use error::{ChatClientError, ChatClientResult};
pub use rest::ChatRest;
pub use session::{
    ActiveConversation, ChatSession, ConversationEntry, PendingMessage, PendingState,
    SessionUpdate,
};

// consumers only ever speak the wire contract
pub use perch_core::protocol;
