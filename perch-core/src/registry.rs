use std::collections::HashMap;
use std::sync::Arc;

use perch_dependencies::uuid::Uuid;
use tokio::sync::{mpsc, RwLock};

use crate::protocol::ServerEvent;

#[derive(Debug, Clone)]
struct Binding {
    connection: Uuid,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

/// Runtime index from user id to that user's live gateway connections.
/// Nothing in here is persisted; a user with several open tabs has
/// several bindings under the same id and all of them receive every
/// event addressed to the user.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    groups: Arc<RwLock<HashMap<i64, Vec<Binding>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn join(
        &self,
        user_id: i64,
        connection: Uuid,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) {
        let mut groups = self.groups.write().await;
        let group = groups.entry(user_id).or_default();
        group.push(Binding { connection, sender });
        trace!(
            "user {} joined as {}, {} connection(s) live",
            user_id,
            connection,
            group.len()
        );
    }

    /// Removes one binding. Idempotent, and safe to call for connections
    /// that never joined (an authentication failure tears down before
    /// join ever runs).
    pub async fn leave(&self, user_id: i64, connection: Uuid) {
        let mut groups = self.groups.write().await;
        if let Some(group) = groups.get_mut(&user_id) {
            group.retain(|b| b.connection != connection);
            if group.is_empty() {
                groups.remove(&user_id);
            }
        }
        trace!("user {} dropped connection {}", user_id, connection);
    }

    /// Delivers an event to every live connection of the user. Returns
    /// how many connections accepted it; zero when the user is offline,
    /// which is fine since the message is already durable by the time
    /// anything is emitted.
    pub async fn emit_to_user(&self, user_id: i64, event: ServerEvent) -> usize {
        let bindings: Vec<Binding> = {
            let groups = self.groups.read().await;
            match groups.get(&user_id) {
                Some(group) => group.clone(),
                None => return 0,
            }
        };
        let mut delivered = 0;
        let mut dead = Vec::new();
        for binding in bindings {
            if binding.sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(binding.connection);
            }
        }
        if !dead.is_empty() {
            // the receiving task is gone but never said goodbye
            let mut groups = self.groups.write().await;
            if let Some(group) = groups.get_mut(&user_id) {
                group.retain(|b| !dead.contains(&b.connection));
                if group.is_empty() {
                    groups.remove(&user_id);
                }
            }
        }
        delivered
    }

    pub async fn connection_count(&self, user_id: i64) -> usize {
        self.groups
            .read()
            .await
            .get(&user_id)
            .map(|g| g.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::ServerEvent;

    fn ack(message_id: i64) -> ServerEvent {
        ServerEvent::Ack {
            client_ref: None,
            message_id,
        }
    }

    #[tokio::test]
    async fn emits_to_every_connection_of_a_user() {
        let registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        registry.join(1, Uuid::new_v4(), tx_a).await;
        registry.join(1, Uuid::new_v4(), tx_b).await;

        assert_eq!(registry.emit_to_user(1, ack(42)).await, 2);
        assert_eq!(rx_a.recv().await, Some(ack(42)));
        assert_eq!(rx_b.recv().await, Some(ack(42)));
    }

    #[tokio::test]
    async fn emit_to_offline_user_is_a_no_op() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.emit_to_user(7, ack(1)).await, 0);
    }

    #[tokio::test]
    async fn leave_is_idempotent_and_safe_without_join() {
        let registry = ConnectionRegistry::new();
        let connection = Uuid::new_v4();
        // never joined
        registry.leave(3, connection).await;

        let (tx, _rx) = mpsc::unbounded_channel();
        registry.join(3, connection, tx).await;
        registry.leave(3, connection).await;
        registry.leave(3, connection).await;
        assert_eq!(registry.connection_count(3).await, 0);
    }

    #[tokio::test]
    async fn leave_only_drops_the_named_connection() {
        let registry = ConnectionRegistry::new();
        let gone = Uuid::new_v4();
        let stays = Uuid::new_v4();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        registry.join(5, gone, tx_a).await;
        registry.join(5, stays, tx_b).await;

        registry.leave(5, gone).await;
        assert_eq!(registry.emit_to_user(5, ack(9)).await, 1);
        assert_eq!(rx_b.recv().await, Some(ack(9)));
    }

    #[tokio::test]
    async fn dead_channels_are_pruned_on_emit() {
        let registry = ConnectionRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.join(9, Uuid::new_v4(), tx).await;
        drop(rx);

        assert_eq!(registry.emit_to_user(9, ack(1)).await, 0);
        assert_eq!(registry.connection_count(9).await, 0);
    }
}
