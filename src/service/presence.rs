// service/presence.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::dtos::wsdtos::ServerEvent;

/// Tracks live connections per user and fans events out to them.
///
/// Constructed once at startup and injected through AppState; tests can spin
/// up as many independent instances as they like. A user may hold several
/// concurrent connections (multiple devices); each gets its own sender.
/// Fan-out is best-effort: the durable message log is the source of truth
/// and a missed live event is reconciled via history pagination.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections: RwLock<HashMap<Uuid, HashMap<u64, mpsc::UnboundedSender<ServerEvent>>>>,
    next_conn_id: AtomicU64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns its id for later removal.
    pub async fn connect(&self, user_id: Uuid, sender: mpsc::UnboundedSender<ServerEvent>) -> u64 {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let mut connections = self.connections.write().await;
        connections.entry(user_id).or_default().insert(conn_id, sender);
        conn_id
    }

    /// Removes one connection and prunes the user entry when it was the last.
    pub async fn disconnect(&self, user_id: Uuid, conn_id: u64) {
        let mut connections = self.connections.write().await;
        if let Some(user_conns) = connections.get_mut(&user_id) {
            user_conns.remove(&conn_id);
            if user_conns.is_empty() {
                connections.remove(&user_id);
            }
        }
    }

    /// Delivers the event to every live connection of the user. A closed
    /// channel is ignored; it is reaped on disconnect.
    pub async fn send_to_user(&self, user_id: Uuid, event: ServerEvent) {
        let connections = self.connections.read().await;
        if let Some(user_conns) = connections.get(&user_id) {
            for sender in user_conns.values() {
                let _ = sender.send(event.clone());
            }
        }
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.connections.read().await.contains_key(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typing_event() -> ServerEvent {
        ServerEvent::Typing {
            chat_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn fan_out_reaches_every_connection_of_the_user() {
        let manager = ConnectionManager::new();
        let user = Uuid::new_v4();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        manager.connect(user, tx1).await;
        manager.connect(user, tx2).await;

        manager.send_to_user(user, typing_event()).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn send_to_offline_user_is_a_noop() {
        let manager = ConnectionManager::new();
        // Must not panic or error.
        manager.send_to_user(Uuid::new_v4(), typing_event()).await;
    }

    #[tokio::test]
    async fn disconnect_removes_only_the_given_connection() {
        let manager = ConnectionManager::new();
        let user = Uuid::new_v4();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let conn1 = manager.connect(user, tx1).await;
        let _conn2 = manager.connect(user, tx2).await;

        manager.disconnect(user, conn1).await;
        assert!(manager.is_online(user).await);

        manager.send_to_user(user, typing_event()).await;
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn last_disconnect_prunes_the_user_entry() {
        let manager = ConnectionManager::new();
        let user = Uuid::new_v4();

        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = manager.connect(user, tx).await;
        assert!(manager.is_online(user).await);

        manager.disconnect(user, conn).await;
        assert!(!manager.is_online(user).await);
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_break_fan_out_to_others() {
        let manager = ConnectionManager::new();
        let user = Uuid::new_v4();

        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        manager.connect(user, tx1).await;
        manager.connect(user, tx2).await;
        drop(rx1);

        manager.send_to_user(user, typing_event()).await;
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn users_are_independent() {
        let manager = ConnectionManager::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        manager.connect(alice, tx_a).await;
        manager.connect(bob, tx_b).await;

        manager.send_to_user(alice, typing_event()).await;
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }
}
