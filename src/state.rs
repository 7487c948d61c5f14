use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::game::Snapshot;

/// Everything the server sends down a socket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Welcome { client_id: Uuid },
    Pong,
    Snapshot(Snapshot),
}

impl ServerMessage {
    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!(error = %e, "failed to encode server message");
                None
            }
        }
    }
}

/// Connected clients, shared between the socket tasks and the game loop.
#[derive(Default)]
pub struct SharedGameState {
    pub tick: u64,
    pub clients: HashMap<Uuid, UnboundedSender<String>>,
}

impl SharedGameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_client(&mut self, tx: UnboundedSender<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.clients.insert(id, tx);
        debug!(%id, clients = self.clients.len(), "client registered");
        id
    }

    pub fn remove_client(&mut self, id: &Uuid) {
        if self.clients.remove(id).is_some() {
            debug!(%id, clients = self.clients.len(), "client removed");
        }
    }

    /// Send to every client; clients whose send loop is gone are dropped.
    pub fn broadcast(&mut self, message: &ServerMessage) {
        let Some(json) = message.to_json() else {
            return;
        };

        self.clients.retain(|id, tx| {
            let open = tx.send(json.clone()).is_ok();
            if !open {
                debug!(%id, "dropping closed client");
            }
            open
        });
    }

    /// Record the tick and broadcast its snapshot.
    pub fn broadcast_snapshot(&mut self, snapshot: Snapshot) {
        self.tick = snapshot.tick;
        self.broadcast(&ServerMessage::Snapshot(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn messages_are_tagged_by_type() {
        assert_eq!(ServerMessage::Pong.to_json().as_deref(), Some(r#"{"type":"pong"}"#));

        let id = Uuid::nil();
        let json = ServerMessage::Welcome { client_id: id }.to_json().expect("json");
        assert_eq!(json, format!(r#"{{"type":"welcome","client_id":"{id}"}}"#));

        let snapshot = Snapshot { tick: 7, paused: true, vehicle: None };
        let json = ServerMessage::Snapshot(snapshot).to_json().expect("json");
        assert_eq!(json, r#"{"type":"snapshot","tick":7,"paused":true,"vehicle":null}"#);
    }

    #[test]
    fn broadcast_reaches_clients_and_prunes_closed_ones() {
        let mut state = SharedGameState::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        state.register_client(tx_a);
        state.register_client(tx_b);
        drop(rx_b);

        state.broadcast_snapshot(Snapshot { tick: 3, paused: false, vehicle: None });

        assert_eq!(state.tick, 3);
        assert_eq!(state.clients.len(), 1);
        let msg = rx_a.try_recv().expect("snapshot delivered");
        assert!(msg.contains(r#""tick":3"#));
    }

    #[test]
    fn removed_clients_get_nothing() {
        let mut state = SharedGameState::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = state.register_client(tx);
        state.remove_client(&id);

        state.broadcast(&ServerMessage::Pong);
        assert!(state.clients.is_empty());
        assert!(rx.try_recv().is_err());
    }
}
