use std::sync::Arc;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::error::ServerError;
use crate::game::GameCommand;
use crate::input::KeyEvent;
use crate::state::{ServerMessage, SharedGameState};
use crate::tuning::TuningUpdate;

/// Everything a client may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Key {
        code: String,
        down: bool,
        #[serde(default)]
        repeat: bool,
    },
    Tune {
        tuning: TuningUpdate,
    },
    Ping,
}

impl ClientMessage {
    pub fn from_json(txt: &str) -> Option<Self> {
        match serde_json::from_str(txt) {
            Ok(msg) => Some(msg),
            Err(e) => {
                debug!(error = %e, "unreadable client message");
                None
            }
        }
    }

    /// The simulation side of the message; pings never reach the game.
    pub fn into_command(self) -> Option<GameCommand> {
        match self {
            ClientMessage::Key { code, down, repeat } => Some(GameCommand::Key(KeyEvent { code, down, repeat })),
            ClientMessage::Tune { tuning } => Some(GameCommand::Tune(tuning)),
            ClientMessage::Ping => None,
        }
    }
}

pub async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
        addr: addr.to_string(),
        source,
    })
}

pub async fn start_websocket_server(
    addr: String,
    state: Arc<Mutex<SharedGameState>>,
    commands: mpsc::UnboundedSender<GameCommand>,
) -> Result<(), ServerError> {
    let listener = bind(&addr).await?;
    info!("WebSocket listening on ws://{addr}");
    serve(listener, state, commands).await;
    Ok(())
}

pub async fn serve(
    listener: TcpListener,
    state: Arc<Mutex<SharedGameState>>,
    commands: mpsc::UnboundedSender<GameCommand>,
) {
    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };

        let state_clone = Arc::clone(&state);
        let commands = commands.clone();
        tokio::spawn(async move {
            debug!(%peer, "tcp connection");
            handle_connection(raw, state_clone, commands).await;
        });
    }
}

async fn handle_connection(
    raw: TcpStream,
    state: Arc<Mutex<SharedGameState>>,
    commands: mpsc::UnboundedSender<GameCommand>,
) {
    let ws = match accept_async(raw).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(error = %e, "websocket handshake failed");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) Outgoing channel + registration
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let client_id = state.lock().await.register_client(tx.clone());

    // -------------------------------
    // 2) Send loop
    // -------------------------------
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    info!(%client_id, "client connected");
    if let Some(welcome) = (ServerMessage::Welcome { client_id }).to_json() {
        let _ = tx.send(welcome);
    }

    // -------------------------------
    // 3) Receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(_) => break,
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let Some(parsed) = ClientMessage::from_json(&text) else {
            continue;
        };

        match parsed.into_command() {
            Some(command) => {
                if commands.send(command).is_err() {
                    warn!("game loop gone, closing client");
                    break;
                }
            }
            None => {
                if let Some(pong) = ServerMessage::Pong.to_json() {
                    let _ = tx.send(pong);
                }
            }
        }
    }

    info!(%client_id, "client disconnected");
    state.lock().await.remove_client(&client_id);
}
