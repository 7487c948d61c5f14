use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

use drift_server::config::{CliArgs, GameConfig};
use drift_server::game::{Game, GameCommand};
use drift_server::logging::init_logging;
use drift_server::net::start_websocket_server;
use drift_server::state::SharedGameState;
use drift_server::terrain::load_heightfield;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    let config = match GameConfig::resolve(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("drift-server: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config);
    info!(bind = %config.server.bind, tick_hz = config.server.tick_hz, "starting drift server");

    let state = Arc::new(Mutex::new(SharedGameState::new()));
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<GameCommand>();

    // Start WebSocket server
    let server = tokio::spawn(start_websocket_server(
        config.server.bind.clone(),
        Arc::clone(&state),
        cmd_tx.clone(),
    ));

    // Terrain arrives whenever it is ready; the flat ground covers until then
    if let Some(path) = config.terrain.heightmap.clone() {
        let tx = cmd_tx.clone();
        tokio::spawn(async move {
            match load_heightfield(&path).await {
                Ok(data) => {
                    let _ = tx.send(GameCommand::AssetReady(data));
                }
                Err(e) => warn!(error = %e, "terrain unavailable"),
            }
        });
    }

    let mut game = Game::new(&config);
    let mut ticker = interval(Duration::from_secs_f32(config.tick_dt()));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        if server.is_finished() {
            match server.await {
                Ok(Err(e)) => error!(error = %e, "websocket server stopped"),
                Ok(Ok(())) => error!("websocket server exited"),
                Err(e) => error!(error = %e, "websocket server task failed"),
            }
            return ExitCode::FAILURE;
        }

        game.drain(&mut cmd_rx);
        game.tick();

        state.lock().await.broadcast_snapshot(game.snapshot());
    }
}
