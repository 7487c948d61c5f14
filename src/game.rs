// ==============================================================================
// game.rs — THE SIMULATION LOOP BODY
// ------------------------------------------------------------------------------
// Owns the physics world, the entities and the pending input queue. The
// server task never touches any of it; everything arrives as a GameCommand
// drained at the top of each tick.
//
// tick():
//   route inputs (Escape toggles pause)
//   paused  -> nothing else runs; releases of delivered keys wait for resume
//   running -> entity input -> admission/removal -> world step + physics
//              -> movement
// ==============================================================================

use std::collections::HashSet;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::entity::{EntityId, EntityManager};
use crate::input::{InputQueue, KeyCode, KeyEvent, KeySignal};
use crate::physics::PhysicsWorld;
use crate::player::Player;
use crate::terrain::{HeightfieldData, Terrain};
use crate::tuning::TuningUpdate;
use crate::vehicle::telemetry::Telemetry;
use crate::vehicle::VehicleConfig;

#[derive(Debug, Clone)]
pub enum GameCommand {
    Key(KeyEvent),
    Tune(TuningUpdate),
    AssetReady(HeightfieldData),
}

/// Per-tick state sent to every client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub paused: bool,
    pub vehicle: Option<Telemetry>,
}

pub struct Game {
    pub world: PhysicsWorld,
    pub entities: EntityManager,
    pub inputs: InputQueue,
    pub player: EntityId,
    pub paused: bool,
    pub tick: u64,
    dt: f32,
    held: HashSet<KeyCode>,   // presses delivered to the entities, not yet released
    deferred: Vec<KeySignal>, // releases of held keys seen while paused
}

impl Game {
    pub fn new(config: &GameConfig) -> Self {
        let dt = config.tick_dt();
        let mut world = PhysicsWorld::new();
        world.dt = dt;

        let mut entities = EntityManager::new();
        let player = Player::new(&mut world, VehicleConfig::default(), config.wheel, config.controller);
        let player = entities.add_entity(Box::new(player));

        info!(dt, "game created");
        Self {
            world,
            entities,
            inputs: InputQueue::new(),
            player,
            paused: false,
            tick: 0,
            dt,
            held: HashSet::new(),
            deferred: Vec::new(),
        }
    }

    pub fn apply_command(&mut self, command: GameCommand) {
        match command {
            GameCommand::Key(event) => {
                if let Err(e) = self.inputs.push_event(&event) {
                    debug!(error = %e, "key ignored");
                }
            }
            GameCommand::Tune(update) => {
                if update.is_empty() {
                    return;
                }
                self.entities.apply_tuning(&update);
                info!(?update, "tuning applied");
            }
            GameCommand::AssetReady(data) => {
                let terrain = Terrain::spawn(&mut self.world, &data);
                self.entities.add_entity(Box::new(terrain));
            }
        }
    }

    /// Apply every command queued since the last call.
    pub fn drain(&mut self, rx: &mut UnboundedReceiver<GameCommand>) {
        while let Ok(command) = rx.try_recv() {
            self.apply_command(command);
        }
    }

    /// Split this tick's signals between the pause toggle and the entities.
    /// Presses made while paused are dropped. A release only reaches the
    /// entities if its press did; while paused it waits for resume so no key
    /// stays held.
    fn route_inputs(&mut self) -> Vec<KeySignal> {
        let batch = self.inputs.pending().to_vec();
        self.inputs.flush();
        let mut live = Vec::new();

        for signal in batch {
            match signal {
                KeySignal { code: KeyCode::Escape, pressed: true } => {
                    self.paused = !self.paused;
                    info!(paused = self.paused, tick = self.tick, "pause toggled");
                    if self.paused {
                        self.suspend(&mut live);
                    } else {
                        live.append(&mut self.deferred);
                    }
                }
                KeySignal { code: KeyCode::Escape, .. } => {}
                KeySignal { code, pressed: true } => {
                    if !self.paused && self.held.insert(code) {
                        live.push(signal);
                    }
                }
                KeySignal { code, pressed: false } => {
                    if !self.held.remove(&code) {
                        continue;
                    }
                    if self.paused {
                        self.deferred.push(signal);
                    } else {
                        live.push(signal);
                    }
                }
            }
        }
        live
    }

    /// Pause hit mid-batch: signals routed so far never reach the entities.
    /// Their presses are forgotten, releases of keys held before the batch
    /// wait for resume.
    fn suspend(&mut self, live: &mut Vec<KeySignal>) {
        let mut dropped = HashSet::new();
        for signal in live.drain(..) {
            if signal.pressed {
                self.held.remove(&signal.code);
                dropped.insert(signal.code);
            } else if !dropped.contains(&signal.code) {
                self.deferred.push(signal);
            }
        }
    }

    pub fn tick(&mut self) {
        let signals = self.route_inputs();
        if self.paused {
            return;
        }

        self.entities.handle_inputs(&signals, &mut self.world);
        self.entities.update_entities();
        self.entities.update_physics(&mut self.world, self.dt);
        self.entities.update_movement(self.dt);
        self.tick += 1;

        if self.tick % 600 == 0 && self.entities.telemetry().is_none() {
            warn!(tick = self.tick, "no entity reports telemetry");
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            paused: self.paused,
            vehicle: self.entities.telemetry(),
        }
    }
}
