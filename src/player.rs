// ==============================================================================
// player.rs — THE DRIVEN CAR AS AN ENTITY
// ------------------------------------------------------------------------------
// Wires the keyboard controller to the vehicle and plugs both into the entity
// phases:
//   input     controller eases its outputs, a pending respawn is served
//   physics   controls -> vehicle tick -> stop events back to the controller
//   movement  chase camera
//   tuning    wheel rebuild / controller rates
// ==============================================================================

use tracing::info;

use crate::controller::{ControllerTuning, PlayerController};
use crate::entity::{Entity, Inputtable, Movable, Physical, Tunable};
use crate::input::KeySignal;
use crate::physics::PhysicsWorld;
use crate::tuning::TuningUpdate;
use crate::vehicle::telemetry::Telemetry;
use crate::vehicle::{Vehicle, VehicleConfig, VehicleEvent};
use crate::wheel::WheelTuning;

pub struct Player {
    pub vehicle: Vehicle,
    pub controller: PlayerController,
}

impl Player {
    pub fn new(world: &mut PhysicsWorld, config: VehicleConfig, wheel: WheelTuning, controller: ControllerTuning) -> Self {
        let vehicle = Vehicle::new(world, config, wheel);
        info!(body = ?vehicle.body, "player spawned");
        Self {
            vehicle,
            controller: PlayerController::new(controller),
        }
    }
}

impl Entity for Player {
    fn name(&self) -> &str {
        "player"
    }

    fn as_inputtable(&mut self) -> Option<&mut dyn Inputtable> {
        Some(self)
    }

    fn as_physical(&mut self) -> Option<&mut dyn Physical> {
        Some(self)
    }

    fn as_movable(&mut self) -> Option<&mut dyn Movable> {
        Some(self)
    }

    fn as_tunable(&mut self) -> Option<&mut dyn Tunable> {
        Some(self)
    }

    fn telemetry(&self) -> Option<Telemetry> {
        Some(self.vehicle.telemetry())
    }
}

impl Inputtable for Player {
    fn handle_inputs(&mut self, signals: &[KeySignal], world: &mut PhysicsWorld) {
        self.controller.handle_inputs(signals, &mut self.vehicle);
        if self.vehicle.take_respawn_request() {
            self.vehicle.respawn(world);
        }
    }
}

impl Physical for Player {
    fn update_physics(&mut self, world: &mut PhysicsWorld, dt: f32) {
        let controls = self.controller.controls();
        for event in self.vehicle.update_physics(world, &controls, dt) {
            match event {
                VehicleEvent::BrakeStop => self.controller.on_brake_stop(&mut self.vehicle),
                VehicleEvent::Park => self.controller.on_park(),
            }
        }
    }
}

impl Movable for Player {
    fn update_movement(&mut self, dt: f32) {
        self.vehicle.update_camera(dt);
    }
}

impl Tunable for Player {
    fn apply_tuning(&mut self, update: &TuningUpdate) {
        if let Some(wheel) = update.wheel {
            self.vehicle.rebuild_wheels(wheel);
        }
        if let Some(controller) = update.controller {
            self.controller.tuning = controller;
        }
    }
}
