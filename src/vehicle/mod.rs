// ==============================================================================
// vehicle — CHASSIS + FOUR RAYCAST WHEELS + DRIVETRAIN
// ------------------------------------------------------------------------------
// Per physics tick (after the world step):
//   reset forces -> read pose/velocity -> drift multiplier -> engine
//   -> per-wheel drive/brake request -> wheel forces at contact points
//   -> quadratic drag -> stop detection (BrakeStop / Park)
//
// Axes: Y up, forward = local -Z, sideways (right) = local +X.
// Drivetrain: rear-wheel drive, handbrake locks the rear axle.
// ==============================================================================

pub mod camera;
pub mod engine;
pub mod telemetry;

use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::*;
use tracing::{debug, info};

use crate::controller::ControlledVehicle;
use crate::physics::{ChassisDesc, PhysicsWorld};
use crate::tire::steering::{wheel_angles, SteeringGeometry};
use crate::tire::suspension::GRAVITY;
use crate::wheel::{Wheel, WheelDrive, WheelPosition, WheelTuning};

use camera::ChaseCamera;
use engine::{Engine, EngineInput};
use telemetry::{Telemetry, MPS_TO_MPH};

/// Quadratic drag, N per (m/s)^2.
pub const DRAG: f32 = 0.4257;

/// Forward speed under which braking or the handbrake counts as stopped.
pub const STOP_SPEED: f32 = 0.5;

/// Brake torque relative to what the static tire grip can hold.
pub const BRAKE_FACTOR: f32 = 1.5;

/// Lateral grip left on a locked wheel with no sideways slide.
pub const DRIFT_BASE: f32 = 0.3;

/// Share of the drive torque each driven wheel receives.
pub const TORQUE_SPLIT: f32 = 0.5;

/// Continuous driver inputs for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Controls {
    pub throttle: f32, // 0..1
    pub braking: bool,
}

/// Things the vehicle tells its driver about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleEvent {
    /// Stopped under the foot brake; dropped to neutral.
    BrakeStop,
    /// Stopped with the handbrake held; dropped to neutral.
    Park,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleConfig {
    pub mass: f32,                      // kg
    pub half_extents: [f32; 3],         // chassis box [hx, hy, hz]
    pub wheel_offset: [f32; 3],         // |x| half track, y mount height, |z| half wheelbase
    pub spawn_position: Vector<Real>,
    pub angular_damping: f32,
    pub ackermann: f32,                 // 0 = parallel steer, 1 = full Ackermann
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            mass: 1200.0,
            half_extents: [0.95, 0.5, 2.2],
            wheel_offset: [0.8, -0.3, 1.3],
            spawn_position: vector![0.0, 1.2, 0.0],
            angular_damping: 0.5,
            ackermann: 1.0,
        }
    }
}

impl VehicleConfig {
    pub fn steering_geometry(&self) -> SteeringGeometry {
        let [x, _, z] = self.wheel_offset;
        SteeringGeometry {
            wheelbase: 2.0 * z,
            track_width: 2.0 * x,
            ackermann: self.ackermann,
        }
    }

    pub fn wheel_anchor(&self, position: WheelPosition) -> Vector<Real> {
        let [x, y, z] = self.wheel_offset;
        let x = if position.is_left() { -x } else { x };
        let z = if position.is_front() { -z } else { z };
        vector![x, y, z]
    }
}

/// Lateral grip multiplier for locked wheels: the more the car slides
/// sideways, the more grip comes back.
pub fn drift_control_multiplier(planar_velocity: &Vector<Real>, sideways: &Vector<Real>) -> f32 {
    match planar_velocity.try_normalize(1e-3) {
        Some(dir) => DRIFT_BASE + (1.0 - DRIFT_BASE) * dir.dot(sideways).abs(),
        None => 1.0,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub body: RigidBodyHandle,
    pub config: VehicleConfig,
    pub wheels: Vec<Wheel>,
    pub engine: Engine,
    pub camera: ChaseCamera,

    // mirrored from the rigid body each tick
    pub position: Vector<Real>,
    pub rotation: UnitQuaternion<Real>,
    pub forward: Vector<Real>,
    pub up: Vector<Real>,
    pub sideways: Vector<Real>,
    pub velocity: Vector<Real>,
    pub planar_velocity: Vector<Real>,

    pub drift_multiplier: f32,
    pub steering_angle: f32,
    pub handbraking: bool,
    pub controls: Controls,

    prev_forward_speed: f32,
    respawn_requested: bool,
}

impl Vehicle {
    pub fn new(world: &mut PhysicsWorld, config: VehicleConfig, tuning: WheelTuning) -> Self {
        let body = world.create_chassis(&ChassisDesc {
            half_extents: config.half_extents,
            mass: config.mass,
            translation: config.spawn_position,
            angular_damping: config.angular_damping,
        });

        let wheels = Self::build_wheels(&config, tuning);
        let mut vehicle = Self {
            body,
            config,
            wheels,
            engine: Engine::default(),
            camera: ChaseCamera::behind(Vector::zeros(), -Vector::z()),
            position: Vector::zeros(),
            rotation: UnitQuaternion::identity(),
            forward: -Vector::z(),
            up: Vector::y(),
            sideways: Vector::x(),
            velocity: Vector::zeros(),
            planar_velocity: Vector::zeros(),
            drift_multiplier: 1.0,
            steering_angle: 0.0,
            handbraking: false,
            controls: Controls::default(),
            prev_forward_speed: 0.0,
            respawn_requested: false,
        };
        vehicle.set_default_values();
        vehicle
    }

    fn build_wheels(config: &VehicleConfig, tuning: WheelTuning) -> Vec<Wheel> {
        WheelPosition::ALL
            .iter()
            .map(|&p| Wheel::new(p, config.wheel_anchor(p), tuning))
            .collect()
    }

    /// Reset every dynamic field to its spawn value (the rigid body is untouched).
    pub fn set_default_values(&mut self) {
        let spawn = self.config.spawn_position;

        self.engine = Engine::default();
        self.wheels.iter_mut().for_each(Wheel::reset);
        self.camera = ChaseCamera::behind(spawn, -Vector::z());

        self.position = spawn;
        self.rotation = UnitQuaternion::identity();
        self.forward = -Vector::z();
        self.up = Vector::y();
        self.sideways = Vector::x();
        self.velocity = Vector::zeros();
        self.planar_velocity = Vector::zeros();

        self.drift_multiplier = 1.0;
        self.steering_angle = 0.0;
        self.handbraking = false;
        self.controls = Controls::default();
        self.prev_forward_speed = 0.0;
        self.respawn_requested = false;
    }

    /// Put the car back at its spawn point, at rest, in neutral.
    pub fn respawn(&mut self, world: &mut PhysicsWorld) {
        world.teleport(self.body, self.config.spawn_position, UnitQuaternion::identity());
        self.set_default_values();
        info!(body = ?self.body, "vehicle respawned");
    }

    /// New tuning means new wheels; dynamic wheel state starts over.
    pub fn rebuild_wheels(&mut self, tuning: WheelTuning) {
        self.wheels = Self::build_wheels(&self.config, tuning);
        let angle = self.steering_angle;
        self.update_steering(angle);
        debug!(?tuning, "wheels rebuilt");
    }

    pub fn take_respawn_request(&mut self) -> bool {
        std::mem::take(&mut self.respawn_requested)
    }

    fn read_body(&mut self, body: &RigidBody) {
        self.position = *body.translation();
        self.rotation = *body.rotation();
        self.forward = self.rotation * -Vector::z();
        self.up = self.rotation * Vector::y();
        self.sideways = self.rotation * Vector::x();
        self.velocity = *body.linvel();
        self.planar_velocity = vector![self.velocity.x, 0.0, self.velocity.z];
    }

    /// Mean spin of the driven (rear) wheels.
    fn driven_angular_velocity(&self) -> f32 {
        let (sum, n) = self
            .wheels
            .iter()
            .filter(|w| !w.position.is_front())
            .fold((0.0, 0), |(s, n), w| (s + w.angular_velocity, n + 1));
        if n == 0 {
            0.0
        } else {
            sum / n as f32
        }
    }

    pub fn update_physics(&mut self, world: &mut PhysicsWorld, controls: &Controls, dt: f32) -> Vec<VehicleEvent> {
        self.controls = *controls;
        world.reset_forces(self.body);

        match world.body(self.body) {
            Some(body) => self.read_body(body),
            None => return Vec::new(),
        }

        let forward_speed = self.forward_speed();
        self.drift_multiplier = drift_control_multiplier(&self.planar_velocity, &self.sideways);

        // ------------------------------------------------
        // Engine
        // ------------------------------------------------
        let stationary = self.planar_velocity.norm() < STOP_SPEED;
        let drive_torque = self.engine.update(&EngineInput {
            throttle: controls.throttle,
            driven_angular_velocity: self.driven_angular_velocity(),
            rev_mode: self.engine.gear == 0 || (self.handbraking && stationary),
            braking: controls.braking,
        });

        // ------------------------------------------------
        // Wheels + drag
        // ------------------------------------------------
        self.distribute_forces_to_wheels(world, controls, drive_torque, dt);

        let drag = -self.velocity * self.velocity.norm() * DRAG;
        world.add_force(self.body, drag);

        // ------------------------------------------------
        // Stop detection
        // ------------------------------------------------
        let mut events = Vec::new();
        let crossed_zero = self.prev_forward_speed * forward_speed < 0.0;
        let stopped = forward_speed.abs() < STOP_SPEED || crossed_zero;

        if self.engine.gear != 0 && stopped {
            if controls.braking {
                self.engine.set_gear(0);
                events.push(VehicleEvent::BrakeStop);
            } else if self.handbraking {
                self.engine.set_gear(0);
                events.push(VehicleEvent::Park);
            }
        }
        self.prev_forward_speed = forward_speed;

        events
    }

    pub fn distribute_forces_to_wheels(&mut self, world: &mut PhysicsWorld, controls: &Controls, drive_torque: f32, dt: f32) {
        let mass_share = self.config.mass / self.wheels.len() as f32;
        let throttling = controls.throttle > 0.0 && !controls.braking && drive_torque != 0.0;

        for wheel in &mut self.wheels {
            let driven = !wheel.position.is_front();
            wheel.lock_wheel = self.handbraking && driven;

            let brake_torque = if controls.braking {
                self.config.mass * GRAVITY / 4.0
                    * wheel.tuning.radius
                    * wheel.tuning.curves.longitudinal.static_coef
                    * BRAKE_FACTOR
            } else {
                0.0
            };

            let drive = WheelDrive {
                drive_torque: if driven { drive_torque * TORQUE_SPLIT } else { 0.0 },
                brake_torque,
                throttling: throttling && driven,
                drift_multiplier: self.drift_multiplier,
                mass_share,
            };

            wheel.update_physics(world, self.body, &drive, dt);
            if let Some((force, point)) = wheel.force_application() {
                world.add_force_at_point(self.body, force, point);
            }
        }
    }

    pub fn update_camera(&mut self, dt: f32) {
        self.camera.update(self.position, self.forward, self.velocity, dt);
    }

    pub fn telemetry(&self) -> Telemetry {
        let speed = self.velocity.norm();
        Telemetry {
            gear: self.engine.gear,
            max_gear: self.engine.max_gear,
            rpm: self.engine.rpm,
            speed,
            speed_mph: speed * MPS_TO_MPH,
            throttle: self.controls.throttle,
            steering: self.steering_angle,
            throttle_choke: self.engine.throttle_choke,
            braking: self.controls.braking,
            handbraking: self.handbraking,
            position: self.position.into(),
            rotation: self.rotation.coords.into(),
            camera: self.camera.telemetry(),
            wheels: self.wheels.iter().map(Wheel::telemetry).collect(),
        }
    }
}

impl ControlledVehicle for Vehicle {
    fn gear(&self) -> i8 {
        self.engine.gear
    }

    fn set_gear(&mut self, gear: i8) {
        self.engine.set_gear(gear);
    }

    fn adjust_max_gear(&mut self, delta: i8) {
        self.engine.adjust_max_gear(delta);
    }

    fn speed(&self) -> f32 {
        self.velocity.norm()
    }

    fn planar_speed(&self) -> f32 {
        self.planar_velocity.norm()
    }

    fn forward_speed(&self) -> f32 {
        self.velocity.dot(&self.forward)
    }

    fn update_steering(&mut self, angle: f32) {
        self.steering_angle = angle;
        let (left, right) = wheel_angles(&self.config.steering_geometry(), angle);
        for wheel in &mut self.wheels {
            match wheel.position {
                WheelPosition::FrontLeft => wheel.apply_steering_angle_transform(left),
                WheelPosition::FrontRight => wheel.apply_steering_angle_transform(right),
                _ => {}
            }
        }
    }

    fn update_handbrake(&mut self, engaged: bool) {
        self.handbraking = engaged;
    }

    fn request_respawn(&mut self) {
        self.respawn_requested = true;
    }
}
