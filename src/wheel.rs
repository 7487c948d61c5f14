// ==============================================================================
// wheel.rs — ONE RAYCAST WHEEL (SUSPENSION + TIRE FORCE)
// ------------------------------------------------------------------------------
// Per tick:
// 1) rebuild the world-space anchor and wheel basis from the chassis pose
//    (front wheels add their steering rotation about the chassis up axis)
// 2) cast a ray from the anchor along -up, length = rest_length + radius,
//    ignoring the chassis itself
// 3) spring/damper load from the compression (tire::suspension)
// 4) slip + friction + friction circle + wheel spin (tire::traction)
// 5) store the world-space force and the point to apply it at
//
// The wheel only READS the physics world; the vehicle applies the force.
// ==============================================================================

use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::physics::PhysicsWorld;
use crate::tire::suspension::{suspension_force, suspension_from_sag};
use crate::tire::{solve_traction, SlipRegime, TireCurves, TractionInput};
use crate::vehicle::telemetry::WheelTelemetry;

/// Static per-wheel constants. Changing any of them rebuilds the wheels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelTuning {
    pub radius: f32,           // m
    pub width: f32,            // m (reported only)
    pub rest_length: f32,      // m, suspension travel at full extension
    pub spring_constant: f32,  // N/m
    pub damping_constant: f32, // N*s/m
    pub inertia: f32,          // kg*m^2 around the axle
    pub curves: TireCurves,
}

impl Default for WheelTuning {
    fn default() -> Self {
        // 1200 kg car on four wheels, 10 cm static sag, half-critical damping
        let (spring_constant, damping_constant) = suspension_from_sag(300.0, 0.1, 0.5);
        Self {
            radius: 0.35,
            width: 0.25,
            rest_length: 0.4,
            spring_constant,
            damping_constant,
            inertia: 1.2,
            curves: TireCurves::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WheelPosition {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl WheelPosition {
    pub const ALL: [WheelPosition; 4] = [
        WheelPosition::FrontLeft,
        WheelPosition::FrontRight,
        WheelPosition::RearLeft,
        WheelPosition::RearRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WheelPosition::FrontLeft => "front_left",
            WheelPosition::FrontRight => "front_right",
            WheelPosition::RearLeft => "rear_left",
            WheelPosition::RearRight => "rear_right",
        }
    }

    #[inline]
    pub fn is_front(&self) -> bool {
        matches!(self, WheelPosition::FrontLeft | WheelPosition::FrontRight)
    }

    #[inline]
    pub fn is_left(&self) -> bool {
        matches!(self, WheelPosition::FrontLeft | WheelPosition::RearLeft)
    }
}

/// What the drivetrain asks of one wheel this tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct WheelDrive {
    pub drive_torque: f32,     // N*m along the wheel forward axis
    pub brake_torque: f32,     // N*m, magnitude
    pub throttling: bool,
    pub drift_multiplier: f32, // lateral grip scale while locked
    pub mass_share: f32,       // kg of chassis carried by this wheel
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelContact {
    pub point: Point<Real>,
    pub normal: Vector<Real>,
    pub distance: f32,             // ray time of impact from the anchor
    pub velocity: Vector<Real>,    // chassis velocity at the contact point
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wheel {
    pub position: WheelPosition,
    pub anchor: Vector<Real>, // car-local mount point
    pub tuning: WheelTuning,

    pub steer_angle: f32,
    steer_rotation: UnitQuaternion<Real>,

    // world space, rebuilt every tick
    pub anchor_ws: Point<Real>,
    pub up_ws: Vector<Real>,
    pub forward_ws: Vector<Real>,
    pub sideways_ws: Vector<Real>,

    pub suspension_length: f32,
    pub suspension_force: f32,
    pub angular_velocity: f32, // rad/s, positive rolls forward
    pub lock_wheel: bool,
    pub slip_ratio: f32,
    pub slip_angle: f32,
    pub regime: SlipRegime,
    pub contact: Option<WheelContact>,
    pub force: Vector<Real>, // total world-space force this tick
}

impl Wheel {
    pub fn new(position: WheelPosition, anchor: Vector<Real>, tuning: WheelTuning) -> Self {
        Self {
            position,
            anchor,
            tuning,
            steer_angle: 0.0,
            steer_rotation: UnitQuaternion::identity(),
            anchor_ws: Point::from(anchor),
            up_ws: Vector::y(),
            forward_ws: -Vector::z(),
            sideways_ws: Vector::x(),
            suspension_length: tuning.rest_length,
            suspension_force: 0.0,
            angular_velocity: 0.0,
            lock_wheel: false,
            slip_ratio: 0.0,
            slip_angle: 0.0,
            regime: SlipRegime::FreeRolling,
            contact: None,
            force: Vector::zeros(),
        }
    }

    /// Back to the freshly-built state (keeps anchor and tuning).
    pub fn reset(&mut self) {
        *self = Self::new(self.position, self.anchor, self.tuning);
    }

    #[inline]
    pub fn is_in_contact(&self) -> bool {
        self.contact.is_some()
    }

    /// Rotate the wheel's local forward/sideways axes by `angle` (positive turns
    /// right). Rear wheels always keep the identity rotation.
    pub fn apply_steering_angle_transform(&mut self, angle: f32) {
        if !self.position.is_front() {
            return;
        }
        self.steer_angle = angle;
        // +Y rotation swings -Z toward -X (left), so a right turn is negative
        self.steer_rotation = UnitQuaternion::from_axis_angle(&Vector::y_axis(), -angle);
    }

    fn clear_contact(&mut self) {
        self.contact = None;
        self.suspension_length = self.tuning.rest_length;
        self.suspension_force = 0.0;
        self.slip_ratio = 0.0;
        self.slip_angle = 0.0;
        self.force = Vector::zeros();
    }

    /// Spin an airborne wheel: brakes and locks stop it, the drivetrain turns it.
    fn spin_free(&mut self, drive: &WheelDrive, dt: f32) {
        if self.lock_wheel {
            self.angular_velocity = 0.0;
        } else if drive.brake_torque > 0.0 {
            let step = (drive.brake_torque / self.tuning.inertia * dt).min(self.angular_velocity.abs());
            self.angular_velocity -= self.angular_velocity.signum() * step;
        } else {
            self.angular_velocity += drive.drive_torque / self.tuning.inertia * dt;
        }
    }

    pub fn update_physics(&mut self, world: &PhysicsWorld, chassis: RigidBodyHandle, drive: &WheelDrive, dt: f32) {
        let Some(body) = world.body(chassis) else {
            self.clear_contact();
            return;
        };

        // ------------------------------------------------
        // 1) World-space anchor + basis
        // ------------------------------------------------
        let pose = body.position();
        let wheel_rot = pose.rotation * self.steer_rotation;

        self.anchor_ws = pose * Point::from(self.anchor);
        self.up_ws = pose.rotation * Vector::y();
        self.forward_ws = wheel_rot * -Vector::z();
        self.sideways_ws = wheel_rot * Vector::x();

        // ------------------------------------------------
        // 2) Ray cast
        // ------------------------------------------------
        let reach = self.tuning.rest_length + self.tuning.radius;
        let hit = match world.cast_ray(self.anchor_ws, -self.up_ws, reach, Some(chassis)) {
            Some(hit) if hit.body == Some(chassis) => {
                warn!(wheel = self.position.as_str(), "suspension ray hit its own chassis");
                None
            }
            other => other,
        };

        let Some(hit) = hit else {
            self.clear_contact();
            self.spin_free(drive, dt);
            return;
        };

        let velocity = world.velocity_at_point(chassis, &hit.point);
        self.contact = Some(WheelContact {
            point: hit.point,
            normal: hit.normal,
            distance: hit.toi,
            velocity,
        });

        // ------------------------------------------------
        // 3) Suspension
        // ------------------------------------------------
        self.suspension_length = (hit.toi - self.tuning.radius).clamp(0.0, self.tuning.rest_length);
        let compression = self.tuning.rest_length - self.suspension_length;
        let alignment = hit.normal.dot(&self.up_ws).max(0.0);

        self.suspension_force = suspension_force(
            compression,
            alignment,
            self.up_ws.dot(&velocity),
            self.tuning.spring_constant,
            self.tuning.damping_constant,
        );

        // ------------------------------------------------
        // 4) Tire
        // ------------------------------------------------
        let traction = solve_traction(
            &self.tuning.curves,
            &TractionInput {
                load: self.suspension_force,
                forward_velocity: self.forward_ws.dot(&velocity),
                sideways_velocity: self.sideways_ws.dot(&velocity),
                angular_velocity: self.angular_velocity,
                radius: self.tuning.radius,
                inertia: self.tuning.inertia,
                mass_share: drive.mass_share,
                drive_torque: drive.drive_torque,
                brake_torque: drive.brake_torque,
                throttling: drive.throttling,
                lock: self.lock_wheel.then_some(drive.drift_multiplier),
                dt,
            },
        );

        self.regime = traction.regime;
        self.slip_ratio = traction.slip_ratio;
        self.slip_angle = traction.slip_angle;
        self.angular_velocity = traction.angular_velocity;

        // ------------------------------------------------
        // 5) Output
        // ------------------------------------------------
        self.force = self.up_ws * self.suspension_force
            + self.forward_ws * traction.longitudinal
            + self.sideways_ws * traction.lateral;
    }

    /// Force and application point, when the wheel touches the ground.
    pub fn force_application(&self) -> Option<(Vector<Real>, Point<Real>)> {
        self.contact.map(|c| (self.force, c.point))
    }

    /// Longitudinal and lateral tire force this tick (wheel basis).
    pub fn tire_forces(&self) -> (f32, f32) {
        (self.force.dot(&self.forward_ws), self.force.dot(&self.sideways_ws))
    }

    pub fn telemetry(&self) -> WheelTelemetry {
        WheelTelemetry {
            id: self.position,
            in_contact: self.is_in_contact(),
            suspension_length: self.suspension_length,
            suspension_force: self.suspension_force,
            slip_ratio: self.slip_ratio,
            slip_angle: self.slip_angle,
            angular_velocity: self.angular_velocity,
            steer_angle: self.steer_angle,
            locked: self.lock_wheel,
            force: self.force.into(),
            contact_point: self.contact.map(|c| c.point.coords.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::ChassisDesc;

    fn world_with_chassis(height: f32) -> (PhysicsWorld, RigidBodyHandle) {
        let mut world = PhysicsWorld::new();
        let chassis = world.create_chassis(&ChassisDesc {
            half_extents: [0.95, 0.5, 2.2],
            mass: 1200.0,
            translation: vector![0.0, height, 0.0],
            angular_damping: 0.5,
        });
        (world, chassis)
    }

    fn drive() -> WheelDrive {
        WheelDrive { drift_multiplier: 1.0, mass_share: 300.0, ..Default::default() }
    }

    #[test]
    fn wheel_out_of_reach_rests_at_full_length() {
        let (world, chassis) = world_with_chassis(5.0);
        let mut wheel = Wheel::new(WheelPosition::RearLeft, vector![-0.8, -0.3, 1.3], WheelTuning::default());
        wheel.suspension_length = 0.1;

        wheel.update_physics(&world, chassis, &drive(), 1.0 / 60.0);

        assert!(!wheel.is_in_contact());
        assert_eq!(wheel.suspension_length, wheel.tuning.rest_length);
        assert_eq!(wheel.force, Vector::zeros());
    }

    #[test]
    fn compressed_wheel_pushes_chassis_up() {
        // anchor at 0.95 - 0.3 = 0.65 => 0.30 m of travel left => 0.10 m compression
        let (world, chassis) = world_with_chassis(0.95);
        let mut wheel = Wheel::new(WheelPosition::FrontLeft, vector![-0.8, -0.3, -1.3], WheelTuning::default());

        wheel.update_physics(&world, chassis, &drive(), 1.0 / 60.0);

        assert!(wheel.is_in_contact());
        assert!((wheel.suspension_length - 0.3).abs() < 1e-3);
        assert!((wheel.suspension_force - 300.0 * 9.81).abs() < 5.0);
        assert!(wheel.force.y > 0.0);
        assert!(wheel.suspension_length <= wheel.tuning.rest_length);
    }

    #[test]
    fn steering_only_rotates_front_wheels() {
        let mut front = Wheel::new(WheelPosition::FrontRight, vector![0.8, -0.3, -1.3], WheelTuning::default());
        let mut rear = Wheel::new(WheelPosition::RearRight, vector![0.8, -0.3, 1.3], WheelTuning::default());

        front.apply_steering_angle_transform(0.3);
        rear.apply_steering_angle_transform(0.3);

        let (world, chassis) = world_with_chassis(0.95);
        front.update_physics(&world, chassis, &drive(), 1.0 / 60.0);
        rear.update_physics(&world, chassis, &drive(), 1.0 / 60.0);

        // right turn swings the forward axis toward +X
        assert!(front.forward_ws.x > 0.2);
        assert!((rear.forward_ws - (-Vector::z())).norm() < 1e-5);
        assert_eq!(rear.steer_angle, 0.0);
    }

    #[test]
    fn reset_restores_fresh_wheel() {
        let fresh = Wheel::new(WheelPosition::RearLeft, vector![-0.8, -0.3, 1.3], WheelTuning::default());
        let mut wheel = fresh.clone();
        wheel.angular_velocity = 42.0;
        wheel.lock_wheel = true;
        wheel.suspension_length = 0.05;
        wheel.reset();
        assert_eq!(wheel, fresh);
    }
}
