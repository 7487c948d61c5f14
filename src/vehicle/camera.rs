// ==============================================================================
// camera.rs — CHASE CAMERA
// ------------------------------------------------------------------------------
// Desired position blends "behind the car" with "behind the velocity vector"
// by speed, so at low speed the camera sits behind the bonnet and at high
// speed it trails the slide. FOV kicks with acceleration and eases back.
// ==============================================================================

use rapier3d::prelude::*;

use crate::vehicle::telemetry::CameraTelemetry;

pub const BASE_FOV: f32 = 75.0;          // degrees
pub const CAMERA_DISTANCE: f32 = 8.0;    // m behind
pub const CAMERA_HEIGHT: f32 = 3.0;      // m above
pub const BLEND_FULL_SPEED: f32 = 20.0;  // m/s where the camera fully follows velocity
pub const FOLLOW_RATE: f32 = 0.15;
pub const FOV_PER_ACCELERATION: f32 = 0.8; // degrees per m/s^2
pub const MAX_FOV_DELTA: f32 = 10.0;
pub const FOV_EASE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChaseCamera {
    pub position: Vector<Real>,
    pub target: Vector<Real>,
    pub fov: f32,
    prev_speed: f32,
}

impl ChaseCamera {
    /// Camera snapped directly behind a car at `car_position` facing `forward`.
    pub fn behind(car_position: Vector<Real>, forward: Vector<Real>) -> Self {
        Self {
            position: car_position - forward * CAMERA_DISTANCE + Vector::y() * CAMERA_HEIGHT,
            target: car_position,
            fov: BASE_FOV,
            prev_speed: 0.0,
        }
    }

    pub fn update(&mut self, car_position: Vector<Real>, forward: Vector<Real>, velocity: Vector<Real>, dt: f32) {
        let planar = vector![velocity.x, 0.0, velocity.z];
        let speed = planar.norm();

        let behind_car = car_position - forward * CAMERA_DISTANCE;
        let behind_velocity = match planar.try_normalize(1e-3) {
            Some(dir) => car_position - dir * CAMERA_DISTANCE,
            None => behind_car,
        };

        let blend = (speed / BLEND_FULL_SPEED).clamp(0.0, 1.0);
        let desired = behind_car.lerp(&behind_velocity, blend) + Vector::y() * CAMERA_HEIGHT;

        self.position += (desired - self.position) * FOLLOW_RATE;
        self.target = car_position;

        let acceleration = if dt > 0.0 { (speed - self.prev_speed) / dt } else { 0.0 };
        let goal = BASE_FOV + (acceleration * FOV_PER_ACCELERATION).clamp(-MAX_FOV_DELTA, MAX_FOV_DELTA);
        self.fov += (goal - self.fov) * FOV_EASE;
        self.prev_speed = speed;
    }

    pub fn telemetry(&self) -> CameraTelemetry {
        CameraTelemetry {
            position: self.position.into(),
            target: self.target.into(),
            fov: self.fov,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn parked_camera_sits_behind_the_car() {
        let forward = -Vector::z();
        let mut camera = ChaseCamera::behind(Vector::zeros(), forward);
        for _ in 0..100 {
            camera.update(Vector::zeros(), forward, Vector::zeros(), DT);
        }
        assert!((camera.position - vector![0.0, CAMERA_HEIGHT, CAMERA_DISTANCE]).norm() < 1e-3);
        assert!((camera.fov - BASE_FOV).abs() < 1e-3);
    }

    #[test]
    fn fast_slide_follows_velocity() {
        // car points -Z but slides along +X
        let forward = -Vector::z();
        let velocity = vector![30.0, 0.0, 0.0];
        let mut camera = ChaseCamera::behind(Vector::zeros(), forward);
        camera.prev_speed = 30.0;
        for _ in 0..200 {
            camera.update(Vector::zeros(), forward, velocity, DT);
        }
        assert!(camera.position.x < -CAMERA_DISTANCE + 0.1);
        assert!(camera.position.z.abs() < 0.1);
    }

    #[test]
    fn fov_kick_is_bounded() {
        let forward = -Vector::z();
        let mut camera = ChaseCamera::behind(Vector::zeros(), forward);
        for i in 0..200 {
            // absurd acceleration every tick
            camera.update(Vector::zeros(), forward, vector![0.0, 0.0, -(i as f32) * 10.0], DT);
            assert!(camera.fov <= BASE_FOV + MAX_FOV_DELTA + 1e-3);
        }
        assert!(camera.fov > BASE_FOV);
    }
}
