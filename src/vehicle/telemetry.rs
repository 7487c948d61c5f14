// Serializable per-tick snapshot of the car, sent to the front-end (HUD, debug panel).

use serde::Serialize;

use crate::wheel::WheelPosition;

pub const MPS_TO_MPH: f32 = 2.236_936;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Telemetry {
    pub gear: i8,
    pub max_gear: i8,
    pub rpm: f32,
    pub speed: f32,     // m/s
    pub speed_mph: f32,
    pub throttle: f32,
    pub steering: f32,
    pub throttle_choke: f32,
    pub braking: bool,
    pub handbraking: bool,
    pub position: [f32; 3],
    pub rotation: [f32; 4], // quaternion (x, y, z, w)
    pub camera: CameraTelemetry,
    pub wheels: Vec<WheelTelemetry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraTelemetry {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WheelTelemetry {
    pub id: WheelPosition,
    pub in_contact: bool,
    pub suspension_length: f32,
    pub suspension_force: f32,
    pub slip_ratio: f32,
    pub slip_angle: f32,
    pub angular_velocity: f32,
    pub steer_angle: f32,
    pub locked: bool,
    pub force: [f32; 3],
    pub contact_point: Option<[f32; 3]>,
}
