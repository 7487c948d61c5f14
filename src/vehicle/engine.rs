// ==============================================================================
// engine.rs — ENGINE RPM, TORQUE CURVE AND AUTOMATIC GEARBOX
// ------------------------------------------------------------------------------
// Two RPM regimes:
//   rev mode   (neutral, or handbrake held at a standstill): RPM chases a
//              synthetic rev curve, fast toward redline under throttle and
//              slowly back to idle without it. No torque reaches the wheels.
//   in gear    RPM chases |ω_driven| * |ratio| * diff * 30/π, floored at idle.
//
// Gears 2+ auto-shift on RPM thresholds and recompute RPM from the new ratio
// immediately. At max_gear the rev limiter is a throttle choke that fades
// torque out across REDLINE_ALLOWANCE above SHIFT_RPM.
// ==============================================================================

use std::f32::consts::PI;

use tracing::{debug, warn};

pub const IDLE_RPM: f32 = 900.0;
pub const MIN_RPM: f32 = 3000.0;
pub const SHIFT_RPM: f32 = 6500.0;
pub const REDLINE_ALLOWANCE: f32 = 500.0;
pub const REDLINE_RPM: f32 = SHIFT_RPM + REDLINE_ALLOWANCE;

pub const DIFFERENTIAL_RATIO: f32 = 3.42;
pub const TOP_GEAR: i8 = 5;

pub const PEAK_TORQUE: f32 = 320.0;     // N*m at the crank
pub const PEAK_TORQUE_RPM: f32 = 4500.0;
pub const TORQUE_FALLOFF: f32 = 1.2e-5; // N*m per rpm^2 away from the peak
pub const ENGINE_BRAKE_TORQUE: f32 = 60.0;

pub const REV_UP_RATE: f32 = 0.05;
pub const REV_DOWN_RATE: f32 = 0.02;
pub const RPM_SMOOTHING: f32 = 0.5;

const RAD_PER_SEC_TO_RPM: f32 = 30.0 / PI;

/// Fixed gear -> ratio table. Reverse is negative, neutral is zero.
pub struct Gearbox;

impl Gearbox {
    pub const GEARS: [(i8, f32); 7] = [
        (-1, -3.5),
        (0, 0.0),
        (1, 3.6),
        (2, 2.1),
        (3, 1.4),
        (4, 1.0),
        (5, 0.8),
    ];

    pub fn ratio(gear: i8) -> Option<f32> {
        Self::GEARS.iter().find(|(g, _)| *g == gear).map(|(_, r)| *r)
    }
}

/// Downward parabola peaking at PEAK_TORQUE_RPM.
pub fn max_torque_from_rpm(rpm: f32) -> f32 {
    let d = rpm - PEAK_TORQUE_RPM;
    (PEAK_TORQUE - TORQUE_FALLOFF * d * d).max(0.0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineInput {
    pub throttle: f32,               // 0..1
    pub driven_angular_velocity: f32, // mean ω of the driven wheels, rad/s
    pub rev_mode: bool,
    pub braking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Engine {
    pub rpm: f32,
    pub gear: i8,
    pub max_gear: i8,
    pub gear_ratio: f32,
    pub engine_torque: f32, // crank torque this tick (negative = engine braking)
    pub throttle_choke: f32,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            rpm: IDLE_RPM,
            gear: 0,
            max_gear: TOP_GEAR,
            gear_ratio: 0.0,
            engine_torque: 0.0,
            throttle_choke: 1.0,
        }
    }
}

impl Engine {
    /// Switch gear; gears missing from the gearbox are logged and ignored.
    pub fn set_gear(&mut self, gear: i8) -> bool {
        match Gearbox::ratio(gear) {
            Some(ratio) => {
                self.gear = gear;
                self.gear_ratio = ratio;
                true
            }
            None => {
                warn!(gear, "ignoring shift into a gear the gearbox does not have");
                false
            }
        }
    }

    /// Move the highest automatic gear by `delta` (clamped to 1..=TOP_GEAR).
    /// A forward gear above the new limit drops to it right away.
    pub fn adjust_max_gear(&mut self, delta: i8) {
        self.max_gear = self.max_gear.saturating_add(delta).clamp(1, TOP_GEAR);
        if self.gear > self.max_gear {
            self.set_gear(self.max_gear);
        }
        debug!(max_gear = self.max_gear, gear = self.gear, "max gear adjusted");
    }

    #[inline]
    fn wheel_rpm(&self, angular_velocity: f32) -> f32 {
        (angular_velocity.abs() * self.gear_ratio.abs() * DIFFERENTIAL_RATIO * RAD_PER_SEC_TO_RPM).max(IDLE_RPM)
    }

    fn update_rpm(&mut self, input: &EngineInput) {
        if input.rev_mode {
            let (target, rate) = if input.throttle > 0.0 {
                (IDLE_RPM + (REDLINE_RPM - IDLE_RPM) * input.throttle, REV_UP_RATE)
            } else {
                (IDLE_RPM, REV_DOWN_RATE)
            };
            self.rpm += (target - self.rpm) * rate;
            return;
        }

        let target = self.wheel_rpm(input.driven_angular_velocity);
        self.rpm += (target - self.rpm) * RPM_SMOOTHING;
        self.rpm = self.rpm.max(IDLE_RPM);
    }

    fn auto_shift(&mut self, angular_velocity: f32) {
        if self.gear < 1 {
            self.throttle_choke = 1.0;
            return;
        }

        if self.rpm < MIN_RPM && self.gear >= 2 {
            self.set_gear(self.gear - 1);
            self.rpm = self.wheel_rpm(angular_velocity);
            debug!(gear = self.gear, rpm = self.rpm, "downshift");
        } else if self.rpm > SHIFT_RPM && self.gear < self.max_gear {
            self.set_gear(self.gear + 1);
            self.rpm = self.wheel_rpm(angular_velocity);
            debug!(gear = self.gear, rpm = self.rpm, "upshift");
        }

        self.throttle_choke = if self.gear == self.max_gear {
            ((REDLINE_RPM - self.rpm) / REDLINE_ALLOWANCE).clamp(0.0, 1.0)
        } else {
            1.0
        };
    }

    /// Advance one tick. Returns the total drive torque at the wheels
    /// (signed along the car's forward axis) to split across driven wheels.
    pub fn update(&mut self, input: &EngineInput) -> f32 {
        self.update_rpm(input);

        if input.rev_mode {
            self.throttle_choke = 1.0;
            self.engine_torque = 0.0;
            return 0.0;
        }

        self.auto_shift(input.driven_angular_velocity);

        if self.gear == 0 || input.braking {
            self.engine_torque = 0.0;
            return 0.0;
        }

        let final_drive = self.gear_ratio * DIFFERENTIAL_RATIO;
        if input.throttle > 0.0 {
            self.engine_torque = max_torque_from_rpm(self.rpm) * input.throttle * self.throttle_choke;
            self.engine_torque * final_drive
        } else if input.driven_angular_velocity.abs() > 1e-3 {
            // coasting in gear: engine braking opposes the wheels' spin
            self.engine_torque = -ENGINE_BRAKE_TORQUE;
            -input.driven_angular_velocity.signum() * ENGINE_BRAKE_TORQUE * final_drive.abs()
        } else {
            self.engine_torque = 0.0;
            0.0
        }
    }
}
