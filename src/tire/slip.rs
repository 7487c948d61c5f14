// ==============================================================================
// slip.rs — SLIP RATIO + SLIP ANGLE
// ------------------------------------------------------------------------------
// slip ratio  = (ω·r - v_long) / max(|v_long|, MIN_SLIP_DENOMINATOR)
// slip angle  = atan2(v_lat, |v_long|)
//
// A wheel that is neither driven, braked nor locked is free-rolling: its
// surface speed is snapped to the ground by the caller and slip is zero.
// ==============================================================================

/// Denominator floor so a wheel spinning up from rest does not divide by zero.
pub const MIN_SLIP_DENOMINATOR: f32 = 0.1;

/// Surface/ground speed differences below this are treated as exact rolling.
pub const SLIP_DEADZONE: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlipRegime {
    FreeRolling,
    Spinning,
    Skidding,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SlipGuard {
    pub throttling: bool,
    pub braking: bool,
    pub locked: bool,
}

impl SlipGuard {
    #[inline]
    pub fn is_free_rolling(&self) -> bool {
        !self.throttling && !self.braking && !self.locked
    }
}

/// Returns the slip regime and the signed slip ratio.
pub fn slip_ratio(
    angular_velocity: f32,
    radius: f32,
    forward_velocity: f32,
    guard: SlipGuard,
) -> (SlipRegime, f32) {
    if guard.is_free_rolling() {
        return (SlipRegime::FreeRolling, 0.0);
    }

    let surface = angular_velocity * radius;
    let regime = if surface.abs() > forward_velocity.abs() {
        SlipRegime::Spinning
    } else {
        SlipRegime::Skidding
    };

    let diff = surface - forward_velocity;
    if diff.abs() < SLIP_DEADZONE {
        return (regime, 0.0);
    }

    (regime, diff / forward_velocity.abs().max(MIN_SLIP_DENOMINATOR))
}

#[inline]
pub fn slip_angle(sideways_velocity: f32, forward_velocity: f32) -> f32 {
    sideways_velocity.atan2(forward_velocity.abs())
}
