// ==============================================================================
// traction.rs — PER-WHEEL TIRE FORCE SOLVE (FORCE DOMAIN)
// ------------------------------------------------------------------------------
// Inputs: suspension load, contact-patch velocities in the wheel basis, wheel
// spin, and the torques the drivetrain wants to put through the tire.
//
// Model steps:
// 1) locked wheels stop spinning; free-rolling wheels snap to ground speed
// 2) slip ratio / slip angle -> friction coefficients (friction.rs)
// 3) longitudinal demand
//      braking  : brake torque / r, never more than what stops the wheel's
//                 share of the chassis this step
//      locked   : sliding friction opposing travel
//      otherwise: drive torque / r  (engine or engine-braking)
// 4) lateral demand cancels a fraction of the sideways velocity
// 5) both capped at load * coef, locked-wheel multipliers, friction circle
// 6) wheel spin integration (explicit Euler against the wheel inertia)
//
// This file does NOT touch the rigid-body world.
// ==============================================================================

use crate::tire::friction::{friction_circle, TireCurves};
use crate::tire::slip::{slip_angle, slip_ratio, SlipGuard, SlipRegime};

/// Fraction of the sideways velocity a tire tries to cancel per step.
pub const LATERAL_RESPONSE: f32 = 0.5;

/// Longitudinal damping applied to a handbrake-locked wheel.
pub const LOCKED_LONGITUDINAL_FACTOR: f32 = 0.6;

/// How fast a gripping wheel's spin relaxes toward ground speed (per step).
pub const WHEEL_RELAXATION: f32 = 0.5;

/// Below this ground speed a locked or braked tire produces no sliding force.
const STANDSTILL_SPEED: f32 = 0.01;

#[derive(Debug, Clone, Copy)]
pub struct TractionInput {
    pub load: f32,              // N, suspension force (>= 0)
    pub forward_velocity: f32,  // m/s along the wheel forward axis
    pub sideways_velocity: f32, // m/s along the wheel sideways axis
    pub angular_velocity: f32,  // rad/s
    pub radius: f32,            // m
    pub inertia: f32,           // kg*m^2
    pub mass_share: f32,        // kg of chassis carried by this wheel
    pub drive_torque: f32,      // N*m, signed along forward
    pub brake_torque: f32,      // N*m, magnitude
    pub throttling: bool,
    pub lock: Option<f32>,      // Some(drift multiplier) when handbrake-locked
    pub dt: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TractionOutput {
    pub regime: SlipRegime,
    pub slip_ratio: f32,
    pub slip_angle: f32,
    pub longitudinal: f32, // N along forward
    pub lateral: f32,      // N along sideways
    pub angular_velocity: f32,
}

impl TractionInput {
    #[inline]
    fn braking(&self) -> bool {
        self.brake_torque > 0.0
    }

    #[inline]
    fn ground_angular_velocity(&self) -> f32 {
        self.forward_velocity / self.radius
    }

    /// Force that would bring this wheel's share of the chassis to rest along
    /// its forward axis in one step.
    #[inline]
    fn stopping_force(&self) -> f32 {
        self.forward_velocity.abs() * self.mass_share / self.dt
    }
}

pub fn solve_traction(curves: &TireCurves, input: &TractionInput) -> TractionOutput {
    let locked = input.lock.is_some();
    let guard = SlipGuard { throttling: input.throttling, braking: input.braking(), locked };

    let mut omega = if locked { 0.0 } else { input.angular_velocity };

    let (regime, ratio) = slip_ratio(omega, input.radius, input.forward_velocity, guard);
    if regime == SlipRegime::FreeRolling {
        omega = input.ground_angular_velocity();
    }
    let angle = slip_angle(input.sideways_velocity, input.forward_velocity);

    let long_coef = curves.longitudinal.coefficient(ratio);
    let lat_coef = curves.lateral.coefficient(angle);

    let load = input.load.max(0.0);
    let max_long = (load * long_coef).max(0.0);
    let max_lat = (load * lat_coef).max(0.0);

    // ------------------------------------------------
    // Longitudinal demand
    // ------------------------------------------------
    let travel_sign = if input.forward_velocity.abs() > STANDSTILL_SPEED {
        input.forward_velocity.signum()
    } else {
        0.0
    };

    let desired_long = if input.braking() {
        -travel_sign * (input.brake_torque / input.radius).min(input.stopping_force())
    } else if locked {
        -travel_sign * max_long.min(input.stopping_force())
    } else {
        input.drive_torque / input.radius
    };
    let mut longitudinal = desired_long.clamp(-max_long, max_long);

    // ------------------------------------------------
    // Lateral demand
    // ------------------------------------------------
    let desired_lat = -input.sideways_velocity * input.mass_share / input.dt * LATERAL_RESPONSE;
    let mut lateral = desired_lat.clamp(-max_lat, max_lat);

    if let Some(drift) = input.lock {
        lateral *= drift;
        longitudinal *= LOCKED_LONGITUDINAL_FACTOR;
    }

    let (longitudinal, lateral) = friction_circle(longitudinal, lateral, load * (long_coef + lat_coef) * 0.5);

    // ------------------------------------------------
    // Wheel spin
    // ------------------------------------------------
    let ground = input.ground_angular_velocity();
    let relax = |w: f32| w + (ground - w) * WHEEL_RELAXATION;

    let angular_velocity = if locked {
        0.0
    } else if regime == SlipRegime::FreeRolling {
        omega
    } else if input.braking() {
        if input.brake_torque / input.radius > max_long {
            // brake overpowers the tire: the wheel decelerates toward lock
            let excess = input.brake_torque - longitudinal.abs() * input.radius;
            let step = (excess / input.inertia * input.dt).min(omega.abs());
            omega - omega.signum() * step
        } else {
            relax(omega)
        }
    } else if input.throttling && desired_long.abs() > max_long {
        omega + (input.drive_torque - longitudinal * input.radius) / input.inertia * input.dt
    } else {
        relax(omega)
    };

    TractionOutput {
        regime,
        slip_ratio: ratio,
        slip_angle: angle,
        longitudinal,
        lateral,
        angular_velocity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn input() -> TractionInput {
        TractionInput {
            load: 3000.0,
            forward_velocity: 0.0,
            sideways_velocity: 0.0,
            angular_velocity: 0.0,
            radius: 0.35,
            inertia: 1.2,
            mass_share: 300.0,
            drive_torque: 0.0,
            brake_torque: 0.0,
            throttling: false,
            lock: None,
            dt: DT,
        }
    }

    #[test]
    fn free_rolling_wheel_tracks_ground() {
        let out = solve_traction(&TireCurves::default(), &TractionInput { forward_velocity: 7.0, angular_velocity: 3.0, ..input() });
        assert_eq!(out.regime, SlipRegime::FreeRolling);
        assert_eq!(out.slip_ratio, 0.0);
        assert!((out.angular_velocity - 7.0 / 0.35).abs() < 1e-4);
        assert_eq!(out.longitudinal, 0.0);
    }

    #[test]
    fn drive_force_is_capped_by_grip() {
        let curves = TireCurves::default();
        let out = solve_traction(&curves, &TractionInput { drive_torque: 5000.0, throttling: true, ..input() });
        let cap = 3000.0 * curves.longitudinal.static_coef;
        assert!(out.longitudinal <= cap + 1e-3);
        assert!(out.longitudinal > 0.0);
        // torque beyond grip spins the wheel up
        assert!(out.angular_velocity > 0.0);
    }

    #[test]
    fn gentle_throttle_grips_without_spinning() {
        let out = solve_traction(
            &TireCurves::default(),
            &TractionInput { forward_velocity: 5.0, angular_velocity: 5.0 / 0.35, drive_torque: 200.0, throttling: true, ..input() },
        );
        assert!((out.longitudinal - 200.0 / 0.35).abs() < 1e-2);
        assert!((out.angular_velocity - 5.0 / 0.35).abs() < 1e-3);
    }

    #[test]
    fn braking_opposes_travel_and_never_reverses_the_wheel() {
        let out = solve_traction(
            &TireCurves::default(),
            &TractionInput { forward_velocity: 10.0, angular_velocity: 10.0 / 0.35, brake_torque: 5000.0, ..input() },
        );
        assert!(out.longitudinal < 0.0);
        assert!(out.angular_velocity >= 0.0);
        assert!(out.angular_velocity < 10.0 / 0.35);
    }

    #[test]
    fn braking_at_rest_produces_no_force() {
        let out = solve_traction(&TireCurves::default(), &TractionInput { brake_torque: 5000.0, ..input() });
        assert_eq!(out.longitudinal, 0.0);
    }

    #[test]
    fn locked_wheel_lateral_scaled_by_drift_multiplier() {
        let curves = TireCurves::default();
        let drift = 0.45;
        let sliding = TractionInput { sideways_velocity: 0.05, ..input() };

        let free = solve_traction(&curves, &sliding);
        let locked = solve_traction(&curves, &TractionInput { lock: Some(drift), ..sliding });

        assert!((locked.lateral - free.lateral * drift).abs() < 1e-3);
        assert_eq!(locked.angular_velocity, 0.0);
    }

    #[test]
    fn locked_wheel_longitudinal_scaled_by_fixed_factor() {
        let curves = TireCurves::default();
        let out = solve_traction(
            &curves,
            &TractionInput { forward_velocity: 8.0, angular_velocity: 8.0 / 0.35, lock: Some(1.0), ..input() },
        );
        // locked at speed => slip ratio -1 => dynamic coefficient
        let expected = -3000.0 * curves.longitudinal.dynamic_coef * LOCKED_LONGITUDINAL_FACTOR;
        assert!((out.longitudinal - expected).abs() < 1e-2, "{} vs {expected}", out.longitudinal);
        assert_eq!(out.regime, SlipRegime::Skidding);
    }

    #[test]
    fn combined_force_respects_friction_circle() {
        let curves = TireCurves::default();
        let out = solve_traction(
            &curves,
            &TractionInput { forward_velocity: 6.0, sideways_velocity: 4.0, angular_velocity: 40.0, drive_torque: 4000.0, throttling: true, ..input() },
        );
        let long_coef = curves.longitudinal.coefficient(out.slip_ratio);
        let lat_coef = curves.lateral.coefficient(out.slip_angle);
        let max = 3000.0 * (long_coef + lat_coef) * 0.5;
        let magnitude = (out.longitudinal.powi(2) + out.lateral.powi(2)).sqrt();
        assert!(magnitude <= max * (1.0 + 1e-5) + 1e-3);
    }

    #[test]
    fn airborne_load_means_no_force() {
        let out = solve_traction(
            &TireCurves::default(),
            &TractionInput { load: 0.0, sideways_velocity: 3.0, drive_torque: 300.0, throttling: true, ..input() },
        );
        assert_eq!(out.longitudinal, 0.0);
        assert_eq!(out.lateral, 0.0);
    }
}
