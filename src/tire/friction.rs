// ==============================================================================
// friction.rs — PIECEWISE-LINEAR FRICTION CURVES + FRICTION CIRCLE
// ------------------------------------------------------------------------------
// A Pacejka-inspired curve reduced to three segments:
//
//     coef
//      ^
//  mu_s |------.
//       |       \
//  mu_d |        '--------------
//       +------+-----+----------> |slip|
//         slipping_at  +transition
//
// The same shape is used twice: longitudinally against slip ratio and
// laterally against slip angle (radians).
//
// friction_circle(...) caps the combined (longitudinal, lateral) force at a
// single magnitude while keeping its direction.
// ==============================================================================

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrictionCurve {
    pub static_coef: f32,  // grip while the tire is not sliding
    pub dynamic_coef: f32, // grip once fully sliding
    pub slipping_at: f32,  // |slip| where the transition begins
    pub transition: f32,   // width of the linear transition band
}

impl FrictionCurve {
    pub const fn new(static_coef: f32, dynamic_coef: f32, slipping_at: f32, transition: f32) -> Self {
        Self { static_coef, dynamic_coef, slipping_at, transition }
    }

    /// Friction coefficient for a slip value. Only the magnitude of `slip` matters.
    pub fn coefficient(&self, slip: f32) -> f32 {
        let s = slip.abs();
        if s <= self.slipping_at {
            return self.static_coef;
        }

        let fully_slipping = self.slipping_at + self.transition;
        if s >= fully_slipping {
            return self.dynamic_coef;
        }

        let t = (s - self.slipping_at) / self.transition;
        self.static_coef + (self.dynamic_coef - self.static_coef) * t
    }
}

/// Longitudinal (slip ratio) and lateral (slip angle) curves of one tire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TireCurves {
    pub longitudinal: FrictionCurve,
    pub lateral: FrictionCurve,
}

impl Default for TireCurves {
    fn default() -> Self {
        Self {
            longitudinal: FrictionCurve::new(1.1, 0.8, 0.10, 0.20),
            lateral: FrictionCurve::new(1.0, 0.7, 0.12, 0.25),
        }
    }
}

/// Rescale (longitudinal, lateral) so that their combined magnitude does not
/// exceed `max_force`.
pub fn friction_circle(longitudinal: f32, lateral: f32, max_force: f32) -> (f32, f32) {
    let max_force = max_force.max(0.0);
    let combined = Vector2::new(longitudinal, lateral);
    let magnitude = combined.norm();

    if magnitude <= max_force || magnitude <= f32::EPSILON {
        return (longitudinal, lateral);
    }

    let clamped = combined.normalize() * max_force;
    (clamped.x, clamped.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn curve() -> FrictionCurve {
        TireCurves::default().longitudinal
    }

    #[test]
    fn below_threshold_is_exactly_static() {
        let c = curve();
        for i in 0..=100 {
            let slip = c.slipping_at * (i as f32 / 100.0);
            assert_eq!(c.coefficient(slip), c.static_coef);
            assert_eq!(c.coefficient(-slip), c.static_coef);
        }
    }

    #[test]
    fn beyond_transition_is_exactly_dynamic() {
        let c = curve();
        let end = c.slipping_at + c.transition;
        for i in 0..100 {
            let slip = end + i as f32 * 0.05;
            assert_eq!(c.coefficient(slip), c.dynamic_coef);
            assert_eq!(c.coefficient(-slip), c.dynamic_coef);
        }
    }

    #[test]
    fn transition_band_is_linear_and_monotonic() {
        let c = curve();
        let steps = 50;
        let mut prev = c.static_coef;
        for i in 1..steps {
            let t = i as f32 / steps as f32;
            let slip = c.slipping_at + c.transition * t;
            let coef = c.coefficient(slip);
            let expected = c.static_coef + (c.dynamic_coef - c.static_coef) * t;

            assert!((coef - expected).abs() < 1e-5, "slip {slip}: {coef} vs {expected}");
            assert!(coef <= prev + 1e-6, "static > dynamic so the band must not increase");
            prev = coef;
        }
    }

    #[test]
    fn friction_circle_leaves_small_forces_untouched() {
        assert_eq!(friction_circle(300.0, -400.0, 1000.0), (300.0, -400.0));
        assert_eq!(friction_circle(0.0, 0.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn friction_circle_preserves_direction() {
        let (long, lat) = friction_circle(3000.0, -4000.0, 1000.0);
        assert!((long - 600.0).abs() < 1e-2);
        assert!((lat + 800.0).abs() < 1e-2);
    }

    #[test]
    fn friction_circle_bound_holds_for_random_inputs() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..10_000 {
            let long = rng.gen_range(-50_000.0..50_000.0f32);
            let lat = rng.gen_range(-50_000.0..50_000.0f32);
            let load = rng.gen_range(0.0..20_000.0f32);
            let avg_coef = rng.gen_range(0.1..1.5f32);
            let max = load * avg_coef;

            let (l, s) = friction_circle(long, lat, max);
            let magnitude = (l * l + s * s).sqrt();
            assert!(
                magnitude <= max * (1.0 + 1e-5) + 1e-3,
                "|({l}, {s})| = {magnitude} exceeds {max}"
            );
        }
    }
}
