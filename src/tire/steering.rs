// ==============================================================================
// steering.rs — ACKERMANN STEERING GEOMETRY (FRONT AXLE)
// ==============================================================================
// Converts one centreline ("bicycle model") steering angle into per-wheel
// angles for the front axle. Positive angles turn right; for a right turn the
// right wheel is on the inside and turns further than the left one.
//
// The result is blended between parallel steer (both wheels equal) and full
// Ackermann by `ackermann` (0..1).
// ==============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SteeringGeometry {
    pub wheelbase: f32,   // meters
    pub track_width: f32, // meters
    pub ackermann: f32,   // 0 = parallel, 1 = full Ackermann
}

/// Full Ackermann (left, right) angles for a centreline angle.
fn ackermann_angles(base: f32, wheelbase: f32, track: f32) -> (f32, f32) {
    let eps = 1e-4;
    if base.abs() < eps {
        return (0.0, 0.0);
    }

    let sign = base.signum();
    let a = base.abs();

    // Bicycle-model turning radius
    let r = wheelbase / a.tan();

    let r_in = (r - track * 0.5).max(0.01);
    let r_out = (r + track * 0.5).max(0.01);

    let inner = (wheelbase / r_in).atan() * sign;
    let outer = (wheelbase / r_out).atan() * sign;

    if sign > 0.0 {
        (outer, inner) // right turn
    } else {
        (inner, outer) // left turn
    }
}

/// Per-wheel (left, right) steering angles.
pub fn wheel_angles(geometry: &SteeringGeometry, steer_angle: f32) -> (f32, f32) {
    let (ack_l, ack_r) = ackermann_angles(steer_angle, geometry.wheelbase, geometry.track_width);
    let blend = geometry.ackermann.clamp(0.0, 1.0);

    (
        (1.0 - blend) * steer_angle + blend * ack_l,
        (1.0 - blend) * steer_angle + blend * ack_r,
    )
}
