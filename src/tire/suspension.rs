// ==============================================================================
// suspension.rs — RAYCAST SUSPENSION SPRING + DAMPER
// ------------------------------------------------------------------------------
//   F_spring = k * compression * (n · up)
//   F_damper = -c * (up · v_contact)
//   F        = max(F_spring + F_damper, 0)      (+ pushes the chassis up)
// ==============================================================================

pub const GRAVITY: f32 = 9.81;

pub fn suspension_force(
    compression: f32,
    normal_alignment: f32,
    vertical_velocity: f32,
    stiffness: f32,
    damping: f32,
) -> f32 {
    let spring = stiffness * compression * normal_alignment;
    let damper = -damping * vertical_velocity;

    (spring + damper).max(0.0)
}

/// Spring and damper constants from a static sag and a damping ratio.
pub fn suspension_from_sag(mass_per_wheel: f32, sag_m: f32, zeta: f32) -> (f32, f32) {
    let f_static = mass_per_wheel * GRAVITY;
    let k = f_static / sag_m.max(1e-3); // N/m

    // c = 2*zeta*sqrt(k*m)
    let c = 2.0 * zeta * (k * mass_per_wheel).sqrt();
    (k, c)
}
