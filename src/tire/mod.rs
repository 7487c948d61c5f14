//! tire - engine-agnostic tire helpers (pure functions, no rigid-body access)

pub mod friction;
pub mod slip;
pub mod steering;
pub mod suspension;
pub mod traction;

pub use friction::{friction_circle, FrictionCurve, TireCurves};
pub use slip::{slip_angle, slip_ratio, SlipGuard, SlipRegime};
pub use traction::{solve_traction, TractionInput, TractionOutput};
