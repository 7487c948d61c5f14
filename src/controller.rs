// ==============================================================================
// controller.rs — KEYS -> EASED THROTTLE / STEERING / BRAKE / HANDBRAKE
// ------------------------------------------------------------------------------
// One arrow axis drives the car both ways; what Up and Down mean depends on
// the current gear:
//
//   gear > 0   Up = throttle          Down = brake
//   gear = 0   Up = 1st + throttle    Down = reverse + throttle
//              (with the handbrake held: throttle only, the engine revs)
//   gear < 0   Up = brake             Down = throttle
//
// Braking remembers WHICH key started it; only releasing that key clears it.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::input::{KeyCode, KeySignal};
use crate::vehicle::Controls;

pub const THROTTLE_INCREASE_RATE: f32 = 0.3;
pub const THROTTLE_RELEASE_RATE: f32 = 0.3;
pub const STEERING_RATE: f32 = 0.022;

/// Extra steering step while returning to centre.
pub const CENTERING_BOOST: f32 = 0.1;

pub const LOW_SPEED_MAX_STEER: f32 = 0.7;  // rad
pub const HIGH_SPEED_MAX_STEER: f32 = 0.2; // rad
pub const MAX_STEER_SPEED: f32 = 30.0;     // m/s where HIGH_SPEED_MAX_STEER applies

/// Below this ground speed the handbrake parks the car.
pub const PARK_SPEED: f32 = 0.1;

/// Below this forward speed releasing the throttle key with the handbrake held parks.
pub const HANDBRAKE_PARK_SPEED: f32 = 0.5;

/// What the controller needs from the car it drives.
pub trait ControlledVehicle {
    fn gear(&self) -> i8;
    fn set_gear(&mut self, gear: i8);
    fn adjust_max_gear(&mut self, delta: i8);
    /// Full speed, m/s.
    fn speed(&self) -> f32;
    /// Speed on the ground (XZ) plane, m/s.
    fn planar_speed(&self) -> f32;
    /// Signed speed along the car's forward axis, m/s.
    fn forward_speed(&self) -> f32;
    fn update_steering(&mut self, angle: f32);
    fn update_handbrake(&mut self, engaged: bool);
    fn request_respawn(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerTuning {
    pub throttle_increase_rate: f32,
    pub throttle_release_rate: f32,
    pub steering_rate: f32,
}

impl Default for ControllerTuning {
    fn default() -> Self {
        Self {
            throttle_increase_rate: THROTTLE_INCREASE_RATE,
            throttle_release_rate: THROTTLE_RELEASE_RATE,
            steering_rate: STEERING_RATE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrakeKey {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerController {
    pub tuning: ControllerTuning,

    // outputs
    pub throttle: f32,
    pub steering: f32,
    pub is_handbraking: bool,

    // state tracking
    pub is_up_pressed: bool,
    pub is_down_pressed: bool,
    pub brake_key: Option<BrakeKey>,
    pub throttle_goal: f32,
    pub steering_goal: f32,
}

impl PlayerController {
    pub fn new(tuning: ControllerTuning) -> Self {
        Self {
            tuning,
            throttle: 0.0,
            steering: 0.0,
            is_handbraking: false,
            is_up_pressed: false,
            is_down_pressed: false,
            brake_key: None,
            throttle_goal: 0.0,
            steering_goal: 0.0,
        }
    }

    /// Clears every output and held-key record; tuning is kept.
    pub fn set_defaults(&mut self) {
        *self = Self::new(self.tuning);
    }

    #[inline]
    pub fn is_braking(&self) -> bool {
        self.brake_key.is_some()
    }

    pub fn controls(&self) -> Controls {
        Controls {
            throttle: self.throttle,
            braking: self.is_braking(),
        }
    }

    pub fn handle_inputs(&mut self, signals: &[KeySignal], car: &mut impl ControlledVehicle) {
        for signal in signals {
            match (signal.code, signal.pressed) {
                (KeyCode::ShiftLeft, true) => car.adjust_max_gear(-1),
                (KeyCode::ShiftRight, true) => car.adjust_max_gear(1),
                (KeyCode::Space, true) => self.update_handbrake(true, car),
                (KeyCode::Space, false) => self.release_space(car),
                (KeyCode::ArrowLeft, true) => self.nudge_steering_goal(-1.0),
                (KeyCode::ArrowLeft, false) => self.nudge_steering_goal(1.0),
                (KeyCode::ArrowRight, true) => self.nudge_steering_goal(1.0),
                (KeyCode::ArrowRight, false) => self.nudge_steering_goal(-1.0),
                (KeyCode::ArrowUp, true) => self.press_arrow_up(car),
                (KeyCode::ArrowUp, false) => self.release_arrow_up(car),
                (KeyCode::ArrowDown, true) => self.press_arrow_down(car),
                (KeyCode::ArrowDown, false) => self.release_arrow_down(car),
                (KeyCode::KeyR, true) => {
                    self.set_defaults();
                    car.request_respawn();
                }
                _ => {}
            }
        }
        self.update_values(car);
    }

    pub fn update_values(&mut self, car: &mut impl ControlledVehicle) {
        self.update_throttle();
        self.update_steering(car);
    }

    fn update_throttle(&mut self) {
        if self.throttle == self.throttle_goal {
            return;
        }

        if self.throttle_goal == 1.0 {
            self.throttle += (self.throttle_goal - self.throttle) * self.tuning.throttle_increase_rate;
            if self.throttle_goal - self.throttle < 0.1 {
                self.throttle = self.throttle_goal;
            }
        } else {
            self.throttle += (self.throttle_goal - self.throttle) * self.tuning.throttle_release_rate;
            if self.throttle < 0.1 {
                self.throttle = self.throttle_goal;
            }
        }
    }

    /// Move `steering` one step toward `goal`, never past it.
    fn step_steering(&mut self, rate: f32) {
        let goal = self.steering_goal;
        if goal < self.steering {
            self.steering = (self.steering - rate).max(goal);
        } else if goal > self.steering {
            self.steering = (self.steering + rate).min(goal);
        }
    }

    fn update_steering(&mut self, car: &mut impl ControlledVehicle) {
        if self.steering != self.steering_goal {
            if self.steering_goal == 0.0 {
                self.step_steering(self.tuning.steering_rate + CENTERING_BOOST);
            }
            self.step_steering(self.tuning.steering_rate);
        }

        let t = (car.speed() / MAX_STEER_SPEED).clamp(0.0, 1.0);
        let max_steer = LOW_SPEED_MAX_STEER + (HIGH_SPEED_MAX_STEER - LOW_SPEED_MAX_STEER) * t;
        car.update_steering(self.steering * max_steer);
    }

    fn nudge_steering_goal(&mut self, delta: f32) {
        self.steering_goal = (self.steering_goal + delta).clamp(-1.0, 1.0);
    }

    /// Start braking for `key` if nothing brakes yet; stop only if `key` started it.
    pub fn update_brake(&mut self, brake: bool, key: BrakeKey) {
        if brake && self.brake_key.is_none() {
            self.brake_key = Some(key);
        } else if !brake && self.brake_key == Some(key) {
            self.brake_key = None;
        }
    }

    fn update_handbrake(&mut self, engaged: bool, car: &mut impl ControlledVehicle) {
        self.is_handbraking = engaged;
        car.update_handbrake(engaged);
        if engaged && car.planar_speed() < PARK_SPEED {
            car.set_gear(0);
        }
    }

    fn press_arrow_up(&mut self, car: &mut impl ControlledVehicle) {
        self.is_up_pressed = true;

        match car.gear() {
            g if g < 0 => self.update_brake(true, BrakeKey::Up),
            0 => {
                if !self.is_handbraking {
                    car.set_gear(1);
                }
                self.throttle_goal = 1.0;
            }
            _ => self.throttle_goal = 1.0,
        }
    }

    fn press_arrow_down(&mut self, car: &mut impl ControlledVehicle) {
        self.is_down_pressed = true;

        match car.gear() {
            g if g > 0 => self.update_brake(true, BrakeKey::Down),
            0 => {
                if !self.is_handbraking {
                    car.set_gear(-1);
                }
                self.throttle_goal = 1.0;
            }
            _ => self.throttle_goal = 1.0,
        }
    }

    fn release_arrow_up(&mut self, car: &mut impl ControlledVehicle) {
        self.is_up_pressed = false;
        let gear = car.gear();

        if gear < 0 {
            self.update_brake(false, BrakeKey::Up);
        } else if gear == 0 && self.brake_key == Some(BrakeKey::Up) {
            self.update_brake(false, BrakeKey::Up);
            if self.is_down_pressed {
                car.set_gear(-1);
            }
        } else if self.is_handbraking && car.forward_speed().abs() < HANDBRAKE_PARK_SPEED {
            car.set_gear(0);
            self.throttle_goal = 0.0;
        } else {
            self.throttle_goal = 0.0;
        }
    }

    fn release_arrow_down(&mut self, car: &mut impl ControlledVehicle) {
        self.is_down_pressed = false;
        let gear = car.gear();

        if gear > 0 {
            self.update_brake(false, BrakeKey::Down);
        } else if gear == 0 && self.brake_key == Some(BrakeKey::Down) {
            self.update_brake(false, BrakeKey::Down);
            if self.is_up_pressed {
                car.set_gear(1);
            }
        } else if self.is_handbraking && car.forward_speed().abs() < HANDBRAKE_PARK_SPEED {
            car.set_gear(0);
            self.throttle_goal = 0.0;
        } else {
            self.throttle_goal = 0.0;
        }
    }

    fn release_space(&mut self, car: &mut impl ControlledVehicle) {
        if car.gear() == 0 {
            let next = match self.brake_key {
                Some(BrakeKey::Down) => Some(1),
                Some(BrakeKey::Up) => Some(-1),
                None if self.is_up_pressed => Some(1),
                None if self.is_down_pressed => Some(-1),
                None => None,
            };
            if let Some(gear) = next {
                car.set_gear(gear);
            }
        }
        self.update_handbrake(false, car);
    }

    /// The car stopped under braking and dropped to neutral: if a direction is
    /// still held (and no throttle is pending) drive off that way.
    pub fn on_brake_stop(&mut self, car: &mut impl ControlledVehicle) {
        if self.throttle_goal != 0.0 {
            return;
        }

        if self.is_down_pressed {
            car.set_gear(-1);
            self.throttle_goal = 1.0;
            self.update_brake(false, BrakeKey::Down);
        } else if self.is_up_pressed {
            car.set_gear(1);
            self.throttle_goal = 1.0;
            self.update_brake(false, BrakeKey::Up);
        }
    }

    pub fn on_park(&mut self) {
        self.throttle_goal = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct MockCar {
        gear: i8,
        max_gear_delta: i8,
        speed: f32,
        forward_speed: f32,
        steering: f32,
        handbrake: bool,
        respawns: u32,
    }

    impl ControlledVehicle for MockCar {
        fn gear(&self) -> i8 {
            self.gear
        }
        fn set_gear(&mut self, gear: i8) {
            self.gear = gear;
        }
        fn adjust_max_gear(&mut self, delta: i8) {
            self.max_gear_delta += delta;
        }
        fn speed(&self) -> f32 {
            self.speed
        }
        fn planar_speed(&self) -> f32 {
            self.speed
        }
        fn forward_speed(&self) -> f32 {
            self.forward_speed
        }
        fn update_steering(&mut self, angle: f32) {
            self.steering = angle;
        }
        fn update_handbrake(&mut self, engaged: bool) {
            self.handbrake = engaged;
        }
        fn request_respawn(&mut self) {
            self.respawns += 1;
        }
    }

    fn press(code: KeyCode) -> KeySignal {
        KeySignal { code, pressed: true }
    }

    fn release(code: KeyCode) -> KeySignal {
        KeySignal { code, pressed: false }
    }

    fn controller() -> PlayerController {
        PlayerController::new(ControllerTuning::default())
    }

    #[test]
    fn up_from_neutral_engages_first_and_throttle() {
        let mut car = MockCar::default();
        let mut pc = controller();
        pc.handle_inputs(&[press(KeyCode::ArrowUp)], &mut car);
        assert_eq!(car.gear, 1);
        assert_eq!(pc.throttle_goal, 1.0);
        assert!(pc.throttle > 0.0);
    }

    #[test]
    fn down_in_forward_gear_brakes() {
        let mut car = MockCar { gear: 3, speed: 10.0, forward_speed: 10.0, ..Default::default() };
        let mut pc = controller();
        pc.handle_inputs(&[press(KeyCode::ArrowDown)], &mut car);
        assert_eq!(pc.brake_key, Some(BrakeKey::Down));
        assert_eq!(car.gear, 3);

        pc.handle_inputs(&[release(KeyCode::ArrowDown)], &mut car);
        assert!(!pc.is_braking());
    }

    #[test]
    fn releasing_the_other_key_keeps_braking() {
        let mut car = MockCar { gear: -1, speed: 3.0, forward_speed: -3.0, ..Default::default() };
        let mut pc = controller();

        // reversing: Up is the brake
        pc.handle_inputs(&[press(KeyCode::ArrowUp)], &mut car);
        assert_eq!(pc.brake_key, Some(BrakeKey::Up));

        pc.handle_inputs(&[press(KeyCode::ArrowDown)], &mut car);
        pc.handle_inputs(&[release(KeyCode::ArrowDown)], &mut car);
        assert!(pc.is_braking(), "Down never started the brake, releasing it must not clear it");

        pc.handle_inputs(&[release(KeyCode::ArrowUp)], &mut car);
        assert!(!pc.is_braking());
    }

    #[test]
    fn brake_key_identity_in_forward_gear() {
        let mut pc = controller();
        pc.update_brake(true, BrakeKey::Down);
        pc.update_brake(true, BrakeKey::Up);
        pc.update_brake(false, BrakeKey::Up);
        assert_eq!(pc.brake_key, Some(BrakeKey::Down));
        pc.update_brake(false, BrakeKey::Down);
        assert_eq!(pc.brake_key, None);
    }

    #[test]
    fn brake_stop_drives_off_in_held_direction() {
        let mut car = MockCar { gear: 2, speed: 5.0, forward_speed: 5.0, ..Default::default() };
        let mut pc = controller();
        pc.handle_inputs(&[press(KeyCode::ArrowDown)], &mut car);
        assert!(pc.is_braking());

        // vehicle reports the stop and drops to neutral
        car.gear = 0;
        car.speed = 0.0;
        pc.on_brake_stop(&mut car);

        assert_eq!(car.gear, -1);
        assert_eq!(pc.throttle_goal, 1.0);
        assert!(!pc.is_braking());
    }

    #[test]
    fn brake_stop_waits_while_throttle_pending() {
        let mut car = MockCar { gear: 0, ..Default::default() };
        let mut pc = controller();
        pc.throttle_goal = 1.0;
        pc.is_down_pressed = true;
        pc.on_brake_stop(&mut car);
        assert_eq!(car.gear, 0);
    }

    #[test]
    fn releasing_brake_in_neutral_falls_back_to_reverse() {
        let mut car = MockCar { gear: -1, speed: 4.0, forward_speed: -4.0, ..Default::default() };
        let mut pc = controller();

        pc.handle_inputs(&[press(KeyCode::ArrowUp), press(KeyCode::ArrowDown)], &mut car);
        assert_eq!(pc.brake_key, Some(BrakeKey::Up));
        assert_eq!(pc.throttle_goal, 1.0);

        // stopped under the brake: throttle is pending, so no drive-off yet
        car.gear = 0;
        car.speed = 0.0;
        car.forward_speed = 0.0;
        pc.on_brake_stop(&mut car);
        assert_eq!(car.gear, 0);

        pc.handle_inputs(&[release(KeyCode::ArrowUp)], &mut car);
        assert_eq!(car.gear, -1);
        assert!(!pc.is_braking());
        assert_eq!(pc.throttle_goal, 1.0);
    }

    #[test]
    fn releasing_brake_in_neutral_falls_back_to_first() {
        let mut car = MockCar { gear: 2, speed: 4.0, forward_speed: 4.0, ..Default::default() };
        let mut pc = controller();

        pc.handle_inputs(&[press(KeyCode::ArrowDown), press(KeyCode::ArrowUp)], &mut car);
        assert_eq!(pc.brake_key, Some(BrakeKey::Down));
        assert_eq!(pc.throttle_goal, 1.0);

        car.gear = 0;
        car.speed = 0.0;
        car.forward_speed = 0.0;
        pc.on_brake_stop(&mut car);
        assert_eq!(car.gear, 0);

        pc.handle_inputs(&[release(KeyCode::ArrowDown)], &mut car);
        assert_eq!(car.gear, 1);
        assert!(!pc.is_braking());
    }

    #[test]
    fn handbrake_at_rest_parks_and_revs() {
        let mut car = MockCar { gear: 1, ..Default::default() };
        let mut pc = controller();

        pc.handle_inputs(&[press(KeyCode::Space)], &mut car);
        assert!(car.handbrake);
        assert_eq!(car.gear, 0);

        pc.handle_inputs(&[press(KeyCode::ArrowUp)], &mut car);
        assert_eq!(car.gear, 0, "handbrake held: Up only revs");
        assert_eq!(pc.throttle_goal, 1.0);

        pc.handle_inputs(&[release(KeyCode::Space)], &mut car);
        assert_eq!(car.gear, 1, "releasing the handbrake picks the held direction");
        assert!(!car.handbrake);
    }

    #[test]
    fn releasing_handbrake_prefers_brake_key_direction() {
        let mut car = MockCar { gear: 0, ..Default::default() };
        let mut pc = controller();
        pc.is_handbraking = true;
        pc.brake_key = Some(BrakeKey::Up);
        pc.is_down_pressed = true;
        pc.handle_inputs(&[release(KeyCode::Space)], &mut car);
        assert_eq!(car.gear, -1);
    }

    #[test]
    fn throttle_eases_and_snaps() {
        let mut car = MockCar { gear: 1, ..Default::default() };
        let mut pc = controller();
        pc.handle_inputs(&[press(KeyCode::ArrowUp)], &mut car);
        assert!((pc.throttle - 0.3).abs() < 1e-6);

        for _ in 0..10 {
            pc.update_values(&mut car);
        }
        assert_eq!(pc.throttle, 1.0);

        pc.handle_inputs(&[release(KeyCode::ArrowUp)], &mut car);
        for _ in 0..10 {
            pc.update_values(&mut car);
        }
        assert_eq!(pc.throttle, 0.0);
    }

    #[test]
    fn steering_returns_to_centre_faster() {
        let mut car = MockCar::default();
        let mut pc = controller();

        pc.handle_inputs(&[press(KeyCode::ArrowRight)], &mut car);
        assert!((pc.steering - STEERING_RATE).abs() < 1e-6);
        for _ in 0..100 {
            pc.update_values(&mut car);
        }
        assert_eq!(pc.steering, 1.0);
        assert!((car.steering - LOW_SPEED_MAX_STEER).abs() < 1e-6);

        pc.handle_inputs(&[release(KeyCode::ArrowRight)], &mut car);
        let step = 1.0 - pc.steering;
        assert!((step - (2.0 * STEERING_RATE + CENTERING_BOOST)).abs() < 1e-5);
    }

    #[test]
    fn steering_angle_shrinks_with_speed() {
        let mut car = MockCar { speed: 40.0, ..Default::default() };
        let mut pc = controller();
        pc.steering = 1.0;
        pc.steering_goal = 1.0;
        pc.update_values(&mut car);
        assert!((car.steering - HIGH_SPEED_MAX_STEER).abs() < 1e-6);
    }

    #[test]
    fn opposite_steering_keys_cancel() {
        let mut car = MockCar::default();
        let mut pc = controller();
        pc.handle_inputs(&[press(KeyCode::ArrowLeft), press(KeyCode::ArrowRight)], &mut car);
        assert_eq!(pc.steering_goal, 0.0);
        pc.handle_inputs(&[release(KeyCode::ArrowRight)], &mut car);
        assert_eq!(pc.steering_goal, -1.0);
    }

    #[test]
    fn shift_keys_adjust_max_gear_and_r_respawns() {
        let mut car = MockCar::default();
        let mut pc = controller();
        pc.throttle_goal = 1.0;
        pc.handle_inputs(&[press(KeyCode::ShiftRight), press(KeyCode::ShiftLeft), press(KeyCode::ShiftLeft)], &mut car);
        assert_eq!(car.max_gear_delta, -1);

        pc.handle_inputs(&[press(KeyCode::KeyR)], &mut car);
        assert_eq!(car.respawns, 1);
        assert_eq!(pc, controller());
    }

    #[test]
    fn release_up_with_handbrake_parks_when_slow() {
        let mut car = MockCar { gear: 1, speed: 0.3, forward_speed: 0.3, ..Default::default() };
        let mut pc = controller();
        pc.is_handbraking = true;
        pc.is_up_pressed = true;
        pc.throttle_goal = 1.0;
        pc.handle_inputs(&[release(KeyCode::ArrowUp)], &mut car);
        assert_eq!(car.gear, 0);
        assert_eq!(pc.throttle_goal, 0.0);
    }
}
