// Teleop control mapper: gamepad snapshots in, actuator command out
//
// Driver pad (gamepad 1): tank drive on the stick Y axes, bumpers run the
// pickup, triggers run the lift, A/B latch the basket release.
// Operator pad (gamepad 2): start toggles basket control mode, face buttons
// steer the basket, dpad fires the climber knockdowns.
//
// All sticky state (mode, latched servo positions) lives on the mapper and
// is mutated only inside update(), once per control cycle.

use serde::Serialize;
use std::f64::consts::PI;

use crate::gamepad::GamepadPair;

// Motor powers
pub const STOP: f64 = 0.0;
pub const MAX_POWER: f64 = 1.0;
const PICKUP_POWER: f64 = 0.65;
const LIFT_POWER: f64 = 1.0;

// Servo start positions, also the shutdown targets
pub const KNOCKDOWN_START_R: f64 = 0.0;
pub const KNOCKDOWN_START_L: f64 = 1.0;
pub const DEPOSIT_START: f64 = 0.635;
pub const BASKET_TILT_START: f64 = 0.875;
pub const BASKET_RELEASE_START: f64 = 0.34;

// Deployed positions
const KNOCKDOWN_END_R: f64 = 0.494;
const KNOCKDOWN_END_L: f64 = 0.0;
const BASKET_RELEASE_END: f64 = 1.0;

// Auto-mode tilt targets
const BASKET_TILT_RIGHT: f64 = 0.290;
const BASKET_TILT_LEFT: f64 = 1.0;

// The rotate servo is continuous-rotation: 0.5 holds still, offsets from
// 0.5 set direction and speed.
pub const ROTATE_STOP: f64 = 0.5;
const ROTATE_LEFT_SLOW: f64 = 0.56;
const ROTATE_LEFT_FAST: f64 = 0.58;
const ROTATE_RIGHT_SLOW: f64 = 0.47;
const ROTATE_RIGHT_FAST: f64 = 0.45;

// Manual tilt integrator: step per cycle, clamped short of the servo
// endpoints to avoid stalling against the horns.
const TILT_STEP: f64 = 0.01;
const TILT_MIN: f64 = 0.02;
const TILT_MAX: f64 = 0.98;

// Stick deflection at which the response curve reaches full output
const STICK_TOP_THRESHOLD: f64 = 0.85;

/// Sine response curve for the drive sticks.
///
/// Fine control near center, full power before the stick hits its mechanical
/// stop. Odd-symmetric and clamped to [-1, 1].
pub fn shape(stick: f32) -> f64 {
    (f64::from(stick) * PI / 2.0 / STICK_TOP_THRESHOLD)
        .sin()
        .clamp(-1.0, 1.0)
}

/// Basket control mode, toggled by the operator's start button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BasketMode {
    Auto,
    Manual,
}

/// One cycle's worth of actuator targets: six motor powers in [-1, 1] and
/// six servo positions in [0, 1].
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ActuatorCommand {
    pub drive_r: f64,
    pub drive_l: f64,
    pub pickup: f64,
    pub lift: f64,
    pub knockdown_r: f64,
    pub knockdown_l: f64,
    pub deposit: f64,
    pub basket_rotate: f64,
    pub basket_release: f64,
    pub basket_tilt: f64,
}

impl ActuatorCommand {
    /// All motors stopped, all servos at their start positions. Issued at
    /// shutdown regardless of what was last commanded.
    pub fn neutral() -> Self {
        Self {
            drive_r: STOP,
            drive_l: STOP,
            pickup: STOP,
            lift: STOP,
            knockdown_r: KNOCKDOWN_START_R,
            knockdown_l: KNOCKDOWN_START_L,
            deposit: DEPOSIT_START,
            basket_rotate: ROTATE_STOP,
            basket_release: BASKET_RELEASE_START,
            basket_tilt: BASKET_TILT_START,
        }
    }
}

/// The teleop state machine. One instance per run, driven by the runtime.
pub struct TeleopMapper {
    mode: BasketMode,
    // Latched servo positions that persist until an input changes them
    basket_release: f64,
    basket_tilt: f64,
    knockdown_r: f64,
    knockdown_l: f64,
    deposit: f64,
}

impl TeleopMapper {
    pub fn new() -> Self {
        Self {
            mode: BasketMode::Auto,
            basket_release: BASKET_RELEASE_START,
            basket_tilt: BASKET_TILT_START,
            knockdown_r: KNOCKDOWN_START_R,
            knockdown_l: KNOCKDOWN_START_L,
            deposit: DEPOSIT_START,
        }
    }

    pub fn mode(&self) -> BasketMode {
        self.mode
    }

    /// Command issued while no gamepad is attached: all motors stopped,
    /// rotate servo stopped, latched servo positions held where they are.
    pub fn hold_command(&self) -> ActuatorCommand {
        ActuatorCommand {
            drive_r: STOP,
            drive_l: STOP,
            pickup: STOP,
            lift: STOP,
            knockdown_r: self.knockdown_r,
            knockdown_l: self.knockdown_l,
            deposit: self.deposit,
            basket_rotate: ROTATE_STOP,
            basket_release: self.basket_release,
            basket_tilt: self.basket_tilt,
        }
    }

    /// Run one control cycle: fold the two snapshots into the sticky state
    /// and produce the command to send to the rig.
    pub fn update(&mut self, pads: &GamepadPair) -> ActuatorCommand {
        let driver = &pads.driver;
        let operator = &pads.operator;

        // Tank drive, one stick per side. Forward push reads negative.
        let drive_r = shape(-driver.right_stick_y);
        let drive_l = shape(-driver.left_stick_y);

        // Pickup: right bumper pulls in, left bumper pushes out.
        // Right wins if both are held.
        let pickup = if driver.right_bumper {
            PICKUP_POWER
        } else if driver.left_bumper {
            -PICKUP_POWER
        } else {
            STOP
        };

        // Lift: right trigger raises, left trigger lowers
        let lift = if driver.right_trigger > 0.0 {
            LIFT_POWER
        } else if driver.left_trigger > 0.0 {
            -LIFT_POWER
        } else {
            STOP
        };

        // Basket release latches: A opens, B recloses, otherwise holds
        if driver.a {
            self.basket_release = BASKET_RELEASE_END;
        } else if driver.b {
            self.basket_release = BASKET_RELEASE_START;
        }

        // Mode toggle. Level-triggered: a start button still held next
        // cycle flips the mode again.
        if operator.start {
            self.mode = match self.mode {
                BasketMode::Auto => BasketMode::Manual,
                BasketMode::Manual => BasketMode::Auto,
            };
        }

        let basket_rotate = match self.mode {
            BasketMode::Auto => {
                // Discrete tilt targets paired with a rotate preset; with
                // nothing held the rotate servo stops every cycle, while the
                // tilt target stays wherever it was last sent.
                if operator.b {
                    self.basket_tilt = BASKET_TILT_RIGHT;
                    ROTATE_RIGHT_FAST
                } else if operator.x {
                    self.basket_tilt = BASKET_TILT_LEFT;
                    ROTATE_LEFT_FAST
                } else if operator.a {
                    self.basket_tilt = BASKET_TILT_START;
                    ROTATE_STOP
                } else {
                    ROTATE_STOP
                }
            }
            BasketMode::Manual => {
                // Open loop: slow rotate presets on hold, tilt integrated
                // one step per cycle while Y/A are held
                if operator.y {
                    self.basket_tilt = (self.basket_tilt + TILT_STEP).clamp(TILT_MIN, TILT_MAX);
                } else if operator.a {
                    self.basket_tilt = (self.basket_tilt - TILT_STEP).clamp(TILT_MIN, TILT_MAX);
                }

                if operator.b {
                    ROTATE_RIGHT_SLOW
                } else if operator.x {
                    ROTATE_LEFT_SLOW
                } else {
                    ROTATE_STOP
                }
            }
        };

        // Knockdowns: individual dpad presses first, then up deploys both
        // and down retracts both. Up is checked before down and wins a tie.
        if operator.dpad_right {
            self.knockdown_r = KNOCKDOWN_END_R;
        }
        if operator.dpad_left {
            self.knockdown_l = KNOCKDOWN_END_L;
        }
        if operator.dpad_up {
            self.knockdown_r = KNOCKDOWN_END_R;
            self.knockdown_l = KNOCKDOWN_END_L;
        } else if operator.dpad_down {
            self.knockdown_r = KNOCKDOWN_START_R;
            self.knockdown_l = KNOCKDOWN_START_L;
        }

        ActuatorCommand {
            drive_r,
            drive_l,
            pickup,
            lift,
            knockdown_r: self.knockdown_r,
            knockdown_l: self.knockdown_l,
            deposit: self.deposit,
            basket_rotate,
            basket_release: self.basket_release,
            basket_tilt: self.basket_tilt,
        }
    }
}

impl Default for TeleopMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamepad::GamepadState;

    fn pads(driver: GamepadState, operator: GamepadState) -> GamepadPair {
        GamepadPair { driver, operator }
    }

    fn idle() -> GamepadPair {
        GamepadPair::default()
    }

    #[test]
    fn shape_is_odd_and_clamped() {
        for i in 0..=40 {
            let x = -1.0 + 0.05 * i as f32;
            let y = shape(x);
            assert!((shape(-x) + y).abs() < 1e-12, "odd symmetry broken at {x}");
            assert!((-1.0..=1.0).contains(&y), "out of range at {x}");
        }
    }

    #[test]
    fn shape_center_and_threshold() {
        assert_eq!(shape(0.0), 0.0);
        // Full output is reached at the top threshold, not the physical stop
        assert!((shape(0.85) - 1.0).abs() < 1e-6);
        assert!((shape(-0.85) + 1.0).abs() < 1e-6);
        // Past the threshold the sine rolls off slightly; it stays near full
        assert!(shape(1.0) > 0.95);
    }

    #[test]
    fn full_forward_stick_gives_full_drive_power() {
        let mut mapper = TeleopMapper::new();
        let driver = GamepadState {
            right_stick_y: -1.0,
            ..Default::default()
        };
        let cmd = mapper.update(&pads(driver, GamepadState::default()));
        assert_eq!(cmd.drive_r, shape(1.0));
        assert!(cmd.drive_r > 0.95);
        assert_eq!(cmd.drive_l, 0.0);
    }

    #[test]
    fn pickup_right_bumper_wins_tie() {
        let mut mapper = TeleopMapper::new();
        let driver = GamepadState {
            right_bumper: true,
            left_bumper: true,
            ..Default::default()
        };
        let cmd = mapper.update(&pads(driver, GamepadState::default()));
        assert_eq!(cmd.pickup, PICKUP_POWER);
    }

    #[test]
    fn pickup_and_lift_level_triggered() {
        let mut mapper = TeleopMapper::new();
        let driver = GamepadState {
            left_bumper: true,
            left_trigger: 0.3,
            ..Default::default()
        };
        let cmd = mapper.update(&pads(driver, GamepadState::default()));
        assert_eq!(cmd.pickup, -PICKUP_POWER);
        assert_eq!(cmd.lift, -LIFT_POWER);

        // Released inputs drop straight back to stop
        let cmd = mapper.update(&idle());
        assert_eq!(cmd.pickup, STOP);
        assert_eq!(cmd.lift, STOP);
    }

    #[test]
    fn basket_release_latches_until_reset() {
        let mut mapper = TeleopMapper::new();
        let driver = GamepadState {
            a: true,
            ..Default::default()
        };
        let cmd = mapper.update(&pads(driver, GamepadState::default()));
        assert_eq!(cmd.basket_release, BASKET_RELEASE_END);

        // Stays open with no input
        let cmd = mapper.update(&idle());
        assert_eq!(cmd.basket_release, BASKET_RELEASE_END);

        let driver = GamepadState {
            b: true,
            ..Default::default()
        };
        let cmd = mapper.update(&pads(driver, GamepadState::default()));
        assert_eq!(cmd.basket_release, BASKET_RELEASE_START);
    }

    #[test]
    fn start_toggles_mode() {
        let mut mapper = TeleopMapper::new();
        assert_eq!(mapper.mode(), BasketMode::Auto);

        let operator = GamepadState {
            start: true,
            ..Default::default()
        };
        mapper.update(&pads(GamepadState::default(), operator));
        assert_eq!(mapper.mode(), BasketMode::Manual);

        // Held start flips again next cycle; there is no debounce
        mapper.update(&pads(GamepadState::default(), operator));
        assert_eq!(mapper.mode(), BasketMode::Auto);
    }

    #[test]
    fn auto_buttons_inert_in_manual_mode() {
        let mut mapper = TeleopMapper::new();
        let operator = GamepadState {
            start: true,
            ..Default::default()
        };
        mapper.update(&pads(GamepadState::default(), operator));
        assert_eq!(mapper.mode(), BasketMode::Manual);

        // B in manual selects a rotate speed, never the discrete tilt target
        let operator = GamepadState {
            b: true,
            ..Default::default()
        };
        let cmd = mapper.update(&pads(GamepadState::default(), operator));
        assert_eq!(cmd.basket_rotate, ROTATE_RIGHT_SLOW);
        assert_eq!(cmd.basket_tilt, BASKET_TILT_START);
    }

    #[test]
    fn auto_mode_discrete_targets_and_rotate_reset() {
        let mut mapper = TeleopMapper::new();
        let operator = GamepadState {
            b: true,
            ..Default::default()
        };
        let cmd = mapper.update(&pads(GamepadState::default(), operator));
        assert_eq!(cmd.basket_tilt, BASKET_TILT_RIGHT);
        assert_eq!(cmd.basket_rotate, ROTATE_RIGHT_FAST);

        // Rotate stops the cycle the button is released, tilt target holds
        let cmd = mapper.update(&idle());
        assert_eq!(cmd.basket_rotate, ROTATE_STOP);
        assert_eq!(cmd.basket_tilt, BASKET_TILT_RIGHT);
    }

    #[test]
    fn manual_tilt_integrates_and_clamps() {
        let mut mapper = TeleopMapper::new();
        let start_toggle = GamepadState {
            start: true,
            ..Default::default()
        };
        mapper.update(&pads(GamepadState::default(), start_toggle));

        let hold_y = GamepadState {
            y: true,
            ..Default::default()
        };
        let mut cmd = mapper.update(&pads(GamepadState::default(), hold_y));
        for _ in 0..9 {
            cmd = mapper.update(&pads(GamepadState::default(), hold_y));
        }
        // Ten cycles from 0.875 lands at 0.975
        assert!((cmd.basket_tilt - 0.975).abs() < 1e-9);

        // Keep holding: clamps at the upper limit, never past it
        for _ in 0..20 {
            cmd = mapper.update(&pads(GamepadState::default(), hold_y));
        }
        assert!((cmd.basket_tilt - TILT_MAX).abs() < 1e-9);

        // And back down against the lower limit
        let hold_a = GamepadState {
            a: true,
            ..Default::default()
        };
        for _ in 0..200 {
            cmd = mapper.update(&pads(GamepadState::default(), hold_a));
        }
        assert!((cmd.basket_tilt - TILT_MIN).abs() < 1e-9);
    }

    #[test]
    fn tilt_state_survives_mode_change() {
        let mut mapper = TeleopMapper::new();
        let start_toggle = GamepadState {
            start: true,
            ..Default::default()
        };
        mapper.update(&pads(GamepadState::default(), start_toggle));

        let hold_y = GamepadState {
            y: true,
            ..Default::default()
        };
        for _ in 0..5 {
            mapper.update(&pads(GamepadState::default(), hold_y));
        }
        // Toggle back to auto and out again: the integrated position holds
        mapper.update(&pads(GamepadState::default(), start_toggle));
        mapper.update(&pads(GamepadState::default(), start_toggle));
        let cmd = mapper.update(&idle());
        assert!((cmd.basket_tilt - 0.925).abs() < 1e-9);
    }

    #[test]
    fn knockdown_up_deploys_both_over_individual() {
        let mut mapper = TeleopMapper::new();
        let operator = GamepadState {
            dpad_up: true,
            dpad_left: true,
            ..Default::default()
        };
        let cmd = mapper.update(&pads(GamepadState::default(), operator));
        assert_eq!(cmd.knockdown_r, KNOCKDOWN_END_R);
        assert_eq!(cmd.knockdown_l, KNOCKDOWN_END_L);
    }

    #[test]
    fn knockdown_up_beats_simultaneous_down() {
        let mut mapper = TeleopMapper::new();
        let operator = GamepadState {
            dpad_up: true,
            dpad_down: true,
            ..Default::default()
        };
        let cmd = mapper.update(&pads(GamepadState::default(), operator));
        assert_eq!(cmd.knockdown_r, KNOCKDOWN_END_R);
        assert_eq!(cmd.knockdown_l, KNOCKDOWN_END_L);
    }

    #[test]
    fn knockdown_down_retracts_after_deploy() {
        let mut mapper = TeleopMapper::new();
        let deploy = GamepadState {
            dpad_right: true,
            ..Default::default()
        };
        let cmd = mapper.update(&pads(GamepadState::default(), deploy));
        assert_eq!(cmd.knockdown_r, KNOCKDOWN_END_R);

        // Deployed position sticks with no input
        let cmd = mapper.update(&idle());
        assert_eq!(cmd.knockdown_r, KNOCKDOWN_END_R);

        let retract = GamepadState {
            dpad_down: true,
            ..Default::default()
        };
        let cmd = mapper.update(&pads(GamepadState::default(), retract));
        assert_eq!(cmd.knockdown_r, KNOCKDOWN_START_R);
        assert_eq!(cmd.knockdown_l, KNOCKDOWN_START_L);
    }

    #[test]
    fn hold_command_stops_motion_but_keeps_latches() {
        let mut mapper = TeleopMapper::new();
        let driver = GamepadState {
            a: true,
            right_stick_y: -1.0,
            ..Default::default()
        };
        mapper.update(&pads(driver, GamepadState::default()));

        let cmd = mapper.hold_command();
        assert_eq!(cmd.drive_r, STOP);
        assert_eq!(cmd.basket_rotate, ROTATE_STOP);
        // The latched release stays open rather than snapping shut
        assert_eq!(cmd.basket_release, BASKET_RELEASE_END);
    }

    #[test]
    fn neutral_command_matches_start_positions() {
        let cmd = ActuatorCommand::neutral();
        assert_eq!(cmd.drive_r, STOP);
        assert_eq!(cmd.drive_l, STOP);
        assert_eq!(cmd.pickup, STOP);
        assert_eq!(cmd.lift, STOP);
        assert_eq!(cmd.knockdown_r, KNOCKDOWN_START_R);
        assert_eq!(cmd.knockdown_l, KNOCKDOWN_START_L);
        assert_eq!(cmd.deposit, DEPOSIT_START);
        assert_eq!(cmd.basket_rotate, ROTATE_STOP);
        assert_eq!(cmd.basket_release, BASKET_RELEASE_START);
        assert_eq!(cmd.basket_tilt, BASKET_TILT_START);
    }
}
