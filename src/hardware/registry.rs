// Hardware map: robot-configuration names to bus channels
//
// The channel names are the contract with the robot configuration; a lookup
// that misses is a fatal error at bind time, not something to limp past
// with an unbound actuator.

use std::collections::HashMap;

use crate::config::{MOTOR_CHANNELS, REVERSED_MOTORS, SERVO_CHANNELS};

/// Motor mounting direction. Reverse negates commanded power once at bind
/// time so the mapping rules never deal with mirrored motors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn factor(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MotorChannel {
    pub id: u8,
    pub direction: Direction,
}

impl MotorChannel {
    /// Commanded power adjusted for mounting direction
    pub fn oriented(&self, power: f64) -> f64 {
        power * self.direction.factor()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ServoChannel {
    pub id: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no motor named {0:?} in the robot configuration")]
    UnknownMotor(String),

    #[error("no servo named {0:?} in the robot configuration")]
    UnknownServo(String),
}

/// Name-keyed registry of every actuator channel on the robot.
pub struct HardwareMap {
    motors: HashMap<&'static str, MotorChannel>,
    servos: HashMap<&'static str, ServoChannel>,
}

impl HardwareMap {
    /// The competition robot: six motors (right-side drive, pickup and lift
    /// reversed to match mounting) and six servos.
    pub fn competition_robot() -> Self {
        let motors = MOTOR_CHANNELS
            .iter()
            .map(|&(name, id)| {
                let direction = if REVERSED_MOTORS.contains(&name) {
                    Direction::Reverse
                } else {
                    Direction::Forward
                };
                (name, MotorChannel { id, direction })
            })
            .collect();
        let servos = SERVO_CHANNELS
            .iter()
            .map(|&(name, id)| (name, ServoChannel { id }))
            .collect();
        Self { motors, servos }
    }

    pub fn motor(&self, name: &str) -> Result<MotorChannel, RegistryError> {
        self.motors
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownMotor(name.to_string()))
    }

    pub fn servo(&self, name: &str) -> Result<ServoChannel, RegistryError> {
        self.servos
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownServo(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_every_configured_channel() {
        let map = HardwareMap::competition_robot();
        for (name, _) in MOTOR_CHANNELS {
            assert!(map.motor(name).is_ok(), "motor {name} missing");
        }
        for (name, _) in SERVO_CHANNELS {
            assert!(map.servo(name).is_ok(), "servo {name} missing");
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        let map = HardwareMap::competition_robot();
        assert!(matches!(
            map.motor("M_doesNotExist"),
            Err(RegistryError::UnknownMotor(_))
        ));
        assert!(matches!(
            map.servo("S_doesNotExist"),
            Err(RegistryError::UnknownServo(_))
        ));
    }

    #[test]
    fn right_side_drive_is_reversed() {
        let map = HardwareMap::competition_robot();
        assert_eq!(map.motor("M_driveFR").unwrap().direction, Direction::Reverse);
        assert_eq!(map.motor("M_driveBR").unwrap().direction, Direction::Reverse);
        assert_eq!(map.motor("M_driveFL").unwrap().direction, Direction::Forward);
        assert_eq!(map.motor("M_driveBL").unwrap().direction, Direction::Forward);
    }

    #[test]
    fn oriented_power_flips_for_reversed_motors() {
        let map = HardwareMap::competition_robot();
        let fr = map.motor("M_driveFR").unwrap();
        let fl = map.motor("M_driveFL").unwrap();
        assert_eq!(fr.oriented(0.65), -0.65);
        assert_eq!(fl.oriented(0.65), 0.65);
    }
}
