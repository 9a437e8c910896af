// Loop rate, serial port, actuator channel assignments

// Control loop frequency
pub const LOOP_HZ: u64 = 50;

// Serial port for the actuator bus controller
pub const DEFAULT_BUS_PORT: &str = "/dev/ttyACM0";

// Bus ids for the six drive/mechanism motors.
// Names must match the robot configuration exactly; the registry treats an
// unknown name as a fatal error at bind time.
pub const MOTOR_CHANNELS: [(&str, u8); 6] = [
    ("M_driveFR", 1),
    ("M_driveFL", 2),
    ("M_driveBR", 3),
    ("M_driveBL", 4),
    ("M_pickup", 5),
    ("M_lift", 6),
];

// Motors mounted mirrored to the rest of the drivetrain. Their commanded
// power is negated once at bind time, never per cycle.
pub const REVERSED_MOTORS: [&str; 4] = ["M_driveFR", "M_driveBR", "M_pickup", "M_lift"];

// Bus ids for the six servos
pub const SERVO_CHANNELS: [(&str, u8); 6] = [
    ("S_climbersKnockdownR", 11),
    ("S_climbersKnockdownL", 12),
    ("S_climbersDeposit", 13),
    ("S_basketRotate", 14),
    ("S_basketRelease", 15),
    ("S_basketTilt", 16),
];
