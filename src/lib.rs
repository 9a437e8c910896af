// Teleop control runtime for a six-motor, six-servo competition robot.
//
// The mapper (mapper.rs) turns two gamepad snapshots into an actuator
// command once per control cycle; the runtime (runtime.rs) drives it at a
// fixed rate and writes commands to the rig over a serial actuator bus.

pub mod config;
pub mod gamepad;
pub mod hardware;
pub mod mapper;
pub mod runtime;
